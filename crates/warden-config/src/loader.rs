//! Configuration loader with multi-source merging

use crate::{Paths, WardenConfig};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_vars: Option<HashMap<String, String>>,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "WARDEN".to_string(),
            env_vars: None,
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "WARDEN")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment overrides from `vars` instead of the process
    /// environment.
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env_vars = Some(vars);
        self
    }

    /// Skip ~/.config/warden/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<WardenConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = WardenConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. ~/.config/warden/config.toml, warden.toml, warden.local.toml
        for file in Paths::for_project(&self.project_dir).existing(self.include_user_config) {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (WARDEN_AUTH__JWT_SECRET, ...). Keys contain
        // underscores, so sections are separated by a double underscore.
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env_vars),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> WardenConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlaceholderStyle;
    use std::fs;
    use tempfile::tempdir;

    fn loader(dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(dir)
            .without_user_config()
            .with_env_vars(HashMap::new())
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config, WardenConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[auth]
jwt_secret = "project-secret"
token_lifetime_secs = 600
api_key_header = "x-warden-key"

[filter]
placeholder = "numbered"

[logging]
filter = "warden=debug"
"#;
        fs::write(project_dir.join("warden.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.auth.jwt_secret, "project-secret");
        assert_eq!(config.auth.token_lifetime_secs, 600);
        assert_eq!(config.auth.api_key_header, "x-warden-key");
        assert_eq!(config.auth.jwt_algorithm, "HS512");
        assert_eq!(config.filter.placeholder, PlaceholderStyle::Numbered);
        assert_eq!(config.logging.filter, "warden=debug");
        assert_eq!(config.rbac.default_role, "user");
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("warden.toml"),
            r#"
[auth]
jwt_secret = "project-secret"
local_issuer = "warden-staging"
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("warden.local.toml"),
            r#"
[auth]
jwt_secret = "local-secret"
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.auth.jwt_secret, "local-secret");
        assert_eq!(config.auth.local_issuer, "warden-staging");
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("warden.toml"),
            r#"
[auth]
jwt_secret = "file-secret"
"#,
        )
        .expect("Failed to write project config");

        let vars = HashMap::from([
            ("WARDEN_AUTH__JWT_SECRET".to_string(), "env-secret".to_string()),
            ("WARDEN_AUTH__TOKEN_LIFETIME_SECS".to_string(), "120".to_string()),
            ("WARDEN_RBAC__DEFAULT_ROLE".to_string(), "admin".to_string()),
        ]);

        let config = loader(project_dir)
            .with_env_vars(vars)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.auth.jwt_secret, "env-secret");
        assert_eq!(config.auth.token_lifetime_secs, 120);
        assert_eq!(config.rbac.default_role, "admin");
    }

    #[test]
    fn test_invalid_value_fails_to_load() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("warden.toml"),
            r#"
[filter]
placeholder = "percent"
"#,
        )
        .expect("Failed to write project config");

        assert!(loader(project_dir).load().is_err());
        assert_eq!(
            loader(project_dir).load_or_default(),
            WardenConfig::default()
        );
    }
}
