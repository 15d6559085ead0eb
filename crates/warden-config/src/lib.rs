//! Configuration management for Warden
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (`WARDEN_*` prefix, `__` between section and key)
//! 2. warden.local.toml (gitignored, local overrides)
//! 3. warden.toml (git-tracked, project config)
//! 4. ~/.config/warden/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)
//!
//! The loaded value is immutable; the facade hands each section to the
//! component that needs it at construction time.

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths};

/// HMAC algorithms accepted for bearer tokens.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Main Warden configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub auth: AuthConfig,
    pub rbac: RbacConfig,
    pub filter: FilterConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret for bearer tokens. Must be set.
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub token_lifetime_secs: u64,
    /// Issuer whose tokens carry a warden principal id as subject.
    pub local_issuer: String,
    /// Request header carrying an API key.
    pub api_key_header: String,
    /// Accepted token audiences; empty disables the audience check.
    pub audience: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_algorithm: "HS512".to_string(),
            token_lifetime_secs: 3600,
            local_issuer: "db".to_string(),
            api_key_header: "x-api-key".to_string(),
            audience: Vec::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("local_issuer", &self.local_issuer)
            .field("api_key_header", &self.api_key_header)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Role that receives every permission at seed time.
    pub admin_role: String,
    /// Role assigned at sign-up.
    pub default_role: String,
    /// Roles created at seed time.
    pub roles: Vec<RoleDefinition>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            admin_role: "admin".to_string(),
            default_role: "user".to_string(),
            roles: vec![
                RoleDefinition {
                    name: "admin".to_string(),
                    description: "Administrator role".to_string(),
                },
                RoleDefinition {
                    name: "user".to_string(),
                    description: "User role".to_string(),
                },
            ],
        }
    }
}

/// Role definition from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub placeholder: PlaceholderStyle,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    Question,
    /// `$1`, `$2`, ...
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl WardenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Reads a single TOML file, without layering.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Checks values that have no usable default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set".to_string(),
            ));
        }
        if !SUPPORTED_ALGORITHMS.contains(&self.auth.jwt_algorithm.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "auth.jwt_algorithm {:?} is not one of {SUPPORTED_ALGORITHMS:?}",
                self.auth.jwt_algorithm
            )));
        }
        if self.auth.token_lifetime_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.token_lifetime_secs must be positive".to_string(),
            ));
        }
        if self.rbac.roles.is_empty() {
            return Err(ConfigError::ValidationError(
                "rbac.roles must not be empty".to_string(),
            ));
        }
        for required in [&self.rbac.admin_role, &self.rbac.default_role] {
            if !self.rbac.roles.iter().any(|r| &r.name == required) {
                return Err(ConfigError::ValidationError(format!(
                    "role {required:?} is not defined in rbac.roles"
                )));
            }
        }
        Ok(())
    }

    /// A valid configuration for tests and local development.
    pub fn development(secret: impl Into<String>) -> Self {
        Self {
            auth: AuthConfig {
                jwt_secret: secret.into(),
                ..Default::default()
            },
            logging: LoggingConfig {
                filter: "debug".to_string(),
            },
            ..Default::default()
        }
    }
}
