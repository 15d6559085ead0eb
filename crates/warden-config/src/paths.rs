//! Where configuration files live.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Git-tracked project file.
pub const PROJECT_CONFIG_FILE: &str = "warden.toml";
/// Untracked per-checkout overrides.
pub const LOCAL_CONFIG_FILE: &str = "warden.local.toml";

/// Configuration file locations for one project directory, lowest
/// precedence first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// `<config dir>/warden/config.toml`; `None` when the platform has no
    /// home directory.
    pub user: Option<PathBuf>,
    pub project: PathBuf,
    pub local: PathBuf,
}

impl Paths {
    pub fn for_project(project_dir: impl AsRef<Path>) -> Self {
        let dir = project_dir.as_ref();
        Self {
            user: ProjectDirs::from("rs", "warden", "warden")
                .map(|dirs| dirs.config_dir().join("config.toml")),
            project: dir.join(PROJECT_CONFIG_FILE),
            local: dir.join(LOCAL_CONFIG_FILE),
        }
    }

    /// Files that exist, in merge order. The user file is skipped unless
    /// `include_user` is set.
    pub fn existing(&self, include_user: bool) -> Vec<&Path> {
        let user = self.user.as_deref().filter(|_| include_user);
        user.into_iter()
            .chain([self.project.as_path(), self.local.as_path()])
            .filter(|path| path.is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_user_file_is_named_after_the_app() {
        // Platform dependent; only the file and app names are stable.
        if let Some(user) = Paths::for_project(".").user {
            assert!(user.to_string_lossy().contains("warden"));
            assert!(user.ends_with("config.toml"));
        }
    }

    #[test]
    fn test_existing_keeps_merge_order() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let paths = Paths::for_project(temp_dir.path());
        assert!(paths.existing(false).is_empty());

        fs::write(&paths.local, "").expect("Failed to write local config");
        assert_eq!(paths.existing(false), vec![paths.local.as_path()]);

        fs::write(&paths.project, "").expect("Failed to write project config");
        assert_eq!(
            paths.existing(false),
            vec![paths.project.as_path(), paths.local.as_path()]
        );
    }
}
