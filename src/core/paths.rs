// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME, CONFIG_PATH_ENV};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or expanding paths.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no per-user config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// A `~` or `$VAR` in the template could not be expanded.
    #[error("Failed to expand path template '{template}': {message}")]
    Expansion {
        /// The path as written.
        template: String,
        /// Why expansion failed.
        message: String,
    },
}

/// Returns the path to the taskdeck configuration directory (`~/.config/taskdeck`).
/// The directory is not created; a missing config file simply means defaults.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the configuration file location, honouring `TASKDECK_CONFIG`.
pub fn get_config_path() -> Result<PathBuf, PathError> {
    match env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => get_config_dir().map(|dir| dir.join(CONFIG_FILENAME)),
    }
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in a path template.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_resolves_home() {
        let home = dirs::home_dir().unwrap();
        let expanded = expand_path("~/repos/tracker").unwrap();
        assert_eq!(expanded, home.join("repos/tracker"));
    }

    #[test]
    fn test_expand_path_leaves_plain_paths_alone() {
        assert_eq!(expand_path("/srv/repo").unwrap(), PathBuf::from("/srv/repo"));
    }

    #[test]
    fn test_expand_path_rejects_unknown_variables() {
        let result = expand_path("$TASKDECK_SURELY_UNDEFINED_VARIABLE/repo");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }
}
