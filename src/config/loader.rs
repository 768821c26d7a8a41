//! Reading and discovering `nsrename.toml`.

use crate::config::schema::{RenameFile, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the input root when no config is given.
pub const CONFIG_FILE_NAME: &str = "nsrename.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML{}: {source}", located(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid config{}: {source}", located(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn located(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

/// Errors from parsing a string carry no path; attach the file's.
fn attach_path(error: ConfigError, file: &Path) -> ConfigError {
    match error {
        ConfigError::Toml { path: None, source } => ConfigError::Toml {
            path: Some(file.to_path_buf()),
            source,
        },
        ConfigError::Validation { path: None, source } => ConfigError::Validation {
            path: Some(file.to_path_buf()),
            source,
        },
        other => other,
    }
}

pub fn load_from_str(input: &str) -> Result<RenameFile, ConfigError> {
    let config: RenameFile = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RenameFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| attach_path(error, path))
}

/// The config a run would use: `explicit` if given, else
/// `<root>/nsrename.toml` if it exists.
pub fn config_path(explicit: Option<&Path>, root: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = root.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Load the config [`config_path`] picks, if any.
pub fn discover(explicit: Option<&Path>, root: &Path) -> Result<Option<RenameFile>, ConfigError> {
    config_path(explicit, root).map(load_from_path).transpose()
}
