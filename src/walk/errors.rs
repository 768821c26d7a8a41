//! Fatal and per-file errors raised by the walk.

use crate::filter::FilterError;
use crate::ident::IdentError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run before anything is written.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("invalid root {path}: {reason}")]
    Path { path: PathBuf, reason: String },

    #[error("target and replacement are both '{name}'")]
    IdenticalNames { name: String },

    #[error(transparent)]
    Ident(#[from] IdentError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Errors scoped to a single path. The run continues past them.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Decode { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to enumerate {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl FileError {
    /// The offending path.
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileError::Read { path, .. }
            | FileError::Decode { path }
            | FileError::Write { path, .. }
            | FileError::Copy { path, .. }
            | FileError::Walk { path, .. } => path,
        }
    }
}
