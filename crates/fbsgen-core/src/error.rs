//! Error types for the build engine.
//!
//! Only pass-aborting conditions live here. A schema that fails to compile is
//! reported as a [`CompileFailure`](crate::compiler::CompileFailure) value and
//! never surfaces as an [`Error`].

use std::path::PathBuf;

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a build pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file or directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file exists but could not be parsed.
    #[error("invalid configuration in {path}: {reason}")]
    Config {
        /// The configuration file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The digest cache could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Walking the source tree failed.
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
