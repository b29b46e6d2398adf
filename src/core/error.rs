//! Error types for the application

use std::path::PathBuf;
use thiserror::Error;

use crate::translate::TranslationError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Glossary load error: {0}")]
    GlossaryLoad(String),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wrap an IO error with the path that caused it
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileAccess {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
