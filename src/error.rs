use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to load catalog from {path}: {source}")]
    CatalogLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid compression bypass pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed header line '{0}', expected 'Name: value'")]
    MalformedHeader(String),
}
