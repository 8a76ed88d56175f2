//! Error types for tallyweb-store

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unable to access data file {}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to write data file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to encode table document")]
    Encode(#[from] serde_json::Error),
}

/// Result type with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
