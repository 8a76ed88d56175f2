//! JSON file backed table storage
//!
//! Each resource keeps its full data set in one JSON document. Every
//! operation reads or rewrites the whole file; there are no partial writes.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod error;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use types::{AuditAction, AuditEntry, Record, TableDocument, TableMeta};

/// Store reference type
pub type StoreRef = Arc<dyn TableStore>;

/// Trait for table storage backends
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Load the full document, seeding an empty one when none exists
    async fn load(&self) -> StoreResult<TableDocument>;

    /// Replace the stored document
    async fn save(&self, document: &TableDocument) -> StoreResult<()>;

    /// Make sure a document exists, seeding it if needed
    async fn ensure(&self) -> StoreResult<()> {
        self.load().await.map(|_| ())
    }
}

/// Table stored as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn seed(&self) -> StoreResult<TableDocument> {
        let document = TableDocument::default();
        self.save(&document).await?;
        Ok(document)
    }
}

#[async_trait]
impl TableStore for JsonFileStore {
    async fn load(&self) -> StoreResult<TableDocument> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("Seeding empty table at {}", self.path.display());
                return self.seed().await;
            }
            Err(source) => {
                return Err(StoreError::Access {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                log::warn!(
                    "Replacing malformed table {} with an empty one: {}",
                    self.path.display(),
                    e
                );
                self.seed().await
            }
        }
    }

    async fn save(&self, document: &TableDocument) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })
    }
}
