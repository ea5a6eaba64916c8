//! Collaborator store implementations for Voiceprint.

pub mod import;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use import::{ParsedImport, import_exemplars, parse_import};
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use std::sync::Arc;
use voiceprint_config::StorageConfig;
use voiceprint_core::error::StoreError;
use voiceprint_core::store::Stores;

/// Open the configured backend and wire every collaborator to it.
pub async fn open_from_config(config: &StorageConfig) -> Result<Stores, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Stores::from_backend(Arc::new(InMemoryStore::new()))),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let path = config.database_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Storage(format!("create {}: {e}", parent.display())))?;
            }
            let store = SqliteStore::new(&path.to_string_lossy()).await?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        other => Err(StoreError::Storage(format!(
            "storage backend '{other}' is not available in this build"
        ))),
    }
}
