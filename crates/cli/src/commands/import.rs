//! `voiceprint import`: load a user's past writing.

use std::path::Path;
use voiceprint_core::store::{SnapshotStore, UserDirectory};

use crate::runtime::{self, CliResult};

pub async fn run(user_id: &str, file: &Path) -> CliResult {
    let config = runtime::load_config()?;
    let json = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let stores = runtime::open_stores(&config).await?;
    let stored =
        voiceprint_memory::import_exemplars(stores.corpus_writer.as_ref(), user_id, &json).await?;

    // Anything derived from the old corpus is stale now.
    stores.fingerprints.delete(user_id).await?;
    stores.knowledge.delete(user_id).await?;

    let status = stores.users.status(user_id).await?;
    tracing::info!(user_id, stored, corpus_size = status.corpus_size, "Corpus imported");
    println!("Imported {stored} texts for {user_id} ({} on file).", status.corpus_size);
    if status.analyzed_texts == 0 {
        println!("None carry engagement numbers, so engagement patterns cannot be learned yet.");
    }
    Ok(())
}
