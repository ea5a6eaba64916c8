//! `voiceprint fingerprint`: show or rebuild a user's style fingerprint.

use crate::runtime::{CliResult, Runtime};

pub async fn run(user_id: &str, refresh: bool) -> CliResult {
    let rt = Runtime::load().await?;
    let fingerprints = &rt.services.fingerprints;

    let fingerprint = if refresh {
        fingerprints.refresh(user_id).await?
    } else {
        fingerprints.get(user_id).await?
    };

    let cached = fingerprints.peek(user_id).await?;
    println!("{}", serde_json::to_string_pretty(&fingerprint)?);
    match cached {
        Some(stamped) => eprintln!("  extracted {}", stamped.updated_at.to_rfc3339()),
        None => eprintln!("  emergency default; extraction failed and nothing was cached"),
    }
    if !fingerprint.is_complete() {
        eprintln!("  missing: {}", fingerprint.missing_fields().join(", "));
    }
    Ok(())
}
