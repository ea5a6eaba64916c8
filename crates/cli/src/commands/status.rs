//! `voiceprint status`: what a user has on file, and what to do next.

use voiceprint_config::AppConfig;
use voiceprint_core::store::UserDirectory;
use voiceprint_tools::diagnose::data_gaps;

use crate::runtime::{self, CliResult};

pub async fn run(user_id: &str) -> CliResult {
    let config = runtime::load_config()?;
    let stores = runtime::open_stores(&config).await?;
    let status = stores.users.status(user_id).await?;
    let profile = stores.users.profile(user_id).await?;

    println!("Voiceprint Status");
    println!("=================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Storage:      {}", config.storage.backend);
    println!();
    println!("  User:         {user_id}");
    if let Some(profile) = profile {
        println!("  Name:         {}", profile.display_name);
        if !profile.niche.is_empty() {
            println!("  Niche:        {}", profile.niche);
        }
    }
    println!("  Texts:        {} ({} with engagement)", status.corpus_size, status.analyzed_texts);
    println!(
        "  Fingerprint:  {}",
        status
            .fingerprint_updated_at
            .map_or_else(|| "none".to_string(), |t| t.to_rfc3339())
    );
    println!("  Patterns:     {}", if status.has_patterns { "yes" } else { "none" });

    let (gaps, next_actions) = data_gaps(&status);
    if !gaps.is_empty() {
        println!();
        for gap in &gaps {
            println!("  ! {gap}");
        }
        println!("  Next: {}", next_actions.join(", "));
    }
    Ok(())
}
