//! `voiceprint init`: write the default configuration.

use voiceprint_config::AppConfig;

use crate::runtime::CliResult;

pub async fn run(force: bool) -> CliResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or re-run with --force to overwrite.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote config.toml to: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set VOICEPRINT_API_KEY (or api_key in the config file)");
    println!("  2. voiceprint import --user <id> --file posts.json");
    println!("  3. voiceprint chat --user <id>");
    Ok(())
}
