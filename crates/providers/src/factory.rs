//! Builds the configured provider stack.

use std::sync::Arc;
use std::time::Duration;
use voiceprint_config::AppConfig;
use voiceprint_core::error::ProviderError;
use voiceprint_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryingProvider;

/// Build the default provider from configuration, wrapped with retries.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let api_key = match api_key {
        Some(key) => key,
        None if is_local(name) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{name}'; set VOICEPRINT_API_KEY or api_key in config.toml"
            )));
        }
    };

    let reliability = &config.reliability;
    let timeout = Duration::from_secs(reliability.request_timeout_secs);

    // The HTTP client gets a little headroom so the retry layer's timeout fires first.
    let http = OpenAiCompatProvider::new(name, base_url, api_key, timeout + Duration::from_secs(5))?;

    let provider = RetryingProvider::new(Arc::new(http), timeout)
        .with_max_retries(reliability.max_retries)
        .with_base_backoff(Duration::from_millis(reliability.base_backoff_ms));

    Ok(Arc::new(provider))
}

/// The model to use, honoring a per-provider override.
pub fn resolve_model(config: &AppConfig) -> String {
    config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone())
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => "https://openrouter.ai/api/v1".into(),
    }
}
