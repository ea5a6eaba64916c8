//! Process-wide wiring shared by the commands.

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::task::TaskTracker;
use voiceprint_agent::{ContextManager, Orchestrator, TokenBudget};
use voiceprint_config::AppConfig;
use voiceprint_core::clock::SystemClock;
use voiceprint_core::event::EventBus;
use voiceprint_core::provider::Provider;
use voiceprint_core::store::Stores;
use voiceprint_tools::VoiceServices;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Storage only, for commands that never call the model.
pub async fn open_stores(config: &AppConfig) -> CliResult<Stores> {
    let stores = voiceprint_memory::open_from_config(&config.storage)
        .await
        .map_err(|e| format!("Failed to open storage: {e}"))?;
    Ok(stores)
}

pub struct Runtime {
    pub config: AppConfig,
    pub model: String,
    pub provider: Arc<dyn Provider>,
    pub stores: Stores,
    pub events: Arc<EventBus>,
    pub services: VoiceServices,
}

impl Runtime {
    pub async fn load() -> CliResult<Self> {
        let config = load_config()?;

        if !config.has_api_key() {
            eprintln!();
            eprintln!("  ERROR: No API key configured!");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    VOICEPRINT_API_KEY   (generic)");
            eprintln!("    OPENROUTER_API_KEY   (recommended)");
            eprintln!("    OPENAI_API_KEY       (for OpenAI direct)");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
        }

        let provider = voiceprint_providers::build_from_config(&config)?;
        let model = voiceprint_providers::resolve_model(&config);
        let stores = open_stores(&config).await?;
        let events = Arc::new(EventBus::default());
        log_events(&events);

        let services = VoiceServices::new(
            provider.clone(),
            &model,
            stores.clone(),
            &config,
            Arc::new(SystemClock),
            events.clone(),
        );

        Ok(Self { config, model, provider, stores, events, services })
    }

    pub fn context_manager(&self) -> Arc<ContextManager> {
        let ctx = &self.config.context;
        Arc::new(
            ContextManager::new(
                self.provider.clone(),
                &self.model,
                self.stores.conversations.clone(),
                self.stores.summaries.clone(),
                TokenBudget::from_config(ctx),
            )
            .with_deep_window(ctx.deep_recent_window)
            .with_events(self.events.clone()),
        )
    }

    /// The agent loop over the full tool catalogue, with background
    /// summarization scheduled on `tracker`.
    pub fn orchestrator(&self, tracker: TaskTracker) -> Orchestrator {
        let tools = Arc::new(voiceprint_tools::catalogue(&self.services));
        Orchestrator::new(
            self.provider.clone(),
            &self.model,
            tools,
            self.stores.conversations.clone(),
            self.events.clone(),
        )
        .with_temperature(self.config.default_temperature)
        .with_max_tokens(self.config.default_max_tokens)
        .with_max_iterations(self.config.agent.max_iterations)
        .with_history_limit(self.config.agent.history_limit)
        .with_context(self.context_manager(), tracker)
    }
}

/// Mirror domain events into the debug log.
fn log_events(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(?event, "Domain event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
