//! The shared services every tool draws on, wired once per process.

use std::sync::Arc;
use voiceprint_config::AppConfig;
use voiceprint_core::clock::Clock;
use voiceprint_core::event::EventBus;
use voiceprint_core::provider::Provider;
use voiceprint_core::store::Stores;
use voiceprint_style::{
    FingerprintCache, FingerprintExtractor, GenerationPipeline, KnowledgeCache,
    KnowledgeMapBuilder, PatternAnalyzer, PatternLearner,
};

/// Stores plus the style services built on top of them.
#[derive(Clone)]
pub struct VoiceServices {
    pub stores: Stores,
    pub fingerprints: Arc<FingerprintCache>,
    pub knowledge: Arc<KnowledgeCache>,
    pub pipeline: Arc<GenerationPipeline>,
    pub learner: Arc<PatternLearner>,
    pub analyzer: Arc<PatternAnalyzer>,
}

impl VoiceServices {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: &str,
        stores: Stores,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
        events: Arc<EventBus>,
    ) -> Self {
        let voice = &config.voice;
        let ttl = config.fingerprint_ttl();

        let extractor =
            FingerprintExtractor::new(provider.clone(), model, stores.corpus.clone(), voice)
                .with_events(events.clone());
        let fingerprints = Arc::new(FingerprintCache::new(
            stores.fingerprints.clone(),
            Arc::new(extractor),
            clock.clone(),
            ttl,
        ));

        let knowledge = Arc::new(KnowledgeCache::new(
            stores.knowledge.clone(),
            Arc::new(KnowledgeMapBuilder::new(stores.corpus.clone(), &voice.lexicon)),
            clock.clone(),
            ttl,
        ));

        let pipeline = Arc::new(
            GenerationPipeline::new(
                provider.clone(),
                model,
                fingerprints.clone(),
                stores.corpus.clone(),
                voice,
            )
            .with_events(events),
        );

        let learner = Arc::new(PatternLearner::new(
            stores.patterns.clone(),
            voice.pattern_learning_rate,
        ));
        let analyzer = Arc::new(PatternAnalyzer::new(
            provider,
            model,
            stores.corpus.clone(),
            stores.patterns.clone(),
            clock,
            voice.exemplar_limit,
        ));

        Self { stores, fingerprints, knowledge, pipeline, learner, analyzer }
    }

    /// Drop cached fingerprint and knowledge map after the corpus changed.
    pub async fn invalidate(&self, user_id: &str) -> voiceprint_core::error::Result<()> {
        self.fingerprints.invalidate(user_id).await?;
        self.knowledge.invalidate(user_id).await?;
        Ok(())
    }
}
