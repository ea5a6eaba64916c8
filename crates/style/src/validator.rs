//! Authenticity validation of a generated text against a fingerprint.
//!
//! Three stages, cheapest first:
//! 1. Hard rules: forbidden phrases, denylisted corporate words, a foreign
//!    bullet glyph. Any hit scores 0 and stops here.
//! 2. Deterministic penalties from a starting score of 10.
//! 3. A model judges similarity to the exemplars (1–10).
//!
//! The final score is the lower of stages 2 and 3.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use voiceprint_config::{LexiconConfig, VoiceConfig};
use voiceprint_core::corpus::ExemplarText;
use voiceprint_core::error::ProviderError;
use voiceprint_core::fingerprint::StyleFingerprint;
use voiceprint_core::provider::{Provider, ProviderRequest};

use crate::prompts;
use crate::text;

const MAX_SCORE: u8 = 10;

const SIGNATURE_PENALTY: u8 = 4;
const FAILURE_VOCABULARY_PENALTY: u8 = 3;
const SENTENCE_LENGTH_PENALTY: u8 = 2;
const CONTRACTION_PENALTY: u8 = 1;
const SOFTENED_PENALTY: u8 = 1;
const CONCRETENESS_PENALTY: u8 = 2;

/// Outcome of validating one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// 0–10; 0 means a hard rule was broken
    pub score: u8,
    pub issues: Vec<String>,
    pub hard_rejected: bool,
    /// Score after deterministic penalties
    pub rule_score: u8,
    /// Model-judged similarity, absent when a hard rule stopped validation
    pub similarity: Option<u8>,
}

impl Verdict {
    pub fn needs_regeneration(&self, threshold: u8) -> bool {
        self.score < threshold
    }

    pub fn is_rejected(&self, threshold: u8) -> bool {
        self.score < threshold
    }
}

/// What a validation is measured against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub fingerprint: &'a StyleFingerprint,
    pub exemplars: &'a [ExemplarText],
    /// The requested angle, used to spot failure stories
    pub angle: Option<&'a str>,
}

/// Stage 1. Returns one issue per violation.
pub fn hard_rule_violations(
    draft: &str,
    fingerprint: &StyleFingerprint,
    lexicon: &LexiconConfig,
) -> Vec<String> {
    let mut issues = Vec::new();

    for phrase in &fingerprint.forbidden_phrases {
        if text::contains_phrase(draft, phrase) {
            issues.push(format!("Uses forbidden phrase \"{}\"", phrase.trim()));
        }
    }
    for word in &lexicon.corporate_denylist {
        if text::contains_word(draft, word) {
            issues.push(format!("Uses corporate word \"{}\"", word.trim()));
        }
    }

    let glyph = fingerprint.list_marker();
    let mut foreign: Vec<char> = text::bullet_markers(draft)
        .into_iter()
        .filter(|m| *m != glyph)
        .collect();
    foreign.sort_unstable();
    foreign.dedup();
    for marker in foreign {
        issues.push(format!("List items start with \"{marker}\" instead of \"{glyph}\""));
    }

    issues
}

/// Whether at least half of the exemplars mention a number.
pub fn expects_concreteness(exemplars: &[ExemplarText], number_words: &[String]) -> bool {
    if exemplars.is_empty() {
        return false;
    }
    let concrete = exemplars
        .iter()
        .filter(|e| text::has_number(&e.text, number_words))
        .count();
    concrete * 2 >= exemplars.len()
}

/// Stage 2. Returns the remaining score and one issue per penalty.
pub fn rule_penalties(
    draft: &str,
    ctx: &ValidationContext<'_>,
    lexicon: &LexiconConfig,
    sentence_length_tolerance: f32,
) -> (u8, Vec<String>) {
    let fingerprint = ctx.fingerprint;
    let mut score = MAX_SCORE;
    let mut issues = Vec::new();
    let mut penalize = |points: u8, issue: String| {
        score = score.saturating_sub(points);
        issues.push(issue);
    };

    if !fingerprint.signature_phrases.is_empty()
        && !fingerprint
            .signature_phrases
            .iter()
            .any(|p| text::contains_phrase(draft, p))
    {
        penalize(
            SIGNATURE_PENALTY,
            format!(
                "Uses none of their signature phrases ({})",
                fingerprint.signature_phrases.join(", ")
            ),
        );
    }

    let failure_story = ctx.angle.is_some_and(|angle| {
        lexicon
            .failure_angle_markers
            .iter()
            .any(|m| text::contains_phrase(angle, m))
    });
    if failure_story
        && !lexicon
            .failure_vocabulary
            .iter()
            .any(|w| text::contains_word(draft, w))
    {
        penalize(
            FAILURE_VOCABULARY_PENALTY,
            "The angle is a failure story but the text never names what went wrong".into(),
        );
    }

    if fingerprint.avg_sentence_length > 0.0 {
        let actual = text::avg_sentence_length(draft);
        let deviation = (actual - fingerprint.avg_sentence_length).abs();
        if deviation > sentence_length_tolerance {
            penalize(
                SENTENCE_LENGTH_PENALTY,
                format!(
                    "Sentences average {actual:.1} words; theirs average {:.1}",
                    fingerprint.avg_sentence_length
                ),
            );
        }
    }

    if text::uses_contractions(draft) != fingerprint.uses_contractions {
        let issue = if fingerprint.uses_contractions {
            "No contractions, but they write with contractions"
        } else {
            "Uses contractions, but they write without them"
        };
        penalize(CONTRACTION_PENALTY, issue.into());
    }

    for softened in &lexicon.softened_phrases {
        if text::contains_word(draft, &softened.from) {
            penalize(
                SOFTENED_PENALTY,
                format!(
                    "Hedges with \"{}\" (instead: {})",
                    softened.from,
                    softened.to.trim_matches(['(', ')'])
                ),
            );
        }
    }

    if expects_concreteness(ctx.exemplars, &lexicon.number_words)
        && !text::has_number(draft, &lexicon.number_words)
    {
        penalize(
            CONCRETENESS_PENALTY,
            "No numbers or specifics, but their posts usually have them".into(),
        );
    }

    (score, issues)
}

#[derive(Debug, Deserialize)]
struct JudgeReply {
    score: serde_json::Value,
    #[serde(default)]
    reason: String,
}

/// Read a 1–10 score from the judge's reply, tolerating prose.
fn parse_judge_reply(raw: &str) -> Option<(u8, String)> {
    if let Ok(reply) = serde_json::from_str::<JudgeReply>(text::extract_json(raw)) {
        let score = match &reply.score {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        return Some((score.round().clamp(1.0, 10.0) as u8, reply.reason));
    }

    raw.split(|c: char| !c.is_ascii_digit())
        .filter_map(|n| n.parse::<u8>().ok())
        .find(|n| (1..=10).contains(n))
        .map(|n| (n, String::new()))
}

pub struct Validator {
    provider: Arc<dyn Provider>,
    model: String,
    lexicon: LexiconConfig,
    sentence_length_tolerance: f32,
    similarity_threshold: u8,
}

impl Validator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, voice: &VoiceConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            lexicon: voice.lexicon.clone(),
            sentence_length_tolerance: voice.sentence_length_tolerance,
            similarity_threshold: voice.similarity_threshold,
        }
    }

    pub fn lexicon(&self) -> &LexiconConfig {
        &self.lexicon
    }

    pub async fn validate(
        &self,
        draft: &str,
        ctx: ValidationContext<'_>,
    ) -> Result<Verdict, ProviderError> {
        let hard = hard_rule_violations(draft, ctx.fingerprint, &self.lexicon);
        if !hard.is_empty() {
            debug!(issues = hard.len(), "Hard rule violated, skipping similarity judge");
            return Ok(Verdict {
                score: 0,
                issues: hard,
                hard_rejected: true,
                rule_score: 0,
                similarity: None,
            });
        }

        let (rule_score, mut issues) =
            rule_penalties(draft, &ctx, &self.lexicon, self.sentence_length_tolerance);

        let (similarity, reason) = self.judge(draft, ctx.exemplars).await?;
        if similarity < self.similarity_threshold {
            let mut issue = format!("Does not read like their posts (similarity {similarity}/10)");
            if !reason.is_empty() {
                issue.push_str(": ");
                issue.push_str(reason.trim());
            }
            issues.push(issue);
        }

        let score = rule_score.min(similarity);
        debug!(score, rule_score, similarity, issues = issues.len(), "Validated draft");
        Ok(Verdict {
            score,
            issues,
            hard_rejected: false,
            rule_score,
            similarity: Some(similarity),
        })
    }

    async fn judge(
        &self,
        draft: &str,
        exemplars: &[ExemplarText],
    ) -> Result<(u8, String), ProviderError> {
        let request = ProviderRequest::prompt(
            &self.model,
            prompts::JUDGE_SYSTEM,
            prompts::judge_user(draft, exemplars),
        )
        .with_temperature(0.0)
        .structured();

        let response = self.provider.complete(request).await?;
        parse_judge_reply(&response.message.content).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "similarity judge returned no score: {}",
                text::preview(&response.message.content, 120)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use voiceprint_core::testing::{ScriptedProvider, json_response, text_response};

    fn fingerprint() -> StyleFingerprint {
        StyleFingerprint {
            hook_patterns: vec!["Open with the number".into()],
            signature_phrases: vec!["shipped it anyway".into()],
            forbidden_phrases: vec!["robust solution".into()],
            avg_sentence_length: 6.0,
            uses_contractions: true,
            ..StyleFingerprint::default()
        }
    }

    fn exemplar(text: &str) -> ExemplarText {
        ExemplarText {
            id: "e".into(),
            user_id: "u1".into(),
            text: text.into(),
            engagement: None,
            published_at: Utc::now(),
        }
    }

    fn validator(provider: Arc<ScriptedProvider>) -> Validator {
        Validator::new(provider, "m", &VoiceConfig::default())
    }

    #[test]
    fn forbidden_phrase_is_a_hard_violation() {
        let issues = hard_rule_violations(
            "We built a Robust Solution.",
            &fingerprint(),
            &LexiconConfig::default(),
        );
        assert_eq!(issues, vec!["Uses forbidden phrase \"robust solution\""]);
    }

    #[test]
    fn denylist_matches_whole_words_only() {
        let lexicon = LexiconConfig::default();
        assert_eq!(hard_rule_violations("Let's delve into it", &fingerprint(), &lexicon).len(), 1);
        assert!(hard_rule_violations("The seamstress", &fingerprint(), &lexicon).is_empty());
    }

    #[test]
    fn foreign_bullet_glyph_is_a_hard_violation() {
        let lexicon = LexiconConfig::default();
        let issues = hard_rule_violations("Lessons:\n* one\n* two", &fingerprint(), &lexicon);
        assert_eq!(issues, vec!["List items start with \"*\" instead of \"-\""]);
        assert!(hard_rule_violations("Lessons:\n- one", &fingerprint(), &lexicon).is_empty());
    }

    #[test]
    fn humanized_lists_pass_when_the_glyph_is_blank() {
        let lexicon = LexiconConfig::default();
        let fp: StyleFingerprint = serde_json::from_value(json!({
            "hook_patterns": ["Open with the number"],
            "signature_phrases": ["shipped it anyway"],
            "forbidden_phrases": ["robust solution"],
            "bullet_glyph": ""
        }))
        .unwrap();
        let humanizer = crate::humanize::Humanizer::new(&lexicon, &fp);

        let draft = humanizer.apply("We shipped it anyway. Lessons:\n* one\n- two");
        assert_eq!(draft, "We shipped it anyway. Lessons:\n- one\n- two");
        assert!(hard_rule_violations(&draft, &fp, &lexicon).is_empty());

        let fp = StyleFingerprint { bullet_glyph: "none".into(), ..fp };
        let draft = crate::humanize::Humanizer::new(&lexicon, &fp).apply("Lessons:\n* one");
        assert_eq!(draft, "Lessons:\n- one");
        assert!(hard_rule_violations(&draft, &fp, &lexicon).is_empty());
    }

    #[test]
    fn penalties_accumulate() {
        let fp = fingerprint();
        let exemplars = vec![exemplar("We lost 3 customers."), exemplar("Took 2 weeks.")];
        let ctx = ValidationContext {
            fingerprint: &fp,
            exemplars: &exemplars,
            angle: Some("what I learned from the mistake"),
        };
        // No signature phrase (-4), no failure words (-3), no contractions (-1),
        // one hedge (-1), no numbers (-2). Sentence length is within tolerance.
        let (score, issues) = rule_penalties(
            "Perhaps the launch went fine. We moved on.",
            &ctx,
            &LexiconConfig::default(),
            6.0,
        );
        assert_eq!(score, 0);
        assert_eq!(issues.len(), 5);
    }

    #[test]
    fn clean_text_keeps_full_score() {
        let fp = fingerprint();
        let exemplars = vec![exemplar("We lost 3 customers.")];
        let ctx = ValidationContext {
            fingerprint: &fp,
            exemplars: &exemplars,
            angle: Some("the failure"),
        };
        let (score, issues) = rule_penalties(
            "The launch failed. We shipped it anyway. Lost 3 users. Didn't care.",
            &ctx,
            &LexiconConfig::default(),
            6.0,
        );
        assert_eq!(score, 10, "unexpected issues: {issues:?}");
    }

    #[test]
    fn sentence_length_outside_tolerance_is_penalized() {
        let fp = StyleFingerprint { avg_sentence_length: 4.0, ..fingerprint() };
        let ctx = ValidationContext { fingerprint: &fp, exemplars: &[], angle: None };
        let long = "We shipped it anyway and then we spent the next several weeks explaining to everyone why it didn't work.";
        let (score, issues) = rule_penalties(long, &ctx, &LexiconConfig::default(), 6.0);
        assert_eq!(score, 8);
        assert!(issues[0].starts_with("Sentences average"));
    }

    #[test]
    fn judge_reply_parsing() {
        assert_eq!(parse_judge_reply(r#"{"score": 8, "reason": "close"}"#), Some((8, "close".into())));
        assert_eq!(parse_judge_reply(r#"{"score": "6"}"#), Some((6, String::new())));
        assert_eq!(parse_judge_reply(r#"{"score": 14}"#), Some((10, String::new())));
        assert_eq!(parse_judge_reply("I'd say 7 out of 10"), Some((7, String::new())));
        assert_eq!(parse_judge_reply("no idea"), None);
    }

    #[tokio::test]
    async fn hard_violation_skips_the_judge() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let fp = fingerprint();
        let verdict = validator(provider.clone())
            .validate(
                "A robust solution, shipped it anyway.",
                ValidationContext { fingerprint: &fp, exemplars: &[], angle: None },
            )
            .await
            .unwrap();

        assert_eq!(verdict.score, 0);
        assert!(verdict.hard_rejected);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn final_score_is_the_lower_of_rules_and_judge() {
        let provider = Arc::new(ScriptedProvider::new(vec![json_response(
            json!({"score": 4, "reason": "too formal"}),
        )]));
        let fp = fingerprint();
        let verdict = validator(provider.clone())
            .validate(
                "We shipped it anyway. Didn't wait.",
                ValidationContext { fingerprint: &fp, exemplars: &[], angle: None },
            )
            .await
            .unwrap();

        assert_eq!(verdict.rule_score, 10);
        assert_eq!(verdict.similarity, Some(4));
        assert_eq!(verdict.score, 4);
        assert!(verdict.issues[0].contains("similarity 4/10: too formal"));
        assert!(verdict.needs_regeneration(7));
        assert!(verdict.is_rejected(5));
        assert_eq!(provider.calls_with_system("# VOICE JUDGE"), 1);
    }

    #[tokio::test]
    async fn unreadable_judge_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("hmm")]));
        let fp = fingerprint();
        let err = validator(provider)
            .validate(
                "We shipped it anyway. Didn't wait.",
                ValidationContext { fingerprint: &fp, exemplars: &[], angle: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
