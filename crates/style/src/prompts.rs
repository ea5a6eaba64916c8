//! Prompt templates for extraction, generation, judging and pattern analysis.
//!
//! Each system prompt opens with a distinct heading so logs (and tests) can
//! tell the calls apart.

use voiceprint_core::corpus::ExemplarText;
use voiceprint_core::fingerprint::StyleFingerprint;

pub const EXTRACTION_SYSTEM: &str = "\
# STYLE FINGERPRINT EXTRACTION

You study a writer's own posts and describe how they write. Quote them. \
Every phrase you list must appear verbatim (or nearly) in the texts below. \
Do not give writing advice and do not invent phrases.

Return one JSON object with exactly these keys:
- hook_patterns: array of strings, how their openings work, best first
- first_sentences: array of strings, verbatim first sentences of the strongest texts
- signature_phrases: array of strings, phrases they reuse
- forbidden_phrases: array of strings, words and phrases they would never write \
(corporate filler, hype words, anything conspicuously absent from their texts)
- avg_sentence_length: number, mean words per sentence
- uses_contractions, uses_fragments, uses_emoji, uses_hashtags, uses_bullet_lists: booleans
- bullet_glyph: string, the character that starts their list items
- narrative_steps: array of strings, how a typical post moves from hook to close
- closing_style: string, how their posts end";

pub const GENERATION_SYSTEM: &str = "\
# GHOSTWRITER

You write as the person described below, in their voice, for their audience. \
Output only the post text. No title, no preamble, no commentary.";

pub const JUDGE_SYSTEM: &str = "\
# VOICE JUDGE

You compare a draft to a writer's real posts and rate how likely it is that \
the same person wrote it. Judge voice, rhythm and word choice, not quality.

Return one JSON object: {\"score\": <integer 1-10>, \"reason\": \"<one sentence>\"}";

pub const PATTERN_SYSTEM: &str = "\
# ENGAGEMENT PATTERN ANALYSIS

You look at a writer's best-performing posts and name what drove engagement. \
Each pattern is one reusable observation tied to the texts it appears in.

Return one JSON object: {\"patterns\": [{\"type\": \"hook|format|cta|topic|timing|emotion\", \
\"description\": \"...\", \"source_ids\": [\"...\"]}]}";

/// Exemplars as a numbered block, with ids and engagement when known.
pub fn format_exemplars(texts: &[ExemplarText]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let engagement = t
                .engagement
                .map(|e| format!(", engagement {e}"))
                .unwrap_or_default();
            format!("## Text {} (id {}{})\n{}", i + 1, t.id, engagement, t.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn extraction_user(texts: &[ExemplarText]) -> String {
    format!(
        "Here are {} texts by the same writer.\n\n{}\n\nReturn the fingerprint JSON.",
        texts.len(),
        format_exemplars(texts)
    )
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// The voice rules block shared by first and stricter attempts.
pub fn voice_rules(fingerprint: &StyleFingerprint) -> String {
    let mut out = String::new();
    out.push_str("## How they open\n");
    out.push_str(&bullet_list(&fingerprint.hook_patterns));
    if !fingerprint.first_sentences.is_empty() {
        out.push_str("\n\n## Real first sentences\n");
        out.push_str(&bullet_list(&fingerprint.first_sentences));
    }
    out.push_str("\n\n## Use at least one of these phrases, word for word\n");
    out.push_str(&bullet_list(&fingerprint.signature_phrases));
    out.push_str("\n\n## Never write any of these\n");
    out.push_str(&bullet_list(&fingerprint.forbidden_phrases));
    if !fingerprint.narrative_steps.is_empty() {
        out.push_str("\n\n## Structure\n");
        out.push_str(&fingerprint.narrative_steps.join(" -> "));
    }
    out.push_str(&format!(
        "\n\n## Mechanics\n\
         - Average sentence length: about {:.0} words\n\
         - Contractions: {}\n\
         - Sentence fragments: {}\n\
         - Emoji: {}\n\
         - Hashtags: {}\n\
         - Bullet lists: {} (start items with \"{}\")",
        fingerprint.avg_sentence_length,
        yes_no(fingerprint.uses_contractions),
        yes_no(fingerprint.uses_fragments),
        yes_no(fingerprint.uses_emoji),
        yes_no(fingerprint.uses_hashtags),
        yes_no(fingerprint.uses_bullet_lists),
        fingerprint.list_marker(),
    ));
    if !fingerprint.closing_style.is_empty() {
        out.push_str(&format!("\n- Closing: {}", fingerprint.closing_style));
    }
    out
}

pub fn generation_system(fingerprint: &StyleFingerprint, exemplars: &[ExemplarText]) -> String {
    format!(
        "{GENERATION_SYSTEM}\n\n{}\n\n## Their real posts\n\n{}",
        voice_rules(fingerprint),
        format_exemplars(exemplars)
    )
}

pub fn generation_user(topic: &str, angle: Option<&str>) -> String {
    match angle {
        Some(angle) if !angle.trim().is_empty() => {
            format!("Write a post about: {topic}\nAngle: {angle}")
        }
        _ => format!("Write a post about: {topic}"),
    }
}

/// The regeneration request: same task, with the previous draft's problems spelled out.
pub fn stricter_user(topic: &str, angle: Option<&str>, draft: &str, issues: &[String]) -> String {
    format!(
        "{}\n\nA previous draft did not sound like them:\n\n{}\n\n\
         Fix every one of these problems and stay closer to their real posts:\n{}",
        generation_user(topic, angle),
        draft,
        bullet_list(issues)
    )
}

pub fn judge_user(draft: &str, exemplars: &[ExemplarText]) -> String {
    format!(
        "## Their real posts\n\n{}\n\n## Draft\n\n{}\n\nHow likely is it that the same person wrote the draft?",
        format_exemplars(exemplars),
        draft
    )
}

pub fn pattern_user(texts: &[ExemplarText]) -> String {
    format!(
        "{}\n\nName the patterns behind these posts' engagement.",
        format_exemplars(texts)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn exemplar(id: &str, text: &str, engagement: Option<f64>) -> ExemplarText {
        ExemplarText {
            id: id.into(),
            user_id: "u1".into(),
            text: text.into(),
            engagement,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn exemplars_are_numbered_with_ids() {
        let block = format_exemplars(&[
            exemplar("a", "First post", Some(120.0)),
            exemplar("b", "Second post\n", None),
        ]);
        assert!(block.contains("## Text 1 (id a, engagement 120)\nFirst post"));
        assert!(block.contains("## Text 2 (id b)\nSecond post"));
    }

    #[test]
    fn generation_prompt_lists_voice_rules() {
        let fingerprint = StyleFingerprint {
            hook_patterns: vec!["Start with a number".into()],
            signature_phrases: vec!["shipped it anyway".into()],
            forbidden_phrases: vec!["robust solution".into()],
            ..StyleFingerprint::default()
        };
        let system = generation_system(&fingerprint, &[exemplar("a", "Post", None)]);
        assert!(system.starts_with("# GHOSTWRITER"));
        assert!(system.contains("- shipped it anyway"));
        assert!(system.contains("## Never write any of these\n- robust solution"));
    }

    #[test]
    fn stricter_prompt_carries_issues() {
        let user = stricter_user("a failed launch", None, "draft", &["Uses forbidden phrase".into()]);
        assert!(user.starts_with("Write a post about: a failed launch"));
        assert!(user.contains("- Uses forbidden phrase"));
    }

    #[test]
    fn blank_angle_is_omitted() {
        assert_eq!(generation_user("x", Some("  ")), "Write a post about: x");
        assert_eq!(generation_user("x", Some("what broke")), "Write a post about: x\nAngle: what broke");
    }
}
