//! Text utilities: sentence statistics and phrase matchers.
//!
//! Pure functions, no model calls.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Characters that start a list item when followed by whitespace.
pub const BULLET_MARKERS: &[char] = &['-', '*', '•', '▪', '►', '→', '◦', '‣'];

// A bare 's is usually possessive, so it only counts after words that take "is" or "us".
static CONTRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:[a-z]+['\x{2019}](?:t|re|ve|ll|d|m)|(?:it|that|there|here|what|who|where|how|he|she|let)['\x{2019}]s)\b",
    )
    .unwrap()
});

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)#[A-Za-z][A-Za-z0-9_]*").unwrap());

/// Split into sentences on terminal punctuation and line breaks.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .map(|s| s.trim_start_matches(BULLET_MARKERS).trim())
        .filter(|s| s.split_whitespace().next().is_some())
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Mean words per sentence; 0.0 for empty text.
pub fn avg_sentence_length(text: &str) -> f32 {
    let sentences = sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let words: usize = sentences.iter().map(|s| word_count(s)).sum();
    words as f32 / sentences.len() as f32
}

/// Case-insensitive substring match.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let phrase = phrase.trim();
    !phrase.is_empty() && text.to_lowercase().contains(&phrase.to_lowercase())
}

/// Case-insensitive whole-word (or whole-phrase) match.
pub fn contains_word(text: &str, word: &str) -> bool {
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';

    haystack.match_indices(&word).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// True if the text has a digit or one of the given number words.
pub fn has_number(text: &str, number_words: &[String]) -> bool {
    text.chars().any(|c| c.is_ascii_digit()) || number_words.iter().any(|w| contains_word(text, w))
}

pub fn uses_contractions(text: &str) -> bool {
    CONTRACTION.is_match(text)
}

pub fn uses_hashtags(text: &str) -> bool {
    HASHTAG.is_match(text)
}

/// Pictographic emoji and dingbats, plus the emoji presentation selector.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B50 | 0x2B55 | 0xFE0F | 0x200D
    )
}

pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji)
}

/// The marker that opens each list-item line, in order of appearance.
pub fn bullet_markers(text: &str) -> Vec<char> {
    text.lines()
        .filter_map(|line| {
            let mut chars = line.trim_start().chars();
            let first = chars.next()?;
            let second = chars.next()?;
            (BULLET_MARKERS.contains(&first) && second.is_whitespace()).then_some(first)
        })
        .collect()
}

/// Pull a JSON object out of a model reply that may be fenced or wrapped in prose.
pub fn extract_json(raw: &str) -> &str {
    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => &raw[s..=e],
        _ => raw.trim(),
    }
}

/// At most `max` characters, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_stats() {
        let text = "We shipped it anyway. Then it broke!\n- Three users noticed";
        assert_eq!(sentences(text), vec!["We shipped it anyway", "Then it broke", "Three users noticed"]);
        assert!((avg_sentence_length(text) - 10.0 / 3.0).abs() < 1e-5);
        assert_eq!(avg_sentence_length("   "), 0.0);
    }

    #[test]
    fn phrase_matching_is_case_insensitive() {
        assert!(contains_phrase("A Robust Solution for all", "robust solution"));
        assert!(!contains_phrase("anything", "  "));
    }

    #[test]
    fn word_matching_respects_boundaries() {
        assert!(contains_word("Let's delve in.", "delve"));
        assert!(!contains_word("They delved in.", "delve"));
        assert!(contains_word("A real game-changer, honestly", "game-changer"));
        assert!(!contains_word("unlocked", "unlock"));
    }

    #[test]
    fn numbers_and_number_words() {
        let words = vec!["three".to_string()];
        assert!(has_number("Lost 40% of signups", &words));
        assert!(has_number("It took three weeks", &words));
        assert!(!has_number("It took threesomething", &words));
    }

    #[test]
    fn contraction_detection() {
        assert!(uses_contractions("We didn't wait."));
        assert!(uses_contractions("It\u{2019}s done."));
        assert!(!uses_contractions("We did not wait."));
        assert!(uses_contractions("Let's ship. That's it."));
    }

    #[test]
    fn possessives_are_not_contractions() {
        assert!(!uses_contractions("Dana's team reviewed the team's plan."));
        assert!(!uses_contractions("The company\u{2019}s numbers were up."));
        assert!(uses_contractions("Dana's team said it's done."));
    }

    #[test]
    fn emoji_and_hashtags() {
        assert!(contains_emoji("Launch day 🚀"));
        assert!(!contains_emoji("Launch day - done"));
        assert!(uses_hashtags("Ship it #buildinpublic"));
        assert!(!uses_hashtags("We were #1"));
    }

    #[test]
    fn bullet_marker_detection() {
        let text = "Lessons:\n- one\n  • two\n-5% churn\n* three";
        assert_eq!(bullet_markers(text), vec!['-', '•', '*']);
    }

    #[test]
    fn json_extraction() {
        assert_eq!(extract_json("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(extract_json("Sure: {\"a\": {\"b\": 2}} done"), "{\"a\": {\"b\": 2}}");
        assert_eq!(extract_json("  nothing "), "nothing");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo", 10), "héllo");
        assert_eq!(preview("héllo world", 3), "hél...");
    }
}
