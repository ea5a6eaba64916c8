//! Post-processing pass that strips machine-writing tells from generated text.
//!
//! The pass is an ordered list of `(pattern, replacement)` rules applied one
//! after another. It never calls a model and applying it twice is the same as
//! applying it once.

use regex_lite::{Captures, Regex};
use voiceprint_config::LexiconConfig;
use voiceprint_core::fingerprint::StyleFingerprint;

type ReplaceFn = Box<dyn Fn(&Captures<'_>) -> String + Send + Sync>;

struct Rule {
    name: &'static str,
    pattern: Regex,
    replace: ReplaceFn,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replace: ReplaceFn) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(pattern) => Some(Self { name, pattern, replace }),
            Err(e) => {
                tracing::warn!(rule = name, error = %e, "Skipping humanizer rule with invalid pattern");
                None
            }
        }
    }

    fn literal(name: &'static str, pattern: &str, replacement: &'static str) -> Option<Self> {
        Self::new(name, pattern, Box::new(move |_| replacement.to_string()))
    }

    /// Keep capture group 1, drop the rest of the match.
    fn keep_group(name: &'static str, pattern: &str) -> Option<Self> {
        Self::new(name, pattern, Box::new(|caps| group(caps, 1).to_string()))
    }
}

fn group<'a>(caps: &'a Captures<'_>, i: usize) -> &'a str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Ordered rewrite rules, built once per fingerprint.
pub struct Humanizer {
    rules: Vec<Rule>,
}

impl Humanizer {
    pub fn new(lexicon: &LexiconConfig, fingerprint: &StyleFingerprint) -> Self {
        let mut rules = Vec::new();

        rules.push(Rule::literal(
            "meta_preamble",
            r"(?i)\A\s*(?:sure|certainly|of course|absolutely|here's|here is|below is)[^\n]*(?:post|draft|version|text)[^\n]*:[ \t]*\n+",
            "",
        ));
        rules.push(Rule::literal(
            "meta_closing",
            r"(?i)\n+[ \t]*(?:let me know if|i hope this|feel free to)[^\n]*\s*\z",
            "",
        ));
        rules.push(Rule::keep_group("markdown_bold", r"\*\*([^*\n]+)\*\*"));
        rules.push(Rule::keep_group("markdown_underline", r"__([^_\n]+)__"));
        rules.push(Rule::new(
            "markdown_italic",
            r"(^|[^\w*])\*([^*\s][^*\n]*?)\*",
            Box::new(|caps| format!("{}{}", group(caps, 1), group(caps, 2))),
        ));
        rules.push(Rule::literal("markdown_heading", r"(?m)^#{1,6}[ \t]+", ""));
        rules.push(Rule::literal("em_dash", r"[ \t]*\x{2014}[ \t]*", " - "));
        rules.push(Rule::literal("en_dash", r"\x{2013}", "-"));
        rules.push(Rule::new(
            "semicolon",
            r";[ \t]+(\S)",
            Box::new(|caps| format!(". {}", capitalize(group(caps, 1)))),
        ));
        rules.push(Rule::literal("semicolon_eol", r"(?m);[ \t]*$", "."));
        rules.push(Rule::new(
            "semicolon_inline",
            r";(\S)",
            Box::new(|caps| format!(". {}", capitalize(group(caps, 1)))),
        ));

        for sub in &lexicon.corporate_substitutions {
            let to = sub.to.clone();
            rules.push(Rule::new(
                "corporate_substitution",
                &format!(r"(?i)\b{}\b", regex_lite::escape(sub.from.trim())),
                Box::new(move |caps| {
                    let matched = group(caps, 0);
                    if matched.chars().next().is_some_and(char::is_uppercase) {
                        capitalize(&to)
                    } else {
                        to.clone()
                    }
                }),
            ));
        }

        let glyph = fingerprint.list_marker();
        rules.push(Rule::new(
            "bullet_glyph",
            "(?m)^([ \\t]*)[-*\u{2022}\u{25AA}\u{25BA}\u{2192}\u{25E6}\u{2023}]([ \\t]+)",
            Box::new(move |caps| format!("{}{}{}", group(caps, 1), glyph, group(caps, 2))),
        ));

        if !fingerprint.uses_emoji {
            rules.push(Rule::literal(
                "emoji",
                r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B50}\x{2B55}\x{FE0F}\x{200D}]",
                "",
            ));
        }

        rules.push(Rule::new(
            "inner_spacing",
            r"(\S)[ \t]{2,}",
            Box::new(|caps| format!("{} ", group(caps, 1))),
        ));
        rules.push(Rule::literal("trailing_spaces", r"(?m)[ \t]+$", ""));
        rules.push(Rule::literal("blank_lines", r"\n{3,}", "\n\n"));

        Self { rules: rules.into_iter().flatten().collect() }
    }

    /// Run every rule in order.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if rule.pattern.is_match(&out) {
                out = rule.pattern.replace_all(&out, &*rule.replace).into_owned();
            }
        }
        out.trim().to_string()
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}
