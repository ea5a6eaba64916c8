//! Token estimation and summarization triggers.
//!
//! Uses a character-based heuristic: one token per `chars_per_token`
//! characters, rounded up. Exactness is not needed, only that the estimate
//! is stable and grows with the text.

use voiceprint_config::ContextConfig;
use voiceprint_core::message::Message;
use voiceprint_core::store::SummaryRecord;

/// Role name, delimiters and formatting markers on the wire.
const MESSAGE_OVERHEAD: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub chars_per_token: usize,
    pub batch_size: usize,
    pub deep_threshold: usize,
    pub token_ceiling: usize,
}

impl TokenBudget {
    pub fn from_config(config: &ContextConfig) -> Self {
        Self {
            chars_per_token: config.chars_per_token.max(1),
            batch_size: config.batch_size,
            deep_threshold: config.deep_threshold,
            token_ceiling: config.token_ceiling,
        }
    }

    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    pub fn estimate_message(&self, message: &Message) -> usize {
        MESSAGE_OVERHEAD + self.estimate_tokens(&message.content)
    }

    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }

    pub fn estimate_summaries(&self, records: &[SummaryRecord]) -> usize {
        records.iter().map(|r| r.token_estimate).sum()
    }

    /// True on every positive multiple of the batch size.
    pub fn should_batch_summarize(&self, turn_count: usize) -> bool {
        self.batch_size > 0 && turn_count > 0 && turn_count % self.batch_size == 0
    }

    pub fn should_deep_summarize(&self, total_tokens: usize) -> bool {
        total_tokens >= self.deep_threshold
    }

    /// Tokens left before the model's hard ceiling.
    pub fn headroom(&self, total_tokens: usize) -> usize {
        self.token_ceiling.saturating_sub(total_tokens)
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(TokenBudget::default().estimate_tokens(""), 0);
    }

    #[test]
    fn rounds_up() {
        let budget = TokenBudget::default();
        assert_eq!(budget.estimate_tokens("test"), 1);
        assert_eq!(budget.estimate_tokens("hello"), 2);
        assert_eq!(budget.estimate_tokens(&"a".repeat(100)), 25);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(TokenBudget::default().estimate_tokens("éééé"), 1);
    }

    #[test]
    fn estimate_is_monotonic() {
        let budget = TokenBudget::default();
        let mut previous = 0;
        for n in 0..50 {
            let tokens = budget.estimate_tokens(&"x".repeat(n));
            assert!(tokens >= previous);
            previous = tokens;
        }
    }

    #[test]
    fn messages_include_overhead() {
        let budget = TokenBudget::default();
        assert_eq!(budget.estimate_message(&Message::user("test")), 5);
        let msgs = vec![Message::user("hello"), Message::assistant("world")];
        assert_eq!(budget.estimate_messages(&msgs), 12);
    }

    #[test]
    fn batch_trigger() {
        let budget = TokenBudget::default();
        let got: Vec<bool> =
            [0, 5, 10, 19, 20, 30].iter().map(|&n| budget.should_batch_summarize(n)).collect();
        assert_eq!(got, vec![false, false, true, false, true, true]);
    }

    #[test]
    fn deep_trigger() {
        let budget = TokenBudget::default();
        let got: Vec<bool> = [0, 179_999, 180_000, 200_000]
            .iter()
            .map(|&n| budget.should_deep_summarize(n))
            .collect();
        assert_eq!(got, vec![false, false, true, true]);
        assert_eq!(budget.headroom(190_000), 10_000);
        assert_eq!(budget.headroom(250_000), 0);
    }
}
