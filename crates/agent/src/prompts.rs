//! Instructions for the orchestrating model and the summarizer.

use voiceprint_core::message::{Message, Role};
use voiceprint_core::store::SummaryRecord;

/// The orchestrator's standing instructions, including the fallback chain.
///
/// Fallbacks are followed by the model, not by the loop: the loop only
/// executes whatever tools are requested.
pub const ORCHESTRATOR_SYSTEM: &str = "\
# VOICEPRINT WRITING AGENT

You write short posts for one person, in their own voice. You never write in a \
generic assistant voice. Their voice comes from their own posts, which you reach \
through tools.

## How to work
- Gather what you need with tools, then answer. Do not ask the user for data a \
tool can give you.
- To write a post, call generate_content. Return its text unchanged. Do not \
rewrite, polish or add to it.
- When generate_content succeeds, mention the authenticity score in one short line \
after the post.
- For \"make it shorter\", \"the second one\", \"that post\": read the conversation \
first, then call get_previous_output if you need the exact text.
- For \"my startup\", \"that tool I use\" and similar: call resolve_reference before \
asking the user.

## Fallback chain (follow it without asking permission)
1. Any tool reports missing or empty data: call check_user_status, then \
diagnose_data_gaps, and follow its next_actions in order.
2. get_top_examples reports an unanalyzed corpus: call reanalyze_corpus \
automatically, then retry get_top_examples.
3. get_engagement_patterns finds nothing: call reanalyze_corpus once; if still \
empty, use the alternative data it returned and go on.
4. get_voice_fingerprint or generate_content reports no corpus: stop and tell the \
user to import their posts. Nothing else can fix that.
5. generate_content is rejected for authenticity: tell the user the issues and \
offer a different angle. Never write the post yourself instead.
6. resolve_reference finds no match: ask the user which project or tool they mean.

## Tool results
Every tool answers with {\"status\": \"success\", \"data\": ...} or \
{\"status\": \"error\", \"diagnostic\": {\"reason\", \"suggested_actions\", \
\"alternative_data\"}}. Read the diagnostic; it tells you what to do next.
";

/// Heading used by batch summaries.
pub const BATCH_SUMMARY_SYSTEM: &str = "\
# CONVERSATION SUMMARY

Summarize the conversation excerpt below for your own later reference. Keep: what \
the user asked for, topics and angles tried, which drafts they liked or rejected \
and why, facts about their work, preferences they stated. Drop pleasantries and \
tool chatter. Plain prose, at most 200 words.
";

/// Heading used when compacting all memory into one record.
pub const DEEP_SUMMARY_SYSTEM: &str = "\
# MEMORY COMPACTION

Below are your earlier summaries of a long conversation, followed by its most \
recent turns. Merge them into a single summary that replaces all of them. Keep \
every durable fact and preference, drop anything superseded. It must be shorter \
than the input. Plain prose, at most 400 words.
";

/// The orchestrator prompt with the conversation's long-term memory appended.
pub fn system_prompt(memory: &[SummaryRecord]) -> String {
    if memory.is_empty() {
        return ORCHESTRATOR_SYSTEM.to_string();
    }
    let mut prompt = String::from(ORCHESTRATOR_SYSTEM);
    prompt.push_str("\n## Earlier in this conversation\n");
    for record in memory {
        prompt.push_str(&format!("- {}\n", record.content.trim()));
    }
    prompt
}

/// A plain transcript for the summarizer. Tool turns are kept short.
pub fn transcript(turns: &[Message]) -> String {
    turns
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| match m.role {
            Role::Tool => format!("tool: {}", shorten(&m.content, 300)),
            role => format!("{}: {}", role.as_str(), m.content.trim()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn deep_input(memory: &[SummaryRecord], recent: &[Message]) -> String {
    let mut input = String::from("## Earlier summaries\n");
    for (i, record) in memory.iter().enumerate() {
        input.push_str(&format!("{}. {}\n", i + 1, record.content.trim()));
    }
    input.push_str("\n## Recent turns\n");
    input.push_str(&transcript(recent));
    input
}

pub(crate) fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use voiceprint_core::message::ConversationId;
    use voiceprint_core::store::SummaryKind;

    fn record(content: &str) -> SummaryRecord {
        SummaryRecord {
            id: "s1".into(),
            conversation_id: ConversationId::from("c1"),
            kind: SummaryKind::Batch,
            content: content.into(),
            covers_turns: 10,
            token_estimate: 5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fallback_chain_names_the_tools() {
        for tool in ["reanalyze_corpus", "diagnose_data_gaps", "get_previous_output"] {
            assert!(ORCHESTRATOR_SYSTEM.contains(tool), "{tool}");
        }
    }

    #[test]
    fn memory_is_appended() {
        assert_eq!(system_prompt(&[]), ORCHESTRATOR_SYSTEM);
        let prompt = system_prompt(&[record("User prefers short hooks.")]);
        assert!(prompt.ends_with("- User prefers short hooks.\n"));
    }

    #[test]
    fn transcript_skips_empty_turns_and_shortens_tools() {
        let turns = vec![
            Message::user("write about pricing"),
            Message::assistant(""),
            Message::tool_result("call_1", "x".repeat(400)),
        ];
        let text = transcript(&turns);
        assert!(text.starts_with("user: write about pricing\ntool: "));
        assert!(text.ends_with("..."));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn shorten_is_char_safe() {
        assert_eq!(shorten("ééé", 2), "éé...");
        assert_eq!(shorten("ab", 5), "ab");
    }
}
