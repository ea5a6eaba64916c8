//! `voiceprint summarize`: run a memory pass for one conversation now.

use voiceprint_agent::Maintenance;
use voiceprint_core::message::ConversationId;
use voiceprint_core::store::SummaryKind;

use crate::runtime::{CliResult, Runtime};

pub async fn run(conversation: &str, deep: bool) -> CliResult {
    let rt = Runtime::load().await?;
    let manager = rt.context_manager();
    let conversation_id = ConversationId::from(conversation);

    let before = manager.footprint(&conversation_id).await?;
    let kind = if deep { SummaryKind::Deep } else { SummaryKind::Batch };

    match manager.summarize(&conversation_id, kind).await? {
        Maintenance::Skipped => println!("Nothing new to summarize."),
        Maintenance::Summarized(record) => {
            let after = manager.footprint(&conversation_id).await?;
            println!(
                "Wrote a {} summary covering {} turns (~{before} -> ~{after} tokens).",
                record.kind.as_str(),
                record.covers_turns
            );
        }
        Maintenance::NotSmaller { before, after } => println!(
            "Deep compaction would not shrink memory (~{before} -> ~{after} tokens); kept the existing summaries."
        ),
    }
    Ok(())
}
