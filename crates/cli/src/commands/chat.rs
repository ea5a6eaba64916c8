//! `voiceprint chat`: interactive or single-message mode.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use voiceprint_agent::{LoopOutcome, LoopState};
use voiceprint_core::error::Error;
use voiceprint_core::message::ConversationId;
use voiceprint_core::tool::ToolContext;

use crate::runtime::{CliResult, Runtime};

pub async fn run(user_id: &str, conversation: Option<String>, message: Option<String>) -> CliResult {
    let rt = Runtime::load().await?;
    let tracker = TaskTracker::new();
    let orchestrator = rt.orchestrator(tracker.clone());

    let conversation_id = conversation
        .as_deref()
        .map(ConversationId::from)
        .unwrap_or_default();
    let ctx = ToolContext { user_id: user_id.to_string(), conversation_id };

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let result = orchestrator.respond(&ctx, &msg, &cancel).await;
        eprint!("\r              \r");
        let outcome = result?;
        println!("{}", outcome.reply);
    } else {
        println!();
        println!("  Voiceprint - Interactive Mode");
        println!();
        println!("  User:          {}", ctx.user_id);
        println!("  Conversation:  {}", ctx.conversation_id);
        println!("  Model:         {}", rt.model);
        println!();
        println!("  Type your message and press Enter.");
        println!("  Type 'exit' or Ctrl+C to quit.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("  You > ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = cancel.cancelled() => break,
            };
            let Some(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "exit" | "quit") {
                break;
            }

            eprint!("  ...");
            let result = orchestrator.respond(&ctx, line, &cancel).await;
            eprint!("\r     \r");
            match result {
                Ok(outcome) => print_reply(&outcome),
                Err(Error::Cancelled) => {
                    eprintln!("  [Cancelled]");
                    break;
                }
                Err(e) => {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            }
        }

        println!();
        println!("  Resume later with --conversation {}", ctx.conversation_id);
    }

    // Let pending summarization finish before the runtime shuts down.
    tracker.close();
    tracker.wait().await;
    Ok(())
}

fn print_reply(outcome: &LoopOutcome) {
    println!();
    for line in outcome.reply.lines() {
        println!("  Voiceprint > {line}");
    }
    if outcome.state == LoopState::Exhausted {
        println!("  ({} steps used)", outcome.iterations);
    }
    println!();
}
