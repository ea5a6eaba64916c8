//! `voiceprint generate`: one text straight through the generation pipeline.

use voiceprint_core::error::{Error, VoiceError};
use voiceprint_style::GenerationRequest;

use crate::runtime::{CliResult, Runtime};

pub async fn run(user_id: &str, topic: String, angle: Option<String>) -> CliResult {
    let rt = Runtime::load().await?;

    let mut request = GenerationRequest::new(user_id, topic);
    if let Some(angle) = angle {
        request = request.with_angle(angle);
    }

    match rt.services.pipeline.generate(&request).await {
        Ok(content) => {
            println!("{}", content.text);
            eprintln!();
            eprintln!(
                "  authenticity {}/10{}",
                content.score,
                if content.regenerated { " (regenerated once)" } else { "" }
            );
            for issue in &content.issues {
                eprintln!("  - {issue}");
            }
            Ok(())
        }
        Err(Error::Voice(VoiceError::AuthenticityRejected { score, issues })) => {
            eprintln!("Both drafts read as off-voice (authenticity {score}/10):");
            for issue in &issues {
                eprintln!("  - {issue}");
            }
            Err("generation rejected".into())
        }
        Err(e) => Err(e.into()),
    }
}
