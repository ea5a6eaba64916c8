//! The Voiceprint agent: a bounded tool-calling loop plus conversation memory.
//!
//! 1. **Receive** a user message and load the recent transcript
//! 2. **Ask the model**, offering the tool catalogue
//! 3. **If tool calls**: execute them in order, append results, go to 2
//! 4. **If text**: that is the answer
//!
//! The loop stops at a fixed iteration ceiling. After each answer the
//! [`ContextManager`] may summarize the conversation in the background.

pub mod context;
pub mod orchestrator;
pub mod prompts;
pub mod token;

pub use context::{ContextManager, Maintenance};
pub use orchestrator::{EXHAUSTED_REPLY, LoopOutcome, LoopState, Orchestrator};
pub use token::TokenBudget;
