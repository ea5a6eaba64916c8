//! The bounded tool-calling loop.
//!
//! Each model turn either requests tools (executed in order, results folded
//! back as tool turns) or answers. The loop ends in `Finalizing` on an answer
//! or `Exhausted` when the iteration ceiling is hit first.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use voiceprint_core::error::{Error, Result, ToolError};
use voiceprint_core::event::{DomainEvent, EventBus};
use voiceprint_core::message::{Message, MessageToolCall, Role};
use voiceprint_core::provider::{Provider, ProviderRequest};
use voiceprint_core::store::ConversationStore;
use voiceprint_core::tool::{ToolCall, ToolContext, ToolRegistry, ToolResult};

use crate::context::ContextManager;
use crate::prompts;

/// Shown to the user when the ceiling is reached without an answer.
pub const EXHAUSTED_REPLY: &str = "I need more turns to finish this. I gathered some of \
what I need but ran out of steps before I could write anything. Send another message \
(\"continue\" works) and I'll pick up from here.";

const ARGUMENT_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Gathering,
    Finalizing,
    Exhausted,
}

/// The user-visible result of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub reply: String,
    pub state: LoopState,
    /// Model turns taken
    pub iterations: u32,
}

pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    conversations: Arc<dyn ConversationStore>,
    events: Arc<EventBus>,
    max_iterations: u32,
    history_limit: usize,
    context: Option<(Arc<ContextManager>, TaskTracker)>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        conversations: Arc<dyn ConversationStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.4,
            max_tokens: None,
            tools,
            conversations,
            events,
            max_iterations: 8,
            history_limit: 20,
            context: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_history_limit(mut self, turns: usize) -> Self {
        self.history_limit = turns;
        self
    }

    /// Inject long-term memory into the prompt and schedule summarization on
    /// `tracker` after each reply.
    pub fn with_context(mut self, manager: Arc<ContextManager>, tracker: TaskTracker) -> Self {
        self.context = Some((manager, tracker));
        self
    }

    /// Prior user and assistant turns, oldest first. Assistant turns that only
    /// requested tools are dropped, since their tool turns are not replayed.
    ///
    /// Reads a window of twice the limit so dropped tool requests rarely
    /// shorten the history, without loading the whole conversation.
    async fn history(&self, ctx: &ToolContext) -> Result<Vec<Message>> {
        if self.history_limit == 0 {
            return Ok(Vec::new());
        }
        let window = self.history_limit.saturating_mul(2);
        let turns = self
            .conversations
            .recent(&ctx.conversation_id, window, &[Role::User, Role::Assistant])
            .await?;
        let mut history: Vec<Message> = turns
            .into_iter()
            .filter(|m| !m.requests_tools() && !m.content.trim().is_empty())
            .collect();
        let skip = history.len().saturating_sub(self.history_limit);
        history.drain(..skip);
        Ok(history)
    }

    async fn system_prompt(&self, ctx: &ToolContext) -> String {
        let Some((manager, _)) = &self.context else {
            return prompts::system_prompt(&[]);
        };
        match manager.memory(&ctx.conversation_id).await {
            Ok(memory) => prompts::system_prompt(&memory),
            Err(e) => {
                warn!(conversation_id = %ctx.conversation_id, error = %e, "Could not load conversation memory");
                prompts::system_prompt(&[])
            }
        }
    }

    async fn record(&self, ctx: &ToolContext, message: &Message) -> Result<()> {
        self.conversations.append(&ctx.conversation_id, message.clone()).await?;
        Ok(())
    }

    /// Answer one user message.
    ///
    /// `cancel` is checked before every model turn and between tool
    /// executions; a cancelled request returns [`Error::Cancelled`] with
    /// every completed turn already persisted.
    pub async fn respond(
        &self,
        ctx: &ToolContext,
        user_message: &str,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome> {
        let conversation_id = ctx.conversation_id.as_str();
        let mut messages = vec![Message::system(self.system_prompt(ctx).await)];
        messages.extend(self.history(ctx).await?);
        info!(
            conversation_id,
            user_id = %ctx.user_id,
            history = messages.len() - 1,
            "Processing message"
        );

        let user = Message::user(user_message);
        self.record(ctx, &user).await?;
        messages.push(user);

        let definitions = self.tools.definitions();
        let mut state = LoopState::Gathering;
        let mut iterations = 0;
        let mut reply = String::new();

        while state == LoopState::Gathering {
            if iterations >= self.max_iterations {
                warn!(conversation_id, iterations, "Iteration ceiling reached without an answer");
                state = LoopState::Exhausted;
                reply = EXHAUSTED_REPLY.to_string();
                self.record(ctx, &Message::assistant(&reply)).await?;
                break;
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            iterations += 1;
            debug!(conversation_id, iteration = iterations, "Model turn");

            let request = ProviderRequest::new(&self.model, messages.clone())
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens)
                .with_tools(definitions.clone());
            let response = self.provider.complete(request).await?;
            let message = response.message;
            self.record(ctx, &message).await?;

            if !message.requests_tools() {
                reply = message.content.trim().to_string();
                state = LoopState::Finalizing;
                messages.push(message);
                continue;
            }

            let calls = message.tool_calls.clone();
            messages.push(message);
            for call in &calls {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let result = self.execute(ctx, call).await;
                let turn = Message::tool_result(&call.id, result.to_content());
                self.record(ctx, &turn).await?;
                messages.push(turn);
            }
        }

        info!(conversation_id, iterations, state = ?state, "Loop finished");
        self.events.publish(DomainEvent::LoopFinished {
            conversation_id: conversation_id.to_string(),
            iterations,
            exhausted: state == LoopState::Exhausted,
            timestamp: Utc::now(),
        });

        if let Some((manager, tracker)) = &self.context {
            manager.spawn_maintenance(ctx.conversation_id.clone(), tracker);
        }

        Ok(LoopOutcome { reply, state, iterations })
    }

    async fn execute(&self, ctx: &ToolContext, call: &MessageToolCall) -> ToolResult {
        let start = Instant::now();
        let result = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
            Ok(arguments) => {
                let call = ToolCall { id: call.id.clone(), name: call.name.clone(), arguments };
                self.tools.execute(ctx, &call).await
            }
            Err(e) => ToolResult::failure(
                ToolError::InvalidArguments(format!("arguments are not valid JSON: {e}")).into(),
            ),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let preview = prompts::shorten(&call.arguments, ARGUMENT_PREVIEW_CHARS);
        match result.reason() {
            None => info!(tool = %call.name, arguments = %preview, duration_ms, "Tool succeeded"),
            Some(reason) => {
                warn!(tool = %call.name, arguments = %preview, duration_ms, reason, "Tool reported an error")
            }
        }
        self.events.publish(DomainEvent::ToolExecuted {
            conversation_id: ctx.conversation_id.to_string(),
            tool_name: call.name.clone(),
            arguments_preview: preview,
            success: result.is_success(),
            reason: result.reason().map(str::to_string),
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }
}
