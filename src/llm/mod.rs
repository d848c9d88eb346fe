use anyhow::Result;
use async_openai::types::ChatCompletionRequestMessage;

pub mod openai;

/// Reasoning-engine boundary. Both calls are single request/response turns;
/// any looping or retry lives with the caller.
#[async_trait::async_trait]
pub trait Llm: Send + Sync {
    /// Plain free-text completion.
    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String>;

    /// Completion constrained to the verdict JSON schema. Returns the raw
    /// JSON text; parsing and invariant checks happen in the extractor.
    async fn chat_verdict(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String>;
}
