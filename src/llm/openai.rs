use anyhow::{bail, Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionObject, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

use super::Llm;

/// OpenAI-compatible chat client. Constructed once at startup and shared
/// read-only across requests.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(
        model: String,
        base_url: Option<String>,
        api_key: Option<String>,
        max_tokens: u32,
        timeout_ms: u64,
    ) -> Self {
        let mut cfg = OpenAIConfig::default();
        if let Some(url) = base_url {
            cfg = cfg.with_api_base(url);
        }
        if let Some(key) = api_key {
            cfg = cfg.with_api_key(key);
        }
        let client = Client::with_config(cfg);
        Self { client, model, max_tokens, timeout: Duration::from_millis(timeout_ms) }
    }
}

/// Cap a remote call with a deadline. Expiry surfaces as a plain error so
/// the orchestrator's retry envelope treats it as any other transient
/// failure.
async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => bail!("reasoning engine call timed out after {limit:?}"),
    }
}

/// JSON schema the engine must satisfy when emitting a verdict. Field
/// descriptions double as grading instructions.
fn verdict_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "is_correct": {
                "type": "boolean",
                "description": "Whether the guess is correct or not"
            },
            "accuracy": {
                "type": "number",
                "description": "Accuracy of the guess (0-1 scale, optimistic if partially correct)"
            },
            "time": {
                "type": ["string", "null"],
                "description": "When in the show the event occurs, leave empty if incorrect"
            },
            "explanation": {
                "type": "string",
                "description": "Explanation of the guess's correctness or incorrectness"
            },
            "confidence": {
                "type": "number",
                "description": "Your confidence level (0-1 scale)"
            }
        },
        "required": ["is_correct", "accuracy", "time", "explanation", "confidence"],
        "additionalProperties": false
    })
}

/// Search tool offered to the engine during verdict extraction. Tool choice
/// stays automatic; a response that only requests the tool is handled as a
/// transient failure by the caller, never looped.
fn web_search_tool() -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: "web_search".to_string(),
            description: Some(
                "Perform a web search to find information about the TV show.".to_string(),
            ),
            parameters: Some(json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            })),
            strict: None,
        },
    }
}

#[async_trait::async_trait]
impl Llm for LlmClient {
    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .build()?;
        bounded(self.timeout, async {
            let resp = self.client.chat().create(req).await?;
            let choice = resp.choices.into_iter().next().context("empty completion")?;
            Ok(choice.message.content.unwrap_or_default())
        })
        .await
    }

    async fn chat_verdict(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .tools(vec![web_search_tool()])
            .tool_choice(ChatCompletionToolChoiceOption::Auto)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "plot_guess_evaluation".to_string(),
                    description: Some("Evaluation of a guess about a TV show plot".to_string()),
                    schema: Some(verdict_schema()),
                    strict: Some(true),
                },
            })
            .build()?;
        bounded(self.timeout, async {
            let resp = self.client.chat().create(req).await?;
            let choice = resp.choices.into_iter().next().context("empty completion")?;
            match choice.message.content {
                Some(text) if !text.trim().is_empty() => Ok(text),
                _ => bail!("engine returned no verdict content (tool call or empty turn)"),
            }
        })
        .await
    }
}
