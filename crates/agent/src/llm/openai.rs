use async_trait::async_trait;
use netscout_core::config::LlmConfig;
use netscout_core::{Message, ToolDefinition, ToolRequest};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::retry::RetryPolicy;
use crate::llm::{endpoint, http_client, status_error, LlmClient, LlmError};

/// Client for `/chat/completions` function calling (OpenAI and Ollama).
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: endpoint(&base_url, "chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn request_body(&self, conversation: &[Message], tools: &[ToolDefinition]) -> Value {
        let messages = conversation.iter().map(wire_message).collect::<Vec<_>>();
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.json_schema(),
                            }
                        })
                    })
                    .collect(),
            );
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<String, LlmError> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError> {
        let body = self.request_body(conversation, tools);
        let body = &body;
        let text = self.retry.run("openai", move || self.send(body)).await?;
        parse_response(&text)
    }
}

fn wire_message(message: &Message) -> Value {
    match message {
        Message::System { content } => json!({ "role": "system", "content": content }),
        Message::Human { content } => json!({ "role": "user", "content": content }),
        Message::Assistant { content, tool_requests } => {
            let mut value = json!({ "role": "assistant", "content": content });
            if !tool_requests.is_empty() {
                value["tool_calls"] = Value::Array(
                    tool_requests
                        .iter()
                        .map(|request| {
                            json!({
                                "id": request.id.0,
                                "type": "function",
                                "function": {
                                    "name": request.name,
                                    "arguments": request.arguments.to_string(),
                                }
                            })
                        })
                        .collect(),
                );
            }
            value
        }
        Message::ToolResult { request_id, payload, .. } => json!({
            "role": "tool",
            "tool_call_id": request_id.0,
            "content": payload.to_model_content(),
        }),
    }
}

/// Reads the first choice. Ids are passed through as-is; the caller repairs missing ones.
pub fn parse_response(body: &str) -> Result<Message, LlmError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|error| LlmError::Malformed(error.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Malformed("response has no choices".to_string()))?;

    let tool_requests = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolRequest::new(call.id, call.function.name, decode_arguments(call.function.arguments)))
        .collect();

    Ok(Message::assistant(choice.message.content, tool_requests))
}

/// OpenAI sends arguments as a JSON string, Ollama sometimes as an object. Text that is not
/// JSON is kept as a string so argument validation reports it back to the model.
fn decode_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Null => json!({}),
        Value::String(raw) if raw.trim().is_empty() => json!({}),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        other => other,
    }
}
