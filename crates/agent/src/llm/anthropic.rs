use async_trait::async_trait;
use netscout_core::config::LlmConfig;
use netscout_core::{Message, ToolDefinition, ToolRequest};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::retry::RetryPolicy;
use crate::llm::{endpoint, http_client, status_error, LlmClient, LlmError};

const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic `/messages` API.
pub struct AnthropicClient {
    client: reqwest::Client,
    url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl AnthropicClient {
    pub fn from_config(config: &LlmConfig, base_url: String) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::Configuration("llm.api_key is required for the anthropic provider".to_string())
        })?;

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            url: endpoint(&base_url, "messages"),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::new(config.max_retries),
        })
    }

    pub fn request_body(&self, conversation: &[Message], tools: &[ToolDefinition]) -> Value {
        let system = conversation
            .iter()
            .filter_map(|message| match message {
                Message::System { content } => Some(content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": wire_messages(conversation),
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "input_schema": tool.json_schema(),
                        })
                    })
                    .collect(),
            );
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        conversation: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, LlmError> {
        let body = self.request_body(conversation, tools);
        let body = &body;
        let text = self.retry.run("anthropic", move || self.send(body)).await?;
        parse_response(&text)
    }
}

/// Turns follow user/assistant alternation, so consecutive tool results share one user turn.
fn wire_messages(conversation: &[Message]) -> Vec<Value> {
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for message in conversation {
        let (role, blocks) = match message {
            Message::System { .. } => continue,
            Message::Human { content } => ("user", vec![json!({ "type": "text", "text": content })]),
            Message::Assistant { content, tool_requests } => {
                let mut blocks = Vec::new();
                if let Some(text) = content {
                    blocks.push(json!({ "type": "text", "text": text }));
                }
                blocks.extend(tool_requests.iter().map(|request| {
                    json!({
                        "type": "tool_use",
                        "id": request.id.0,
                        "name": request.name,
                        "input": request.arguments,
                    })
                }));
                ("assistant", blocks)
            }
            Message::ToolResult { request_id, payload, .. } => (
                "user",
                vec![json!({
                    "type": "tool_result",
                    "tool_use_id": request_id.0,
                    "content": payload.to_model_content(),
                    "is_error": payload.is_error(),
                })],
            ),
        };
        if blocks.is_empty() {
            continue;
        }

        match turns.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => turns.push((role, blocks)),
        }
    }

    turns
        .into_iter()
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect()
}

pub fn parse_response(body: &str) -> Result<Message, LlmError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|error| LlmError::Malformed(error.to_string()))?;

    let mut text = Vec::new();
    let mut tool_requests = Vec::new();
    for block in response.content {
        match block {
            ResponseBlock::Text { text: chunk } => text.push(chunk),
            ResponseBlock::ToolUse { id, name, input } => {
                let input = if input.is_null() { json!({}) } else { input };
                tool_requests.push(ToolRequest::new(id, name, input));
            }
            ResponseBlock::Other => {}
        }
    }

    let content = if text.is_empty() { None } else { Some(text.join("\n")) };
    Ok(Message::assistant(content, tool_requests))
}

#[cfg(test)]
mod tests {
    use netscout_core::config::{LlmConfig, LlmProvider};
    use netscout_core::{Message, ToolDefinition, ToolErrorKind, ToolPayload, ToolRequest};
    use serde_json::json;

    use super::{parse_response, AnthropicClient};

    fn client() -> AnthropicClient {
        let config = LlmConfig {
            provider: LlmProvider::Anthropic,
            api_key: Some("sk-ant-test".to_string().into()),
            base_url: None,
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_secs: 5,
            max_retries: 0,
            temperature: 0.0,
            max_tokens: 1024,
        };
        AnthropicClient::from_config(&config, "https://api.anthropic.com/v1".to_string())
            .expect("client")
    }

    #[test]
    fn system_is_lifted_and_tool_results_are_merged() {
        let vpcs = ToolRequest::new("toolu_1", "list-vpcs", json!({}));
        let health = ToolRequest::new("toolu_2", "get-target-group-health", json!({"target_group_arn": "arn:x"}));
        let conversation = vec![
            Message::system("directive"),
            Message::human("is the GWLB target healthy?"),
            Message::assistant(Some("Checking.".to_string()), vec![vpcs.clone(), health.clone()]),
            Message::tool_result(&vpcs, ToolPayload::records(Vec::new())),
            Message::tool_result(&health, ToolPayload::error(ToolErrorKind::CollectorFailure, "not found")),
        ];

        let body = client().request_body(&conversation, &[ToolDefinition::new("list-vpcs", "List VPCs")]);

        assert_eq!(body["system"], "directive");
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"].as_array().map(Vec::len), Some(2));
        assert_eq!(messages[2]["content"][1]["is_error"], json!(true));
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn parses_text_and_tool_use_blocks() {
        let message = parse_response(
            r#"{"id":"msg_1","type":"message","role":"assistant","content":[
                {"type":"text","text":"Let me look at the routes."},
                {"type":"tool_use","id":"toolu_9","name":"list-firewall-routes","input":{"virtual_router":"default"}}
            ],"stop_reason":"tool_use"}"#,
        )
        .expect("parsed");

        assert_eq!(message.text(), Some("Let me look at the routes."));
        assert_eq!(message.tool_requests()[0].id.0, "toolu_9");
        assert_eq!(message.tool_requests()[0].arguments, json!({"virtual_router": "default"}));
    }

    #[test]
    fn unknown_blocks_are_ignored() {
        let message = parse_response(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Done."}]}"#,
        )
        .expect("parsed");
        assert_eq!(message.text(), Some("Done."));
    }
}
