use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::tool::Record;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolRequestId(pub String);

impl ToolRequestId {
    pub fn generate() -> Self {
        Self(format!("call_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for ToolRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tool invocation requested by the model inside an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: ToolRequestId,
    pub name: String,
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self { id: ToolRequestId(id.into()), name: name.into(), arguments }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    ToolNotFound,
    InvalidArguments,
    CollectorFailure,
    Timeout,
    Cancelled,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "tool_not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::CollectorFailure => "collector_failure",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolPayload {
    Records { records: Vec<Record> },
    Error { kind: ToolErrorKind, message: String },
}

impl ToolPayload {
    pub fn records(records: Vec<Record>) -> Self {
        Self::Records { records }
    }

    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self::Error { kind, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            Self::Records { .. } => None,
        }
    }

    /// Text handed back to the model as the tool message content.
    pub fn to_model_content(&self) -> String {
        let value = match self {
            Self::Records { records } => Value::Array(
                records.iter().cloned().map(Value::Object).collect::<Vec<_>>(),
            ),
            Self::Error { kind, message } => {
                json!({ "error": { "kind": kind.as_str(), "message": message } })
            }
        };
        value.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_requests: Vec<ToolRequest>,
    },
    ToolResult {
        request_id: ToolRequestId,
        tool_name: String,
        payload: ToolPayload,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::Human { content: content.into() }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::Assistant { content: Some(content.into()), tool_requests: Vec::new() }
    }

    pub fn assistant(content: Option<String>, tool_requests: Vec<ToolRequest>) -> Self {
        let content = content.filter(|text| !text.trim().is_empty());
        Self::Assistant { content, tool_requests }
    }

    pub fn tool_result(request: &ToolRequest, payload: ToolPayload) -> Self {
        Self::ToolResult {
            request_id: request.id.clone(),
            tool_name: request.name.clone(),
            payload,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Human { .. } => "human",
            Self::Assistant { .. } => "assistant",
            Self::ToolResult { .. } => "tool_result",
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }

    pub fn tool_requests(&self) -> &[ToolRequest] {
        match self {
            Self::Assistant { tool_requests, .. } => tool_requests,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::Human { content } => Some(content),
            Self::Assistant { content, .. } => content.as_deref(),
            Self::ToolResult { .. } => None,
        }
    }
}
