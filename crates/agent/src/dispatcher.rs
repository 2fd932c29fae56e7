use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use netscout_core::{Message, ToolErrorKind, ToolPayload, ToolRequest};
use tokio_util::sync::CancellationToken;

use crate::tools::ToolRegistry;
use crate::validation::validate_arguments;

/// Results of one dispatch batch, in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchBatch {
    pub results: Vec<Message>,
    pub cancelled: bool,
}

/// Runs the tool requests of one assistant message. Every failure becomes an error payload.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
    concurrency: usize,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration, concurrency: usize) -> Self {
        Self { registry, tool_timeout, concurrency: concurrency.max(1) }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Produces exactly one tool result per request. After cancellation, requests that had
    /// not finished receive a `cancelled` payload.
    pub async fn dispatch(&self, requests: &[ToolRequest], cancel: &CancellationToken) -> DispatchBatch {
        let results = stream::iter(requests.iter().cloned())
            .map(|request| self.resolve(request, cancel))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        DispatchBatch { results, cancelled: cancel.is_cancelled() }
    }

    async fn resolve(&self, request: ToolRequest, cancel: &CancellationToken) -> Message {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                ToolPayload::error(ToolErrorKind::Cancelled, "turn cancelled before the tool finished")
            }
            payload = self.invoke(&request) => payload,
        };
        Message::tool_result(&request, payload)
    }

    /// Runs a single request: lookup, validation and the handler under the tool timeout.
    pub async fn invoke(&self, request: &ToolRequest) -> ToolPayload {
        let Some(tool) = self.registry.get(&request.name) else {
            tracing::warn!(
                event_name = "agent.dispatch.tool_not_found",
                tool_name = %request.name,
                request_id = %request.id,
                "model requested an unknown tool"
            );
            return ToolPayload::error(
                ToolErrorKind::ToolNotFound,
                format!("no tool named `{}` is registered", request.name),
            );
        };

        let arguments = match validate_arguments(tool.definition(), &request.arguments) {
            Ok(arguments) => arguments,
            Err(message) => {
                tracing::warn!(
                    event_name = "agent.dispatch.invalid_arguments",
                    tool_name = %request.name,
                    request_id = %request.id,
                    reason = %message,
                    "tool arguments rejected"
                );
                return ToolPayload::error(ToolErrorKind::InvalidArguments, message);
            }
        };

        match tokio::time::timeout(self.tool_timeout, tool.handler().call(arguments)).await {
            Ok(Ok(records)) => {
                tracing::debug!(
                    event_name = "agent.dispatch.tool_succeeded",
                    tool_name = %request.name,
                    request_id = %request.id,
                    records = records.len(),
                    "tool returned records"
                );
                ToolPayload::records(records)
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    event_name = "agent.dispatch.tool_failed",
                    tool_name = %request.name,
                    request_id = %request.id,
                    cause = error.cause_code(),
                    error = %error,
                    "tool failed"
                );
                ToolPayload::error(
                    ToolErrorKind::CollectorFailure,
                    format!("{}: {error}", error.cause_code()),
                )
            }
            Err(_) => {
                tracing::warn!(
                    event_name = "agent.dispatch.tool_timed_out",
                    tool_name = %request.name,
                    request_id = %request.id,
                    timeout_secs = self.tool_timeout.as_secs(),
                    "tool timed out"
                );
                ToolPayload::error(
                    ToolErrorKind::Timeout,
                    format!("`{}` did not finish within {:?}", request.name, self.tool_timeout),
                )
            }
        }
    }
}
