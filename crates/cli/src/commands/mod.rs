pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod invoke;
pub mod tools;

use netscout_agent::{AgentRuntime, TurnError, TurnOutcome};
use netscout_core::{ApplicationError, InterfaceError, SessionId};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: String,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: error_class.to_string(),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Plain text output, printed as-is.
    pub fn text(exit_code: u8, output: impl Into<String>) -> Self {
        Self { exit_code, output: output.into() }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Maps a failed turn to its user-safe form, logging the detail under a fresh correlation id.
pub(crate) fn interface_error(command: &str, error: TurnError) -> InterfaceError {
    let correlation_id = uuid::Uuid::new_v4().to_string();
    tracing::warn!(
        event_name = "cli.turn.failed",
        command,
        correlation_id = %correlation_id,
        error = %error,
        "turn failed"
    );
    ApplicationError::from(error).into_interface(correlation_id)
}

pub(crate) fn error_class(error: &InterfaceError) -> &'static str {
    match error {
        InterfaceError::BadRequest { .. } => "bad_request",
        InterfaceError::ServiceUnavailable { .. } => "service_unavailable",
        InterfaceError::Cancelled { .. } => "cancelled",
        InterfaceError::Internal { .. } => "internal",
    }
}

/// Runs one turn; with `cancel_on_interrupt`, Ctrl-C cancels it instead of killing the process.
pub(crate) async fn interruptible_turn(
    runtime: &AgentRuntime,
    session: &SessionId,
    input: &str,
    cancel_on_interrupt: bool,
) -> Result<TurnOutcome, TurnError> {
    let cancel = CancellationToken::new();
    let turn = runtime.run_turn(session, input, &cancel);
    tokio::pin!(turn);

    loop {
        tokio::select! {
            result = &mut turn => return result,
            _ = interrupted(cancel_on_interrupt), if !cancel.is_cancelled() => {
                tracing::info!(event_name = "cli.turn.interrupted", session_id = %session, "cancelling turn");
                cancel.cancel();
            }
        }
    }
}

/// Resolves on Ctrl-C when `enabled`; otherwise never.
pub(crate) async fn interrupted(enabled: bool) {
    if !enabled || tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
