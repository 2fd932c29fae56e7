use netscout_agent::AgentRuntime;
use netscout_core::SessionId;

use crate::commands::{error_class, interface_error, interruptible_turn, CommandResult};

/// Runs one turn; Ctrl-C cancels it and the command reports the cancellation.
pub async fn run(runtime: &AgentRuntime, session: &SessionId, question: &str) -> CommandResult {
    if question.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "question must not be empty", 1);
    }

    let result = interruptible_turn(runtime, session, question, true).await;
    match result {
        Ok(outcome) => CommandResult::text(0, outcome.answer),
        Err(error) => {
            let error = interface_error("ask", error);
            CommandResult::failure(
                "ask",
                error_class(&error),
                format!("{} (correlation id: {})", error.user_message(), error.correlation_id()),
                1,
            )
        }
    }
}
