use netscout_agent::ToolDispatcher;
use netscout_core::{ToolRequest, ToolRequestId};
use serde_json::Value;

use crate::commands::CommandResult;

/// Runs one tool through the same lookup, validation and timeout path the loop uses.
pub async fn run(dispatcher: &ToolDispatcher, tool: &str, raw_arguments: &str) -> CommandResult {
    let arguments = match serde_json::from_str::<Value>(raw_arguments) {
        Ok(arguments) => arguments,
        Err(error) => {
            return CommandResult::failure(
                "invoke",
                "invalid_arguments",
                format!("--args is not valid JSON: {error}"),
                1,
            );
        }
    };

    let request = ToolRequest::new(ToolRequestId::generate().0, tool, arguments);
    let payload = dispatcher.invoke(&request).await;
    let exit_code = if payload.is_error() { 1 } else { 0 };

    match serde_json::to_string_pretty(&payload) {
        Ok(output) => CommandResult::text(exit_code, output),
        Err(error) => CommandResult::failure("invoke", "serialization", error.to_string(), 1),
    }
}
