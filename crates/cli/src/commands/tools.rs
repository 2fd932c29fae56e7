use netscout_agent::catalog;
use netscout_core::ToolDefinition;
use serde_json::{json, Value};

use crate::commands::CommandResult;

/// Lists the catalog without loading config or touching the network.
pub fn run(json_output: bool) -> CommandResult {
    let definitions = catalog::definitions();

    if json_output {
        let tools = definitions
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.json_schema(),
                })
            })
            .collect::<Vec<_>>();
        return match serde_json::to_string_pretty(&Value::Array(tools)) {
            Ok(output) => CommandResult::text(0, output),
            Err(error) => CommandResult::failure("tools", "serialization", error.to_string(), 1),
        };
    }

    CommandResult::text(0, render_human(&definitions))
}

fn render_human(definitions: &[ToolDefinition]) -> String {
    let mut lines = vec![format!("{} tools available:", definitions.len())];

    for tool in definitions {
        lines.push(format!("- {}: {}", tool.name, tool.description));
        for param in &tool.parameters {
            let requirement = if param.required { "required" } else { "optional" };
            lines.push(format!(
                "    {} ({}, {requirement}): {}",
                param.name,
                param.kind.json_type(),
                param.description
            ));
        }
    }

    lines.join("\n")
}
