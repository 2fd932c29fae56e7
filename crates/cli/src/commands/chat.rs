use anyhow::{Context, Result};
use netscout_agent::AgentRuntime;
use netscout_core::SessionId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::bootstrap::Application;
use crate::commands::{interface_error, interruptible_turn, interrupted, CommandResult};

const PROMPT: &str = "User: ";

pub async fn run(app: &Application) -> CommandResult {
    tracing::info!(
        event_name = "cli.chat.started",
        session_id = %app.session,
        provider = app.config.llm.provider.as_str(),
        model = %app.config.llm.model,
        "interactive session started"
    );

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    match run_shell(&app.runtime, &app.session, reader, writer, true).await {
        Ok(()) => CommandResult::text(0, ""),
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

pub fn is_quit_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "quit" | "exit" | "q")
}

/// Reads one line per prompt until a quit command or EOF. Turn failures are reported and the
/// loop continues.
pub async fn run_shell<R, W>(
    runtime: &AgentRuntime,
    session: &SessionId,
    reader: R,
    mut writer: W,
    cancel_on_interrupt: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        writer.write_all(PROMPT.as_bytes()).await.context("failed to write prompt")?;
        writer.flush().await.context("failed to flush prompt")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = interrupted(cancel_on_interrupt) => None,
        };
        let Some(line) = line else {
            writer.write_all(b"\n").await.context("failed to write output")?;
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_quit_command(input) {
            writer.write_all(b"Goodbye\n").await.context("failed to write output")?;
            break;
        }

        let reply = turn_reply(runtime, session, input, cancel_on_interrupt).await;
        writer
            .write_all(format!("Agent: {reply}\n").as_bytes())
            .await
            .context("failed to write answer")?;
    }

    writer.flush().await.context("failed to flush output")?;
    tracing::info!(event_name = "cli.chat.ended", session_id = %session, "interactive session ended");
    Ok(())
}

async fn turn_reply(
    runtime: &AgentRuntime,
    session: &SessionId,
    input: &str,
    cancel_on_interrupt: bool,
) -> String {
    let result = interruptible_turn(runtime, session, input, cancel_on_interrupt).await;
    match result {
        Ok(outcome) => outcome.answer,
        Err(error) => {
            let error = interface_error("chat", error);
            format!("{} (correlation id: {})", error.user_message(), error.correlation_id())
        }
    }
}
