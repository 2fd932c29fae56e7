pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use netscout_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

use crate::bootstrap::Application;
use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "netscout",
    about = "Cloud network troubleshooting assistant",
    long_about = "Ask questions about AWS VPC networking and Palo Alto firewalls. The assistant looks up \
                  live inventory through read-only tools and reasons over the results.",
    after_help = "Examples:\n  netscout chat\n  netscout ask \"show the path from 10.0.1.5 to 10.2.0.9\"\n  \
                  netscout invoke get-target-group-health --args '{\"target_group_arn\":\"arn:...\"}'\n  \
                  netscout doctor --json"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file; must exist when given (default: netscout.toml if present)"
    )]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Override logging.level")]
    log_level: Option<String>,
    #[arg(long, global = true, value_name = "FORMAT", help = "Override logging.format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[arg(long, global = true, value_name = "PROVIDER", help = "Override llm.provider (openai|anthropic|ollama)")]
    provider: Option<LlmProvider>,
    #[arg(long, global = true, value_name = "MODEL", help = "Override llm.model")]
    model: Option<String>,
    #[arg(long, global = true, value_name = "REGION", help = "Override aws.region")]
    region: Option<String>,
    #[arg(long, global = true, value_name = "HOST", help = "Override firewall.host")]
    firewall_host: Option<String>,
    #[arg(long, global = true, value_name = "N", help = "Override agent.max_cycles")]
    max_cycles: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive troubleshooting session")]
    Chat {
        #[arg(long, help = "Conversation to continue (default: agent.session_id)")]
        session: Option<String>,
    },
    #[command(about = "Run a single turn and print the answer")]
    Ask {
        question: String,
        #[arg(long, help = "Conversation to continue (default: agent.session_id)")]
        session: Option<String>,
    },
    #[command(about = "List the tools the assistant can call")]
    Tools {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one tool directly and print its result payload")]
    Invoke {
        tool: String,
        #[arg(long, default_value = "{}", help = "Tool arguments as a JSON object")]
        args: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config, credentials and firewall API reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => {
            let result = runtime.block_on(execute(cli));
            // A pending stdin read would otherwise hold shutdown open.
            runtime.shutdown_background();
            result
        }
        Err(error) => CommandResult::failure(
            "netscout",
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            1,
        ),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Global flags outrank every other configuration layer.
fn load_options(cli: &Cli) -> LoadOptions {
    LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides {
            log_level: cli.log_level.clone(),
            log_format: cli.log_format,
            llm_provider: cli.provider,
            llm_model: cli.model.clone(),
            aws_region: cli.region.clone(),
            firewall_host: cli.firewall_host.clone(),
            session_id: None,
            max_cycles: cli.max_cycles,
        },
    }
}

async fn execute(cli: Cli) -> CommandResult {
    let mut options = load_options(&cli);

    match cli.command {
        Command::Tools { json } => commands::tools::run(json),
        Command::Config => commands::config::run(&options),
        Command::Doctor { json } => commands::doctor::run(&options, json).await,
        Command::Chat { session } => {
            options.overrides.session_id = session;
            match start("chat", options) {
                Ok(app) => commands::chat::run(&app).await,
                Err(failure) => failure,
            }
        }
        Command::Ask { question, session } => {
            options.overrides.session_id = session;
            match start("ask", options) {
                Ok(app) => commands::ask::run(&app.runtime, &app.session, &question).await,
                Err(failure) => failure,
            }
        }
        Command::Invoke { tool, args } => match start("invoke", options) {
            Ok(app) => commands::invoke::run(app.runtime.dispatcher(), &tool, &args).await,
            Err(failure) => failure,
        },
    }
}

/// Loads config, installs the subscriber, then wires the runtime.
fn start(command: &str, options: LoadOptions) -> Result<Application, CommandResult> {
    let config = AppConfig::load(options).map_err(|error| {
        CommandResult::failure(command, "config_validation", error.to_string(), 2)
    })?;
    logging::init_logging(&config);

    bootstrap::bootstrap_with_config(config).map_err(|error| {
        CommandResult::failure(command, error.error_class(), error.to_string(), error.exit_code())
    })
}
