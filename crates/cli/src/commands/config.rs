use std::env;
use std::fs;
use std::path::Path;

use netscout_core::aws_profile::{self, SharedProfile};
use netscout_core::config::{resolve_config_path, AppConfig, LlmProvider, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use crate::commands::CommandResult;

/// One rendered setting: the `NETSCOUT_*` variable outranks the file, ambient variables
/// only outrank the shared AWS profile and the default.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    ambient_keys: &'static [&'static str],
    from_profile: bool,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let profile = aws_profile::load_shared_profile().unwrap_or_default();

    let mut lines = vec![
        "effective config (source precedence: env > file > ambient env > aws profile > default):".to_string(),
    ];
    for field in fields(&config, &profile) {
        let source =
            field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref(), &profile.name);
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::text(0, lines.join("\n"))
}

fn fields(config: &AppConfig, profile: &SharedProfile) -> Vec<Field> {
    let llm_ambient: &'static [&'static str] = match config.llm.provider {
        LlmProvider::OpenAi => &["OPENAI_API_KEY"],
        LlmProvider::Anthropic => &["ANTHROPIC_API_KEY"],
        LlmProvider::Ollama => &[],
    };
    let profile_keys = profile.has_credentials() && first_set(&["AWS_ACCESS_KEY_ID"]).is_none();

    vec![
        Field {
            key: "llm.provider",
            value: config.llm.provider.as_str().to_string(),
            env_keys: &["NETSCOUT_LLM_PROVIDER"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["NETSCOUT_LLM_MODEL"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.base_url",
            value: config.llm_base_url(),
            env_keys: &["NETSCOUT_LLM_BASE_URL"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.api_key",
            value: redact_secret(config.llm.api_key.as_ref()),
            env_keys: &["NETSCOUT_LLM_API_KEY"],
            ambient_keys: llm_ambient,
            from_profile: false,
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["NETSCOUT_LLM_TIMEOUT_SECS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.max_retries",
            value: config.llm.max_retries.to_string(),
            env_keys: &["NETSCOUT_LLM_MAX_RETRIES"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["NETSCOUT_LLM_TEMPERATURE"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "llm.max_tokens",
            value: config.llm.max_tokens.to_string(),
            env_keys: &["NETSCOUT_LLM_MAX_TOKENS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "aws.region",
            value: config.aws.region.clone(),
            env_keys: &["NETSCOUT_AWS_REGION"],
            ambient_keys: &["AWS_REGION", "AWS_DEFAULT_REGION"],
            from_profile: profile.region.is_some(),
        },
        Field {
            key: "aws.access_key_id",
            value: mask_identifier(config.aws.access_key_id.as_deref()),
            env_keys: &["NETSCOUT_AWS_ACCESS_KEY_ID"],
            ambient_keys: &["AWS_ACCESS_KEY_ID"],
            from_profile: profile_keys,
        },
        Field {
            key: "aws.secret_access_key",
            value: redact_secret(config.aws.secret_access_key.as_ref()),
            env_keys: &["NETSCOUT_AWS_SECRET_ACCESS_KEY"],
            ambient_keys: &["AWS_SECRET_ACCESS_KEY"],
            from_profile: profile_keys,
        },
        Field {
            key: "aws.session_token",
            value: redact_secret(config.aws.session_token.as_ref()),
            env_keys: &["NETSCOUT_AWS_SESSION_TOKEN"],
            ambient_keys: &["AWS_SESSION_TOKEN"],
            from_profile: profile_keys && profile.session_token.is_some(),
        },
        Field {
            key: "aws.ec2_endpoint",
            value: config.aws.ec2_endpoint.clone().unwrap_or_else(|| "<regional default>".to_string()),
            env_keys: &["NETSCOUT_AWS_EC2_ENDPOINT"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "aws.elb_endpoint",
            value: config.aws.elb_endpoint.clone().unwrap_or_else(|| "<regional default>".to_string()),
            env_keys: &["NETSCOUT_AWS_ELB_ENDPOINT"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "aws.timeout_secs",
            value: config.aws.timeout_secs.to_string(),
            env_keys: &["NETSCOUT_AWS_TIMEOUT_SECS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "aws.max_pages",
            value: config.aws.max_pages.to_string(),
            env_keys: &["NETSCOUT_AWS_MAX_PAGES"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "firewall.host",
            value: config.firewall.host.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["NETSCOUT_FIREWALL_HOST"],
            ambient_keys: &["PA_VM_IP"],
            from_profile: false,
        },
        Field {
            key: "firewall.username",
            value: config.firewall.username.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["NETSCOUT_FIREWALL_USERNAME"],
            ambient_keys: &["PA_VM_USERNAME"],
            from_profile: false,
        },
        Field {
            key: "firewall.password",
            value: redact_secret(config.firewall.password.as_ref()),
            env_keys: &["NETSCOUT_FIREWALL_PASSWORD"],
            ambient_keys: &["PA_VM_PASSWORD"],
            from_profile: false,
        },
        Field {
            key: "firewall.vsys",
            value: config.firewall.vsys.clone(),
            env_keys: &["NETSCOUT_FIREWALL_VSYS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "firewall.verify_tls",
            value: config.firewall.verify_tls.to_string(),
            env_keys: &["NETSCOUT_FIREWALL_VERIFY_TLS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "firewall.timeout_secs",
            value: config.firewall.timeout_secs.to_string(),
            env_keys: &["NETSCOUT_FIREWALL_TIMEOUT_SECS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "agent.session_id",
            value: config.agent.session_id.clone(),
            env_keys: &["NETSCOUT_AGENT_SESSION_ID"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "agent.max_cycles",
            value: config.agent.max_cycles.to_string(),
            env_keys: &["NETSCOUT_AGENT_MAX_CYCLES"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "agent.tool_timeout_secs",
            value: config.agent.tool_timeout_secs.to_string(),
            env_keys: &["NETSCOUT_AGENT_TOOL_TIMEOUT_SECS"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "agent.tool_concurrency",
            value: config.agent.tool_concurrency.to_string(),
            env_keys: &["NETSCOUT_AGENT_TOOL_CONCURRENCY"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "agent.directive_path",
            value: config
                .agent
                .directive_path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "<built-in>".to_string()),
            env_keys: &["NETSCOUT_AGENT_DIRECTIVE_PATH"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["NETSCOUT_LOGGING_LEVEL", "NETSCOUT_LOG_LEVEL"],
            ambient_keys: &[],
            from_profile: false,
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["NETSCOUT_LOGGING_FORMAT", "NETSCOUT_LOG_FORMAT"],
            ambient_keys: &[],
            from_profile: false,
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
    profile_name: &str,
) -> String {
    if let Some(env_key) = first_set(field.env_keys) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    if let Some(env_key) = first_set(field.ambient_keys) {
        return format!("env ({env_key})");
    }

    if field.from_profile {
        return format!("aws profile ({profile_name})");
    }

    "default".to_string()
}

fn first_set(keys: &[&'static str]) -> Option<&'static str> {
    keys.iter()
        .copied()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false))
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        None => "<unset>".to_string(),
        Some(secret) if secret.expose_secret().trim().is_empty() => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

fn mask_identifier(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim) else {
        return "<unset>".to_string();
    };

    match value.get(..4) {
        Some(prefix) if value.len() > 4 => format!("{prefix}***"),
        _ => "***".to_string(),
    }
}
