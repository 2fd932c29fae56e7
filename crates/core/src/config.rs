use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aws_profile;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["netscout.toml", "config/netscout.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub aws: AwsConfig,
    pub firewall: FirewallConfig,
    pub agent: AgentConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub ec2_endpoint: Option<String>,
    pub elb_endpoint: Option<String>,
    pub timeout_secs: u64,
    pub max_pages: u32,
}

#[derive(Clone, Debug)]
pub struct FirewallConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub vsys: String,
    pub verify_tls: bool,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub session_id: String,
    pub max_cycles: u32,
    pub tool_timeout_secs: u64,
    pub tool_concurrency: usize,
    pub directive_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    fn requires_api_key(self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic)
    }

    fn ambient_key_var(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub aws_region: Option<String>,
    pub firewall_host: Option<String>,
    pub session_id: Option<String>,
    pub max_cycles: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("could not read directive file `{path}`: {source}")]
    ReadDirective { path: PathBuf, source: std::io::Error },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                model: "gpt-4o".to_string(),
                timeout_secs: 60,
                max_retries: 2,
                temperature: 0.0,
                max_tokens: 4096,
            },
            aws: AwsConfig {
                region: "us-east-1".to_string(),
                access_key_id: None,
                secret_access_key: None,
                session_token: None,
                ec2_endpoint: None,
                elb_endpoint: None,
                timeout_secs: 30,
                max_pages: 20,
            },
            firewall: FirewallConfig {
                host: None,
                username: None,
                password: None,
                vsys: "vsys1".to_string(),
                verify_tls: true,
                timeout_secs: 30,
            },
            agent: AgentConfig {
                session_id: "default".to_string(),
                max_cycles: 10,
                tool_timeout_secs: 30,
                tool_concurrency: 4,
                directive_path: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Loads configuration with precedence defaults < ambient sources < file
    /// < `NETSCOUT_*` environment < explicit overrides, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_ambient_fallbacks()?;

        let maybe_path = resolve_config_path(options.config_path.as_deref());
        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.apply_api_key_fallback();
        config.validate()?;

        Ok(config)
    }

    pub fn llm_base_url(&self) -> String {
        self.llm
            .base_url
            .clone()
            .unwrap_or_else(|| self.llm.provider.default_base_url().to_string())
    }

    fn apply_ambient_fallbacks(&mut self) -> Result<(), ConfigError> {
        let profile = aws_profile::load_shared_profile()?;
        if let Some(value) = read_env("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(value);
            self.aws.secret_access_key = read_env("AWS_SECRET_ACCESS_KEY").map(secret_value);
            self.aws.session_token = read_env("AWS_SESSION_TOKEN").map(secret_value);
        } else if profile.has_credentials() {
            self.aws.access_key_id = profile.access_key_id;
            self.aws.secret_access_key = profile.secret_access_key.map(secret_value);
            self.aws.session_token = profile.session_token.map(secret_value);
        }
        if let Some(value) =
            read_env("AWS_REGION").or_else(|| read_env("AWS_DEFAULT_REGION")).or(profile.region)
        {
            self.aws.region = value;
        }

        if let Some(value) = read_env("PA_VM_IP") {
            self.firewall.host = Some(value);
        }
        if let Some(value) = read_env("PA_VM_USERNAME") {
            self.firewall.username = Some(value);
        }
        if let Some(value) = read_env("PA_VM_PASSWORD") {
            self.firewall.password = Some(secret_value(value));
        }
        Ok(())
    }

    // The provider is only final after every layer has been applied.
    fn apply_api_key_fallback(&mut self) {
        if self.llm.api_key.is_some() {
            return;
        }
        if let Some(value) = self.llm.provider.ambient_key_var().and_then(read_env) {
            self.llm.api_key = Some(secret_value(value));
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
        }

        if let Some(aws) = patch.aws {
            if let Some(region) = aws.region {
                self.aws.region = region;
            }
            if let Some(access_key_id) = aws.access_key_id {
                self.aws.access_key_id = Some(access_key_id);
            }
            if let Some(secret_access_key) = aws.secret_access_key {
                self.aws.secret_access_key = Some(secret_value(secret_access_key));
            }
            if let Some(session_token) = aws.session_token {
                self.aws.session_token = Some(secret_value(session_token));
            }
            if let Some(ec2_endpoint) = aws.ec2_endpoint {
                self.aws.ec2_endpoint = Some(ec2_endpoint);
            }
            if let Some(elb_endpoint) = aws.elb_endpoint {
                self.aws.elb_endpoint = Some(elb_endpoint);
            }
            if let Some(timeout_secs) = aws.timeout_secs {
                self.aws.timeout_secs = timeout_secs;
            }
            if let Some(max_pages) = aws.max_pages {
                self.aws.max_pages = max_pages;
            }
        }

        if let Some(firewall) = patch.firewall {
            if let Some(host) = firewall.host {
                self.firewall.host = Some(host);
            }
            if let Some(username) = firewall.username {
                self.firewall.username = Some(username);
            }
            if let Some(password) = firewall.password {
                self.firewall.password = Some(secret_value(password));
            }
            if let Some(vsys) = firewall.vsys {
                self.firewall.vsys = vsys;
            }
            if let Some(verify_tls) = firewall.verify_tls {
                self.firewall.verify_tls = verify_tls;
            }
            if let Some(timeout_secs) = firewall.timeout_secs {
                self.firewall.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(session_id) = agent.session_id {
                self.agent.session_id = session_id;
            }
            if let Some(max_cycles) = agent.max_cycles {
                self.agent.max_cycles = max_cycles;
            }
            if let Some(tool_timeout_secs) = agent.tool_timeout_secs {
                self.agent.tool_timeout_secs = tool_timeout_secs;
            }
            if let Some(tool_concurrency) = agent.tool_concurrency {
                self.agent.tool_concurrency = tool_concurrency;
            }
            if let Some(directive_path) = agent.directive_path {
                self.agent.directive_path = Some(directive_path);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("NETSCOUT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("NETSCOUT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("NETSCOUT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("NETSCOUT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("NETSCOUT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("NETSCOUT_LLM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("NETSCOUT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("NETSCOUT_LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("NETSCOUT_AWS_REGION") {
            self.aws.region = value;
        }
        if let Some(value) = read_env("NETSCOUT_AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("NETSCOUT_AWS_SESSION_TOKEN") {
            self.aws.session_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("NETSCOUT_AWS_EC2_ENDPOINT") {
            self.aws.ec2_endpoint = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_AWS_ELB_ENDPOINT") {
            self.aws.elb_endpoint = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_AWS_TIMEOUT_SECS") {
            self.aws.timeout_secs = parse_u64("NETSCOUT_AWS_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_AWS_MAX_PAGES") {
            self.aws.max_pages = parse_u32("NETSCOUT_AWS_MAX_PAGES", &value)?;
        }

        if let Some(value) = read_env("NETSCOUT_FIREWALL_HOST") {
            self.firewall.host = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_FIREWALL_USERNAME") {
            self.firewall.username = Some(value);
        }
        if let Some(value) = read_env("NETSCOUT_FIREWALL_PASSWORD") {
            self.firewall.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("NETSCOUT_FIREWALL_VSYS") {
            self.firewall.vsys = value;
        }
        if let Some(value) = read_env("NETSCOUT_FIREWALL_VERIFY_TLS") {
            self.firewall.verify_tls = parse_bool("NETSCOUT_FIREWALL_VERIFY_TLS", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_FIREWALL_TIMEOUT_SECS") {
            self.firewall.timeout_secs = parse_u64("NETSCOUT_FIREWALL_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("NETSCOUT_AGENT_SESSION_ID") {
            self.agent.session_id = value;
        }
        if let Some(value) = read_env("NETSCOUT_AGENT_MAX_CYCLES") {
            self.agent.max_cycles = parse_u32("NETSCOUT_AGENT_MAX_CYCLES", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_AGENT_TOOL_TIMEOUT_SECS") {
            self.agent.tool_timeout_secs = parse_u64("NETSCOUT_AGENT_TOOL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_AGENT_TOOL_CONCURRENCY") {
            self.agent.tool_concurrency = parse_usize("NETSCOUT_AGENT_TOOL_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("NETSCOUT_AGENT_DIRECTIVE_PATH") {
            self.agent.directive_path = Some(PathBuf::from(value));
        }

        let log_level =
            read_env("NETSCOUT_LOGGING_LEVEL").or_else(|| read_env("NETSCOUT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("NETSCOUT_LOGGING_FORMAT").or_else(|| read_env("NETSCOUT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(aws_region) = overrides.aws_region {
            self.aws.region = aws_region;
        }
        if let Some(firewall_host) = overrides.firewall_host {
            self.firewall.host = Some(firewall_host);
        }
        if let Some(session_id) = overrides.session_id {
            self.agent.session_id = session_id;
        }
        if let Some(max_cycles) = overrides.max_cycles {
            self.agent.max_cycles = max_cycles;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_aws(&self.aws)?;
        validate_firewall(&self.firewall)?;
        validate_agent(&self.agent)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_blank_secret(value: Option<&SecretString>) -> bool {
    value.map(|secret| secret.expose_secret().trim().is_empty()).unwrap_or(true)
}

fn is_blank(value: Option<&String>) -> bool {
    value.map(|value| value.trim().is_empty()).unwrap_or(true)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() && is_blank_secret(llm.api_key.as_ref()) {
        let hint = llm.provider.ambient_key_var().unwrap_or("NETSCOUT_LLM_API_KEY");
        return Err(ConfigError::Validation(format!(
            "llm.api_key is required for the {} provider (set NETSCOUT_LLM_API_KEY or {hint})",
            llm.provider.as_str()
        )));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_aws(aws: &AwsConfig) -> Result<(), ConfigError> {
    if aws.region.trim().is_empty() {
        return Err(ConfigError::Validation("aws.region must not be empty".to_string()));
    }

    if is_blank(aws.access_key_id.as_ref()) {
        return Err(ConfigError::Validation(
            "aws.access_key_id is required (set NETSCOUT_AWS_ACCESS_KEY_ID or AWS_ACCESS_KEY_ID, \
             or add keys for the active AWS_PROFILE to the shared credentials file)"
                .to_string(),
        ));
    }

    if is_blank_secret(aws.secret_access_key.as_ref()) {
        return Err(ConfigError::Validation(
            "aws.secret_access_key is required (set NETSCOUT_AWS_SECRET_ACCESS_KEY or AWS_SECRET_ACCESS_KEY)"
                .to_string(),
        ));
    }

    if aws.timeout_secs == 0 || aws.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "aws.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if aws.max_pages == 0 {
        return Err(ConfigError::Validation(
            "aws.max_pages must be greater than zero".to_string(),
        ));
    }

    for (key, endpoint) in [("aws.ec2_endpoint", &aws.ec2_endpoint), ("aws.elb_endpoint", &aws.elb_endpoint)] {
        if let Some(endpoint) = endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }
    }

    Ok(())
}

fn validate_firewall(firewall: &FirewallConfig) -> Result<(), ConfigError> {
    if is_blank(firewall.host.as_ref()) {
        return Err(ConfigError::Validation(
            "firewall.host is required (set NETSCOUT_FIREWALL_HOST or PA_VM_IP)".to_string(),
        ));
    }

    if is_blank(firewall.username.as_ref()) {
        return Err(ConfigError::Validation(
            "firewall.username is required (set NETSCOUT_FIREWALL_USERNAME or PA_VM_USERNAME)"
                .to_string(),
        ));
    }

    if is_blank_secret(firewall.password.as_ref()) {
        return Err(ConfigError::Validation(
            "firewall.password is required (set NETSCOUT_FIREWALL_PASSWORD or PA_VM_PASSWORD)"
                .to_string(),
        ));
    }

    if firewall.vsys.trim().is_empty() {
        return Err(ConfigError::Validation("firewall.vsys must not be empty".to_string()));
    }

    if firewall.timeout_secs == 0 || firewall.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "firewall.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.session_id.trim().is_empty() {
        return Err(ConfigError::Validation("agent.session_id must not be empty".to_string()));
    }

    if agent.max_cycles == 0 || agent.max_cycles > 100 {
        return Err(ConfigError::Validation(
            "agent.max_cycles must be in range 1..=100".to_string(),
        ));
    }

    if agent.tool_timeout_secs == 0 || agent.tool_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.tool_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if agent.tool_concurrency == 0 {
        return Err(ConfigError::Validation(
            "agent.tool_concurrency must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    aws: Option<AwsPatch>,
    firewall: Option<FirewallPatch>,
    agent: Option<AgentPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AwsPatch {
    region: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    ec2_endpoint: Option<String>,
    elb_endpoint: Option<String>,
    timeout_secs: Option<u64>,
    max_pages: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FirewallPatch {
    host: Option<String>,
    username: Option<String>,
    password: Option<String>,
    vsys: Option<String>,
    verify_tls: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    session_id: Option<String>,
    max_cycles: Option<u32>,
    tool_timeout_secs: Option<u64>,
    tool_concurrency: Option<usize>,
    directive_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
