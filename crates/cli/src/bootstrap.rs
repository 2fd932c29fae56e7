use std::sync::Arc;
use std::time::Duration;

use netscout_agent::catalog::build_registry;
use netscout_agent::llm::client_from_config;
use netscout_agent::{AgentRuntime, InMemoryStore, LlmClient, LlmError, RegistryError, ToolDispatcher};
use netscout_collectors::{
    AwsInventory, CloudInventory, CollectorError, FirewallInventory, HttpQueryTransport,
    PanosFirewall, PanosHttpClient,
};
use netscout_core::config::{AppConfig, ConfigError};
use netscout_core::{SessionId, SystemDirective};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: AgentRuntime,
    pub session: SessionId,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("collector setup failed: {0}")]
    Collector(#[from] CollectorError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("tool registry setup failed: {0}")]
    Registry(#[from] RegistryError),
}

impl BootstrapError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_)
            | Self::Collector(CollectorError::Configuration(_))
            | Self::Llm(LlmError::Configuration(_)) => 2,
            Self::Collector(_) | Self::Llm(_) | Self::Registry(_) => 1,
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Collector(_) => "collector_setup",
            Self::Llm(_) => "llm_setup",
            Self::Registry(_) => "registry_setup",
        }
    }
}

/// Builds every client once; nothing here touches the network.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let llm = client_from_config(&config)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        "llm client constructed"
    );

    let transport = HttpQueryTransport::from_config(&config.aws)?;
    let cloud: Arc<dyn CloudInventory> = Arc::new(AwsInventory::new(transport, config.aws.max_pages));
    let panos = PanosHttpClient::from_config(&config.firewall)?;
    let firewall: Arc<dyn FirewallInventory> =
        Arc::new(PanosFirewall::new(panos, config.firewall.vsys.clone()));
    info!(
        event_name = "system.bootstrap.collectors_ready",
        correlation_id = "bootstrap",
        region = %config.aws.region,
        vsys = %config.firewall.vsys,
        "collectors constructed"
    );

    let runtime = build_runtime(&config, llm, cloud, firewall)?;
    let session = SessionId::new(config.agent.session_id.clone());
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        session_id = %session,
        tools = runtime.dispatcher().registry().len(),
        "agent runtime ready"
    );

    Ok(Application { config, runtime, session })
}

pub fn build_runtime(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
    cloud: Arc<dyn CloudInventory>,
    firewall: Arc<dyn FirewallInventory>,
) -> Result<AgentRuntime, BootstrapError> {
    let directive = SystemDirective::load(config.agent.directive_path.as_deref())?;
    let registry = build_registry(cloud, firewall)?;
    let dispatcher = ToolDispatcher::new(
        Arc::new(registry),
        Duration::from_secs(config.agent.tool_timeout_secs),
        config.agent.tool_concurrency,
    );

    Ok(AgentRuntime::new(
        llm,
        dispatcher,
        Arc::new(InMemoryStore::default()),
        directive,
        config.agent.max_cycles,
    ))
}
