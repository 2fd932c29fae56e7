pub mod client;

use async_trait::async_trait;
use netscout_core::Record;
use serde_json::{Map, Value};

pub use client::{PanosHttpClient, XmlApi};

use crate::error::CollectorError;
use crate::xml;
use crate::FirewallInventory;

const DEVICE_XPATH: &str = "/config/devices/entry[@name='localhost.localdomain']";
const SHOW_INTERFACES: &str = "<show><interface>all</interface></show>";
const ZONE_MODES: [&str; 6] = ["layer3", "layer2", "virtual-wire", "tap", "tunnel", "external"];

/// PAN-OS inventory for one virtual system.
pub struct PanosFirewall<T> {
    api: T,
    vsys: String,
}

impl<T> PanosFirewall<T>
where
    T: XmlApi,
{
    pub fn new(api: T, vsys: impl Into<String>) -> Self {
        Self { api, vsys: vsys.into() }
    }

    fn vsys_xpath(&self, suffix: &str) -> String {
        format!("{DEVICE_XPATH}/vsys/entry[@name='{}']/{suffix}", self.vsys)
    }

    async fn config_entries(&self, suffix: &str, container: &str) -> Result<Vec<Record>, CollectorError> {
        let body = self.api.config_get(&self.vsys_xpath(suffix)).await?;
        let document = xml::normalize_sets(xml::to_value(&body)?);
        check_status(&document)?;

        let result = xml::path(&document, &["response", "result"])
            .ok_or_else(|| CollectorError::Parse("config response has no response/result".to_string()))?;
        let entries = xml::path(result, &[container, "entry"]).cloned().unwrap_or(Value::Null);
        Ok(xml::into_records(entries).into_iter().map(entry_record).collect())
    }

    /// Operational output is fail-soft: markup that cannot be read yields an empty list.
    async fn op_entries(
        &self,
        command: &str,
        entries: &[&str],
        kind: &'static str,
    ) -> Result<Vec<Record>, CollectorError> {
        let body = self.api.op(command).await?;

        let document = match xml::to_value(&body) {
            Ok(document) => document,
            Err(error) => {
                tracing::error!(
                    event_name = "collector.firewall.parse_failed",
                    kind,
                    error = %error,
                    "could not parse firewall response"
                );
                return Ok(Vec::new());
            }
        };
        check_status(&document)?;

        let Some(result) = xml::path(&document, &["response", "result"]) else {
            tracing::error!(
                event_name = "collector.firewall.parse_failed",
                kind,
                error = "response has no response/result",
                "could not parse firewall response"
            );
            return Ok(Vec::new());
        };

        let entries = xml::path(result, entries).cloned().unwrap_or(Value::Null);
        Ok(xml::into_records(entries))
    }
}

fn check_status(document: &Value) -> Result<(), CollectorError> {
    if client::response_status(document) == Some("error") {
        return Err(CollectorError::Appliance(client::error_message(document)));
    }
    Ok(())
}

fn routes_command(virtual_router: Option<&str>) -> String {
    match virtual_router.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!(
            "<show><routing><route><virtual-router>{}</virtual-router></route></routing></show>",
            quick_xml::escape::escape(name)
        ),
        None => "<show><routing><route/></routing></show>".to_string(),
    }
}

/// Attribute keys (`@name`, `@uuid`) become plain fields.
fn entry_record(entry: Record) -> Record {
    entry
        .into_iter()
        .map(|(key, value)| match key.strip_prefix('@') {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}

fn with_zone_membership(mut zone: Record) -> Record {
    let network = zone.get("network").and_then(Value::as_object).cloned().unwrap_or_else(Map::new);
    let mode = ZONE_MODES.iter().find(|mode| network.contains_key(**mode));

    if let Some(mode) = mode {
        let interfaces = match network.get(*mode) {
            Some(Value::Array(members)) => members.clone(),
            Some(Value::String(member)) => vec![Value::String(member.clone())],
            _ => Vec::new(),
        };
        zone.insert("mode".to_string(), Value::String((*mode).to_string()));
        zone.insert("interfaces".to_string(), Value::Array(interfaces));
    }
    zone
}

#[async_trait]
impl<T> FirewallInventory for PanosFirewall<T>
where
    T: XmlApi,
{
    async fn list_policies(&self) -> Result<Vec<Record>, CollectorError> {
        self.config_entries("rulebase/security/rules", "rules").await
    }

    async fn list_zones(&self) -> Result<Vec<Record>, CollectorError> {
        let zones = self.config_entries("zone", "zone").await?;
        Ok(zones.into_iter().map(with_zone_membership).collect())
    }

    async fn list_interfaces(&self) -> Result<Vec<Record>, CollectorError> {
        self.op_entries(SHOW_INTERFACES, &["ifnet", "entry"], "interfaces").await
    }

    async fn list_routes(&self, virtual_router: Option<&str>) -> Result<Vec<Record>, CollectorError> {
        self.op_entries(&routes_command(virtual_router), &["entry"], "routes").await
    }
}
