use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netscout_core::config::FirewallConfig;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::CollectorError;
use crate::xml;

/// The two PAN-OS XML API calls the collector needs. Implementations return the raw body of
/// any HTTP-successful response; `<response status="error">` is interpreted by the caller.
#[async_trait]
pub trait XmlApi: Send + Sync {
    async fn op(&self, command: &str) -> Result<String, CollectorError>;
    async fn config_get(&self, xpath: &str) -> Result<String, CollectorError>;
}

#[async_trait]
impl<T> XmlApi for Arc<T>
where
    T: XmlApi + ?Sized,
{
    async fn op(&self, command: &str) -> Result<String, CollectorError> {
        (**self).op(command).await
    }

    async fn config_get(&self, xpath: &str) -> Result<String, CollectorError> {
        (**self).config_get(xpath).await
    }
}

pub struct PanosHttpClient {
    client: reqwest::Client,
    endpoint: Url,
    username: String,
    password: SecretString,
    api_key: OnceCell<SecretString>,
}

impl PanosHttpClient {
    pub fn from_config(config: &FirewallConfig) -> Result<Self, CollectorError> {
        let host = config
            .host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| CollectorError::Configuration("firewall.host is not configured".into()))?;
        let username = config
            .username
            .clone()
            .ok_or_else(|| CollectorError::Configuration("firewall.username is not configured".into()))?;
        let password = config
            .password
            .clone()
            .ok_or_else(|| CollectorError::Configuration("firewall.password is not configured".into()))?;

        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{host}")
        };
        let endpoint = Url::parse(&format!("{base}/api/")).map_err(|error| {
            CollectorError::Configuration(format!("invalid firewall host `{host}`: {error}"))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|error| CollectorError::Configuration(error.to_string()))?;

        Ok(Self { client, endpoint, username, password, api_key: OnceCell::new() })
    }

    /// Returns the cached API key, generating it on first use.
    pub async fn api_key(&self) -> Result<&SecretString, CollectorError> {
        self.api_key.get_or_try_init(|| self.keygen()).await
    }

    async fn keygen(&self) -> Result<SecretString, CollectorError> {
        tracing::info!(
            event_name = "collector.firewall.keygen",
            endpoint = %self.endpoint,
            "requesting firewall API key"
        );

        let body = self
            .post(&[
                ("type", "keygen"),
                ("user", self.username.as_str()),
                ("password", self.password.expose_secret()),
            ])
            .await?;

        let document = xml::to_value(&body)?;
        if response_status(&document) == Some("error") {
            return Err(CollectorError::Auth(error_message(&document)));
        }

        xml::path(&document, &["response", "result", "key"])
            .and_then(Value::as_str)
            .map(|key| SecretString::from(key.to_string()))
            .ok_or_else(|| CollectorError::Parse("keygen response has no result/key".to_string()))
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<String, CollectorError> {
        let response = self.client.post(self.endpoint.clone()).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let snippet: String = body.trim().chars().take(200).collect();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CollectorError::Auth(format!("HTTP {status}: {snippet}")));
        }
        Err(CollectorError::Appliance(format!("HTTP {status}: {snippet}")))
    }
}

#[async_trait]
impl XmlApi for PanosHttpClient {
    async fn op(&self, command: &str) -> Result<String, CollectorError> {
        let key = self.api_key().await?;
        self.post(&[("type", "op"), ("cmd", command), ("key", key.expose_secret())]).await
    }

    async fn config_get(&self, xpath: &str) -> Result<String, CollectorError> {
        let key = self.api_key().await?;
        self.post(&[
            ("type", "config"),
            ("action", "get"),
            ("xpath", xpath),
            ("key", key.expose_secret()),
        ])
        .await
    }
}

pub(crate) fn response_status(document: &Value) -> Option<&str> {
    xml::path(document, &["response", "@status"]).and_then(Value::as_str)
}

pub(crate) fn error_message(document: &Value) -> String {
    let message = xml::path(document, &["response", "msg"])
        .or_else(|| xml::path(document, &["response", "result", "msg"]))
        .map(xml::text_content)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| "firewall returned status=error without a message".to_string());

    match xml::path(document, &["response", "@code"]).and_then(Value::as_str) {
        Some(code) => format!("{message} (code {code})"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use netscout_core::config::FirewallConfig;

    use super::{error_message, response_status, PanosHttpClient};
    use crate::error::CollectorError;
    use crate::xml;

    fn firewall_config(host: Option<&str>) -> FirewallConfig {
        FirewallConfig {
            host: host.map(str::to_string),
            username: Some("admin".to_string()),
            password: Some("secret".to_string().into()),
            vsys: "vsys1".to_string(),
            verify_tls: false,
            timeout_secs: 5,
        }
    }

    #[test]
    fn missing_host_is_a_configuration_error() {
        let error = PanosHttpClient::from_config(&firewall_config(None)).err();
        assert!(matches!(error, Some(CollectorError::Configuration(ref message)) if message.contains("firewall.host")));
    }

    #[test]
    fn bare_host_gets_https_api_endpoint() {
        let client = PanosHttpClient::from_config(&firewall_config(Some("10.0.0.1")))
            .expect("client from config");
        assert_eq!(client.endpoint.as_str(), "https://10.0.0.1/api/");
    }

    #[test]
    fn error_message_reads_nested_lines() {
        let document = xml::to_value(
            r#"<response status="error" code="403"><result><msg><line>Invalid credentials.</line></msg></result></response>"#,
        )
        .expect("document");

        assert_eq!(response_status(&document), Some("error"));
        assert_eq!(error_message(&document), "Invalid credentials. (code 403)");
    }
}
