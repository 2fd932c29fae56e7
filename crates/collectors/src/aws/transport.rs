use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use netscout_core::config::AwsConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::aws::sigv4::{self, Credentials, SigningInput};
use crate::error::CollectorError;
use crate::xml;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const AUTH_CODES: [&str; 7] = [
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "AccessDenied",
    "OptInRequired",
];

const THROTTLE_CODES: [&str; 4] =
    ["Throttling", "ThrottlingException", "RequestLimitExceeded", "RequestThrottled"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AwsService {
    Ec2,
    ElasticLoadBalancing,
}

impl AwsService {
    pub fn signing_name(self) -> &'static str {
        match self {
            Self::Ec2 => "ec2",
            Self::ElasticLoadBalancing => "elasticloadbalancing",
        }
    }

    pub fn api_version(self) -> &'static str {
        match self {
            Self::Ec2 => "2016-11-15",
            Self::ElasticLoadBalancing => "2015-12-01",
        }
    }

    pub fn default_endpoint(self, region: &str) -> String {
        format!("https://{}.{region}.amazonaws.com/", self.signing_name())
    }
}

/// Carries one query API call and returns the raw XML body of a successful response.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn call(
        &self,
        service: AwsService,
        action: &str,
        params: &[(String, String)],
    ) -> Result<String, CollectorError>;
}

#[async_trait]
impl<T> QueryTransport for Arc<T>
where
    T: QueryTransport + ?Sized,
{
    async fn call(
        &self,
        service: AwsService,
        action: &str,
        params: &[(String, String)],
    ) -> Result<String, CollectorError> {
        (**self).call(service, action, params).await
    }
}

pub struct HttpQueryTransport {
    client: reqwest::Client,
    credentials: Credentials,
    region: String,
    ec2_endpoint: Url,
    elb_endpoint: Url,
}

impl HttpQueryTransport {
    pub fn from_config(config: &AwsConfig) -> Result<Self, CollectorError> {
        let access_key_id = config.access_key_id.clone().ok_or_else(|| {
            CollectorError::Configuration("aws.access_key_id is not configured".to_string())
        })?;
        let secret_access_key = config.secret_access_key.clone().ok_or_else(|| {
            CollectorError::Configuration("aws.secret_access_key is not configured".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CollectorError::Configuration(error.to_string()))?;

        let ec2_endpoint = parse_endpoint(
            config.ec2_endpoint.clone(),
            AwsService::Ec2.default_endpoint(&config.region),
        )?;
        let elb_endpoint = parse_endpoint(
            config.elb_endpoint.clone(),
            AwsService::ElasticLoadBalancing.default_endpoint(&config.region),
        )?;

        Ok(Self {
            client,
            credentials: Credentials {
                access_key_id,
                secret_access_key,
                session_token: config.session_token.clone(),
            },
            region: config.region.clone(),
            ec2_endpoint,
            elb_endpoint,
        })
    }

    fn endpoint(&self, service: AwsService) -> &Url {
        match service {
            AwsService::Ec2 => &self.ec2_endpoint,
            AwsService::ElasticLoadBalancing => &self.elb_endpoint,
        }
    }

    fn signed_headers(
        &self,
        service: AwsService,
        endpoint: &Url,
        body: &str,
    ) -> Result<HeaderMap, CollectorError> {
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(CollectorError::Configuration(format!(
                    "endpoint `{endpoint}` has no host"
                )))
            }
        };

        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let mut headers = BTreeMap::from([
            ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("host".to_string(), host),
            ("x-amz-date".to_string(), amz_date.clone()),
        ]);
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.expose_secret().to_string());
        }

        let input = SigningInput {
            method: "POST",
            path: endpoint.path(),
            query: "",
            headers: &headers,
            payload: body.as_bytes(),
            amz_date: &amz_date,
            region: &self.region,
            service: service.signing_name(),
        };
        let authorization = sigv4::authorization(&self.credentials, &input)?;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            header_map.insert(header_name(name)?, header_value(value)?);
        }
        header_map.insert(reqwest::header::AUTHORIZATION, header_value(&authorization)?);
        Ok(header_map)
    }
}

#[async_trait]
impl QueryTransport for HttpQueryTransport {
    async fn call(
        &self,
        service: AwsService,
        action: &str,
        params: &[(String, String)],
    ) -> Result<String, CollectorError> {
        let endpoint = self.endpoint(service);
        let body = encode_form(service, action, params);
        let headers = self.signed_headers(service, endpoint, &body)?;

        tracing::debug!(
            event_name = "collector.aws.request",
            service = service.signing_name(),
            action,
            "sending query API request"
        );

        let response =
            self.client.post(endpoint.clone()).headers(headers).body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        let error = map_error_response(status.as_u16(), &text);
        tracing::warn!(
            event_name = "collector.aws.request_failed",
            service = service.signing_name(),
            action,
            status = status.as_u16(),
            cause = error.cause_code(),
            "query API request failed"
        );
        Err(error)
    }
}

fn parse_endpoint(configured: Option<String>, default: String) -> Result<Url, CollectorError> {
    let raw = configured.unwrap_or(default);
    Url::parse(&raw)
        .map_err(|error| CollectorError::Configuration(format!("invalid endpoint `{raw}`: {error}")))
}

fn header_name(name: &str) -> Result<HeaderName, CollectorError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|error| CollectorError::Configuration(format!("invalid header `{name}`: {error}")))
}

fn header_value(value: &str) -> Result<HeaderValue, CollectorError> {
    HeaderValue::from_str(value)
        .map_err(|error| CollectorError::Configuration(format!("invalid header value: {error}")))
}

pub fn encode_form(service: AwsService, action: &str, params: &[(String, String)]) -> String {
    let mut pairs = vec![
        format!("Action={}", urlencoding::encode(action)),
        format!("Version={}", urlencoding::encode(service.api_version())),
    ];
    pairs.extend(
        params
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))),
    );
    pairs.join("&")
}

/// Maps an EC2 `<Response><Errors>` or ELBv2 `<ErrorResponse>` body onto the error taxonomy.
pub fn map_error_response(status: u16, body: &str) -> CollectorError {
    let (code, message) = parse_error_body(body).unwrap_or_else(|| {
        let snippet: String = body.trim().chars().take(200).collect();
        (format!("HTTP{status}"), snippet)
    });

    if AUTH_CODES.contains(&code.as_str()) || status == 401 || status == 403 {
        return CollectorError::Auth(format!("{code}: {message}"));
    }
    if THROTTLE_CODES.contains(&code.as_str()) || status == 429 {
        return CollectorError::Throttled(format!("{code}: {message}"));
    }
    CollectorError::Service { code, message }
}

fn parse_error_body(body: &str) -> Option<(String, String)> {
    let document = xml::to_value(body).ok()?;
    let error = xml::path(&document, &["Response", "Errors", "Error"])
        .or_else(|| xml::path(&document, &["ErrorResponse", "Error"]))?;
    let error = match error {
        Value::Array(errors) => errors.first()?,
        single => single,
    };

    let code = error.get("Code").and_then(Value::as_str)?.to_string();
    let message = error.get("Message").and_then(Value::as_str).unwrap_or_default().to_string();
    Some((code, message))
}
