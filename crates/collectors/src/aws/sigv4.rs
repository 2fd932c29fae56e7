//! AWS Signature Version 4 for query API requests.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use crate::error::CollectorError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
}

/// One request as seen by the signer. Header names must already be lowercase.
#[derive(Clone, Debug)]
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub headers: &'a BTreeMap<String, String>,
    pub payload: &'a [u8],
    pub amz_date: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

impl SigningInput<'_> {
    fn date_stamp(&self) -> &str {
        self.amz_date.get(..8).unwrap_or(self.amz_date)
    }

    fn scope(&self) -> String {
        format!("{}/{}/{}/aws4_request", self.date_stamp(), self.region, self.service)
    }
}

pub fn signed_headers(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

pub fn canonical_request(input: &SigningInput<'_>) -> String {
    let canonical_headers = input
        .headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect::<String>();
    let path = if input.path.is_empty() { "/" } else { input.path };

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        input.method,
        path,
        input.query,
        canonical_headers,
        signed_headers(input.headers),
        sha256_hex(input.payload)
    )
}

pub fn string_to_sign(input: &SigningInput<'_>) -> String {
    format!(
        "{ALGORITHM}\n{}\n{}\n{}",
        input.amz_date,
        input.scope(),
        sha256_hex(canonical_request(input).as_bytes())
    )
}

pub fn signing_key(
    secret_access_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, CollectorError> {
    let date_key = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date_stamp.as_bytes())?;
    let region_key = hmac_sha256(&date_key, region.as_bytes())?;
    let service_key = hmac_sha256(&region_key, service.as_bytes())?;
    hmac_sha256(&service_key, b"aws4_request")
}

pub fn signature(credentials: &Credentials, input: &SigningInput<'_>) -> Result<String, CollectorError> {
    let key = signing_key(
        credentials.secret_access_key.expose_secret(),
        input.date_stamp(),
        input.region,
        input.service,
    )?;
    let signed = hmac_sha256(&key, string_to_sign(input).as_bytes())?;
    Ok(encode_hex(&signed))
}

/// Value of the `Authorization` header for `input`.
pub fn authorization(credentials: &Credentials, input: &SigningInput<'_>) -> Result<String, CollectorError> {
    Ok(format!(
        "{ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
        credentials.access_key_id,
        input.scope(),
        signed_headers(input.headers),
        signature(credentials, input)?
    ))
}

fn hmac_sha256(key: &[u8], payload: &[u8]) -> Result<Vec<u8>, CollectorError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| CollectorError::Configuration("invalid signing key".to_string()))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    encode_hex(digest.as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
