use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

const DEFAULT_PROFILE: &str = "default";

type Sections = HashMap<String, HashMap<String, String>>;

/// What the selected profile contributes from `~/.aws/credentials` and `~/.aws/config`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedProfile {
    pub name: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl SharedProfile {
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

/// `AWS_PROFILE`, then `AWS_DEFAULT_PROFILE`, then `default`.
pub fn profile_name() -> String {
    read_env("AWS_PROFILE")
        .or_else(|| read_env("AWS_DEFAULT_PROFILE"))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

pub fn credentials_file() -> Option<PathBuf> {
    read_env("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
}

pub fn config_file() -> Option<PathBuf> {
    read_env("AWS_CONFIG_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("config")))
}

/// Resolves the selected profile. Missing files contribute nothing.
///
/// A key pair is taken whole from the credentials file when that section has both halves,
/// otherwise from the config file. The region only comes from the config file.
pub fn load_shared_profile() -> Result<SharedProfile, ConfigError> {
    let name = profile_name();
    let credentials = read_sections(credentials_file().as_deref())?;
    let config = read_sections(config_file().as_deref())?;

    let credentials_section = credentials.get(&name);
    let config_section = config.get(&format!("profile {name}")).or_else(|| {
        (name == DEFAULT_PROFILE).then(|| config.get(DEFAULT_PROFILE)).flatten()
    });

    let key_source = [credentials_section, config_section].into_iter().flatten().find(|section| {
        section.contains_key("aws_access_key_id") && section.contains_key("aws_secret_access_key")
    });

    Ok(SharedProfile {
        access_key_id: key_source.and_then(|section| section.get("aws_access_key_id").cloned()),
        secret_access_key: key_source.and_then(|section| section.get("aws_secret_access_key").cloned()),
        session_token: key_source.and_then(|section| section.get("aws_session_token").cloned()),
        region: config_section.and_then(|section| section.get("region").cloned()),
        name,
    })
}

fn read_sections(path: Option<&Path>) -> Result<Sections, ConfigError> {
    let Some(path) = path else {
        return Ok(Sections::new());
    };
    match fs::read_to_string(path) {
        Ok(raw) => Ok(parse_sections(&raw)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(Sections::new()),
        Err(source) => Err(ConfigError::ReadFile { path: path.to_path_buf(), source }),
    }
}

// Indented lines belong to nested service blocks (`s3 =`) and are skipped.
fn parse_sections(raw: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            let name = header.split_whitespace().collect::<Vec<_>>().join(" ");
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (Some(section), Some((key, value))) = (current.as_ref(), line.split_once('=')) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(entries) = sections.get_mut(section) {
            entries.insert(key.trim().to_ascii_lowercase(), value.to_string());
        }
    }

    sections
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
