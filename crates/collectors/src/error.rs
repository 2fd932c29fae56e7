use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request throttled: {0}")]
    Throttled(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("service error {code}: {message}")]
    Service { code: String, message: String },
    #[error("appliance returned an error: {0}")]
    Appliance(String),
    #[error("could not parse response: {0}")]
    Parse(String),
    #[error("collector configuration error: {0}")]
    Configuration(String),
}

impl CollectorError {
    /// Short cause identifier carried into tool error payloads.
    pub fn cause_code(&self) -> &str {
        match self {
            Self::Auth(_) => "auth",
            Self::Throttled(_) => "throttled",
            Self::Network(_) => "network",
            Self::Service { code, .. } => code,
            Self::Appliance(_) => "appliance",
            Self::Parse(_) => "parse",
            Self::Configuration(_) => "configuration",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Network(_))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Network(format!("request timed out: {error}"));
        }
        Self::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::CollectorError;

    #[test]
    fn service_errors_use_their_own_code() {
        let error = CollectorError::Service {
            code: "TargetGroupNotFound".to_string(),
            message: "One or more target groups not found".to_string(),
        };
        assert_eq!(error.cause_code(), "TargetGroupNotFound");
        assert!(!error.is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert_eq!(CollectorError::Throttled("slow down".into()).cause_code(), "throttled");
        assert!(CollectorError::Network("reset".into()).is_retryable());
        assert!(!CollectorError::Auth("denied".into()).is_retryable());
    }
}
