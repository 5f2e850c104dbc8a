//! Error types for the triage pipeline

use std::time::Duration;
use thiserror::Error;

/// Errors reported by external providers (metrics source, compute backend)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Backend unreachable or not configured
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Caller lacks permission on the target resource
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Request failed in a way that may succeed on retry
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Request(_) | ProviderError::Timeout(_))
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, ProviderError::Authorization(_))
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Unavailable(_) => "unavailable",
            ProviderError::Authorization(_) => "authorization",
            ProviderError::Request(_) => "request",
            ProviderError::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                ProviderError::Authorization(err.to_string())
            }
            _ => ProviderError::Request(err.to_string()),
        }
    }
}

/// Fatal pipeline errors; everything else degrades inside the run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("internal fault: {0}")]
    InternalFault(String),
}

/// Invalid configuration detected while assembling the pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported resource type '{0}'")]
    UnsupportedResourceType(String),

    #[error("invalid threshold {name}: {reason}")]
    InvalidThreshold { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Request("502".into()).is_transient());
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!ProviderError::Authorization("denied".into()).is_transient());
        assert!(!ProviderError::Unavailable("no client".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = PipelineError::InternalFault("thread sealed".into());
        assert_eq!(err.to_string(), "internal fault: thread sealed");
    }
}
