use serde_json::Value;
use thiserror::Error;

use crate::types::RequestOutcome;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error while contacting API";

/// A failed request against the catalog API.
///
/// `status` is `None` when the request never produced an HTTP response
/// (connection refused, DNS failure, timeout inside the fetch capability).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<Value>,
}

impl ApiError {
    pub fn network(reason: impl AsRef<str>) -> Self {
        let reason = reason.as_ref();
        let message = if reason.is_empty() {
            NETWORK_ERROR_MESSAGE.to_string()
        } else {
            format!("{NETWORK_ERROR_MESSAGE}: {reason}")
        };
        Self {
            message,
            status: None,
            body: None,
        }
    }

    /// Builds the error for a non-success outcome.
    ///
    /// The message prefers the API's `detail` field, then the raw body text,
    /// then a generic `HTTP {status}`. For a network outcome (status 0)
    /// `raw_body` carries the transport's failure reason instead.
    pub fn from_outcome(outcome: &RequestOutcome, raw_body: &str) -> Self {
        if outcome.status == 0 {
            return Self::network(raw_body);
        }

        let detail = outcome
            .body
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|obj| obj.get("detail"))
            .filter(|detail| !detail.is_null())
            .map(|detail| match detail {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });

        let message = detail.unwrap_or_else(|| {
            let raw = raw_body.trim();
            if raw.is_empty() {
                format!("HTTP {}", outcome.status)
            } else {
                raw.to_string()
            }
        });

        Self {
            message,
            status: Some(outcome.status),
            body: outcome.body.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    pub fn is_network(&self) -> bool {
        self.status.is_none()
    }

    /// Short status label used in upstream error messages: the code, or `network`.
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => code.to_string(),
            None => "network".to_string(),
        }
    }
}

/// Errors raised outside of a single API request: configuration and setup.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid API base URL {0}: {1}")]
    InvalidBaseUrl(String, String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("HTTP client setup failed: {0}")]
    HttpSetup(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
