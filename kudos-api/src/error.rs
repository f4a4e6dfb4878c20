use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for error response bodies kept on an error
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("({status}) {message}")]
    Http {
        status: StatusCode,
        message: String,
        body: String,
    },

    #[error("({status}) {message}")]
    Validation {
        status: StatusCode,
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Session expired: {reason}")]
    AuthExpired { reason: ExpiryReason },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Classify a non-success response that is not handled by the refresh protocol.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body).ok();
        let message = detail
            .as_ref()
            .and_then(ErrorBody::message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string()
            });
        let fields = detail.map(|detail| detail.errors).unwrap_or_default();

        let is_validation = status.is_client_error()
            && status != StatusCode::UNAUTHORIZED
            && (!fields.is_empty()
                || matches!(
                    status,
                    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
                ));

        if is_validation {
            ApiError::Validation {
                status,
                message,
                fields,
            }
        } else {
            ApiError::Http {
                status,
                message,
                body: truncate_body(body),
            }
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } | ApiError::Validation { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Terminal authentication failure: the user has to log in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. })
    }
}

/// Why a session could not be kept alive.
///
/// Cloned to every caller waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpiryReason {
    #[error("refresh rejected with status {0}")]
    RefreshRejected(StatusCode),

    #[error("refresh unavailable: {0}")]
    RefreshUnavailable(String),

    #[error("refresh was abandoned before it completed")]
    RefreshAbandoned,

    #[error("refresh response carried no access token")]
    MissingToken,

    #[error("still unauthorized after retrying with a fresh token")]
    RetryExhausted,
}

/// No response reached the client.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<reqwest::Error>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.source.as_ref().is_some_and(reqwest::Error::is_timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Error body as sent by the backend. Older handlers use `error`, newer ones `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|message| !message.is_empty())
            .map(str::to_owned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, alias = "param", alias = "path")]
    pub field: Option<String>,
    #[serde(alias = "msg")]
    pub message: String,
}

/// Truncate a response body to avoid carrying excessive data around
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }

    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... (truncated, {} total bytes)",
        &body[..end],
        body.len()
    )
}
