//! Error types for repopush

use serde::Serialize;
use thiserror::Error;

/// Classification of a failed GitHub API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// 401: token invalid, expired or revoked
    Authentication,
    /// 403: token lacks the scope required for the call
    Authorization,
    /// 429, or 403 with an exhausted rate limit
    RateLimited,
    NotFound,
    /// 409, or a rejected fast-forward on a ref update
    Conflict,
    /// 422
    Validation,
    /// 5xx
    Server,
    /// Transport failure or timeout; no response was received
    Network,
    /// The response body could not be decoded
    Decode,
    Unexpected,
}

impl ApiErrorKind {
    /// Map an HTTP status code to an error kind
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiErrorKind::Authentication,
            403 => ApiErrorKind::Authorization,
            404 => ApiErrorKind::NotFound,
            409 => ApiErrorKind::Conflict,
            422 => ApiErrorKind::Validation,
            429 => ApiErrorKind::RateLimited,
            500..=599 => ApiErrorKind::Server,
            _ => ApiErrorKind::Unexpected,
        }
    }
}

/// A GitHub API failure, decoded once at the HTTP boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            status,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message, None)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message, None)
    }

    /// Build an error from a non-success response.
    ///
    /// The message comes from `errors[0].message`, then `message`, then
    /// `fallback` when the body carries neither.
    pub fn from_response(status: u16, body: &str, fallback: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: Option<String>,
            #[serde(default)]
            errors: Vec<ErrorDetail>,
        }

        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum ErrorDetail {
            Object { message: Option<String> },
            Text(String),
        }

        let parsed = serde_json::from_str::<ErrorBody>(body).ok();
        let detail = parsed.as_ref().and_then(|b| {
            b.errors.first().and_then(|e| match e {
                ErrorDetail::Object { message } => message.clone(),
                ErrorDetail::Text(text) => Some(text.clone()),
            })
        });
        let top = parsed.as_ref().and_then(|b| b.message.clone());

        let kind = match ApiErrorKind::from_status(status) {
            ApiErrorKind::Validation
                if top
                    .as_deref()
                    .is_some_and(|m| m.contains("not a fast forward")) =>
            {
                ApiErrorKind::Conflict
            }
            kind => kind,
        };

        let message = detail
            .or(top)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());

        Self::new(kind, message, Some(status))
    }

    /// Network, server and rate-limit failures may succeed when repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ApiErrorKind::Network | ApiErrorKind::Server | ApiErrorKind::RateLimited
        )
    }

    /// Transient failures plus ref-update conflicts, which succeed once the
    /// caller re-reads the branch head
    pub fn is_retryable(&self) -> bool {
        self.is_transient() || self.kind == ApiErrorKind::Conflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum RepoPushError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{operation}: {source}")]
    UploadFailed {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Nothing to commit")]
    NothingToCommit,

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential store error: {0}")]
    Credentials(String),

    #[error("Authentication required")]
    AuthenticationRequired,
}

impl RepoPushError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RepoPushError::Api(e) | RepoPushError::UploadFailed { source: e, .. } => {
                match e.kind {
                    ApiErrorKind::Authentication => "AUTH_FAILED",
                    ApiErrorKind::Authorization => "FORBIDDEN",
                    ApiErrorKind::RateLimited => "RATE_LIMITED",
                    ApiErrorKind::NotFound => "NOT_FOUND",
                    ApiErrorKind::Conflict => "CONFLICT",
                    ApiErrorKind::Validation => "VALIDATION_FAILED",
                    ApiErrorKind::Server => "SERVER_ERROR",
                    ApiErrorKind::Network => "NETWORK_ERROR",
                    ApiErrorKind::Decode => "DECODE_ERROR",
                    ApiErrorKind::Unexpected => "API_ERROR",
                }
            }
            RepoPushError::InvalidInput(_) => "INVALID_INPUT",
            RepoPushError::NothingToCommit => "NOTHING_TO_COMMIT",
            RepoPushError::Archive(_) => "ARCHIVE_ERROR",
            RepoPushError::Io(_) => "IO_ERROR",
            RepoPushError::Serialization(_) => "SERIALIZATION_ERROR",
            RepoPushError::Config(_) => "CONFIG_ERROR",
            RepoPushError::Credentials(_) => "CREDENTIALS_ERROR",
            RepoPushError::AuthenticationRequired => "AUTH_REQUIRED",
        }
    }

    /// The underlying API failure, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            RepoPushError::Api(e) | RepoPushError::UploadFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Serializable error response
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub status: Option<u16>,
}

impl From<&RepoPushError> for ErrorResponse {
    fn from(error: &RepoPushError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
            status: error.api_error().and_then(|e| e.status),
        }
    }
}

impl serde::Serialize for RepoPushError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ErrorResponse::from(self).serialize(serializer)
    }
}

/// Result type alias for repopush operations
pub type Result<T> = std::result::Result<T, RepoPushError>;
