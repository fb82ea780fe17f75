use thiserror::Error;

/// Failures of one annotation-service call, from request validation
/// through response decoding and URI resolution.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Parameter [{0}] is required")]
    MissingParameter(String),

    #[error("Invalid value [{value}] for param {name}: must be in {accepted:?}")]
    InvalidParameterValue {
        name: String,
        value: String,
        accepted: Vec<String>,
    },

    #[error("Parameter {name} expects a {expected} value")]
    ParameterType { name: String, expected: &'static str },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("An error occurred while invoking API. Message: [{msg}], code: [{code}]")]
    Service { msg: String, code: i64 },

    #[error("An error occurred while parsing the {operation} response: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid value returned from API. Expected URL found [{0}]")]
    InvalidUri(String),

    #[error("Identifier [{uri}] is not under the expected namespace {namespace}")]
    UnexpectedNamespace { uri: String, namespace: &'static str },

    #[error("No text contained in content item {0}")]
    EmptyContent(String),

    #[error("Content item {uri} has unsupported mime type {mime_type}")]
    UnsupportedContent { uri: String, mime_type: String },
}

impl MlError {
    /// True for errors reported by the remote service itself.
    pub fn is_service_error(&self) -> bool {
        matches!(self, MlError::Service { .. })
    }
}

pub type MlResult<T> = std::result::Result<T, MlError>;
