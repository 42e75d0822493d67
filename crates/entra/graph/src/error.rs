//! Graph adapter errors and their mapping onto the directory taxonomy

use entra_types::DirectoryError;
use serde::Deserialize;
use thiserror::Error;

/// OData error envelope returned by Microsoft Graph
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
    #[serde(rename = "innerError")]
    pub inner_error: Option<serde_json::Value>,
}

/// Errors raised while talking to Graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Graph API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Builds an API error from a non-success response body.
    pub fn from_response(status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        match serde_json::from_str::<ODataError>(body) {
            Ok(odata) => GraphError::Api {
                status,
                code: odata.error.code,
                message: odata.error.message,
                retry_after_secs,
            },
            Err(_) => GraphError::Api {
                status,
                code: status.to_string(),
                message: body.to_string(),
                retry_after_secs,
            },
        }
    }
}

/// Graph answers an add of an existing owner or member with a 400 whose
/// message reads "One or more added object references already exist ..."
fn is_duplicate_reference(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already exist")
}

impl From<GraphError> for DirectoryError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Http(e) => DirectoryError::Transient(e.to_string()),
            GraphError::Api {
                status,
                code,
                message,
                retry_after_secs,
            } => match status {
                400 if is_duplicate_reference(&message) => DirectoryError::AlreadyExists(message),
                400 => DirectoryError::BadRequest(message),
                401 | 403 => DirectoryError::Unauthorized(message),
                404 => DirectoryError::NotFound(message),
                409 => DirectoryError::AlreadyExists(message),
                429 => DirectoryError::Throttled { retry_after_secs },
                500..=599 => DirectoryError::Transient(format!("{} {}: {}", status, code, message)),
                _ => DirectoryError::Remote {
                    status,
                    code,
                    message,
                },
            },
            GraphError::Auth(message) => DirectoryError::Unauthorized(message),
            GraphError::Decode(message) => DirectoryError::Remote {
                status: 200,
                code: "InvalidResponse".to_string(),
                message,
            },
            GraphError::Config(message) => DirectoryError::Configuration(message),
        }
    }
}
