use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure explicitly reported by the remote side.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("API error {} ({}): {message}", .status.as_u16(), .code.as_deref().unwrap_or("-"))]
pub struct ApiError {
    pub status: StatusCode,
    /// Application error code, e.g. `NOT_A_FILE`.
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} timed out after {timeout:?}")]
    Timeout {
        endpoint: &'static str,
        timeout: Duration,
    },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Remote status code; `None` for every failure where no response was obtained.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api(e) => Some(e.status),
            _ => None,
        }
    }

    pub fn app_code(&self) -> Option<&str> {
        match self {
            ClientError::Api(e) => e.code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
