use thiserror::Error;
use unicloud_core::GraphError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Expected zip file but received {0}")]
    UnexpectedContentType(String),

    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{0}")]
    Mock(String),

    #[error("intake needs at least a frontend or a backend")]
    IncompleteIntake,
}
