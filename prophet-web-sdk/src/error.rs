//! Errors raised at the backend boundary

/// Failures talking to the forecasting backend.
///
/// Only the transport boundary produces these. The stream reducer never
/// fails: malformed frames and unresolvable references are soft no-ops.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("event stream closed: {0}")]
    StreamClosed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// True for failures where no response was received at all.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
