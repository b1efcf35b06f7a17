use thiserror::Error;

/// Everything that can go wrong during one turn. All variants are caught at
/// the session boundary and converted into a visible conversation entry;
/// none are retried.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Missing credential. Checked before any network I/O, non-retryable.
    #[error("configuration error: {0}")]
    Config(String),
    /// Attachment could not be read or decoded.
    #[error("read error: {0}")]
    Read(String),
    /// Non-success HTTP status or malformed success payload.
    #[error("API error: {0}")]
    Api(String),
    /// Transport-level failure before any status was received.
    #[error("network error: {0}")]
    Network(String),
}

impl SessionError {
    /// Human-readable line appended to the conversation as a synthetic
    /// assistant message. Never the raw error chain.
    pub fn diagnostic(&self) -> String {
        match self {
            SessionError::Config(detail) => format!(
                "Sorry, the API key is not configured. {detail} Set DEEPSEEK_API_KEY and restart."
            ),
            SessionError::Read(detail) => {
                format!("Sorry, the attached file could not be read: {detail}")
            }
            SessionError::Api(detail) => format!("Sorry, the request failed: {detail}"),
            SessionError::Network(detail) => {
                format!("Sorry, the service could not be reached: {detail}")
            }
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
