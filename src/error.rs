use thiserror::Error;

/// Failures of a digest cycle.
///
/// Adapter errors never leave the aggregator; they exist so it can log and
/// count them by kind. Agent and delivery errors are surfaced to callers.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("adapter '{adapter}' failed: {reason}")]
    AdapterFetch { adapter: String, reason: String },

    #[error("adapter '{adapter}' timed out after {secs}s")]
    AdapterTimeout { adapter: String, secs: u64 },

    #[error("language model call failed: {0}")]
    Agent(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DigestError {
    pub fn agent(e: impl std::fmt::Display) -> Self {
        DigestError::Agent(e.to_string())
    }

    pub fn delivery(e: impl std::fmt::Display) -> Self {
        DigestError::Delivery(e.to_string())
    }
}

impl From<reqwest::Error> for DigestError {
    fn from(error: reqwest::Error) -> Self {
        DigestError::Agent(error.to_string())
    }
}

pub type DigestResult<T> = Result<T, DigestError>;
