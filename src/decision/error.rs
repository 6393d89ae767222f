use thiserror::Error;

/// Why a remote decision could not be used. Converted into a fallback policy by the
/// engine and never surfaced to callers of `decide`.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision service unreachable")]
    Unavailable,
    #[error("decision service returned HTTP {0}")]
    Status(u16),
    #[error("decision request timed out")]
    Timeout,
    #[error("decision request failed: {0}")]
    Transport(String),
    #[error("malformed decision payload: {0}")]
    Malformed(String),
}

impl DecisionError {
    /// Short reason recorded on the substituted policy.
    pub fn fallback_reason(&self) -> &'static str {
        match self {
            DecisionError::Unavailable => "LLM unavailable",
            DecisionError::Status(_) => "LLM error",
            DecisionError::Timeout => "LLM timeout",
            DecisionError::Transport(_) => "LLM exception",
            DecisionError::Malformed(_) => "LLM parse error",
        }
    }
}

impl From<reqwest::Error> for DecisionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DecisionError::Timeout
        } else if err.is_decode() {
            DecisionError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            DecisionError::Status(status.as_u16())
        } else {
            DecisionError::Transport(err.to_string())
        }
    }
}
