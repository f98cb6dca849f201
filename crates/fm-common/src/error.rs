use thiserror::Error;

/// Errors raised by the matching core.
///
/// All variants are local and synchronous; none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Input had the wrong shape (e.g. skills that are not a list of strings).
    #[error("validation error: {0}")]
    Validation(String),
    /// Ranker weights or tuning values are unusable. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Caller passed an argument outside its domain (e.g. `n == 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl MatchError {
    pub fn validation(message: impl Into<String>) -> Self {
        MatchError::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        MatchError::Configuration(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        MatchError::InvalidArgument(message.into())
    }
}
