use std::time::Duration;

use thiserror::Error;

/// Result type for rate limiting operations
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Errors that can occur during rate limiting operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// Tokens are not available within the caller's wait budget
    #[error("Rate limit exceeded: tokens available in {required:?}, budget was {max_wait:?}")]
    WaitExceeded { required: Duration, max_wait: Duration },

    /// Invalid configuration
    #[error("Invalid token bucket configuration: {0}")]
    InvalidConfig(&'static str),
}
