use thiserror::Error;

use crate::config::RuleCategory;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("rate limit exceeded for client: {0}")]
    RateLimited(String),

    #[error("potentially unsafe prompt detected ({category}: {pattern:?})")]
    UnsafePrompt {
        category: RuleCategory,
        pattern: String,
    },

    #[error("prompt length {length} exceeds limit of {limit} characters")]
    PromptTooLong { length: usize, limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
