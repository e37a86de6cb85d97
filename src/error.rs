//! Error types for the support assistant

use thiserror::Error;

/// Result type alias for tunedesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the support assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the OpenRouter API
    #[error("OpenRouter API error: {0}")]
    OpenRouter(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dataset query error
    #[error("Dataset error: {0}")]
    Dataset(#[from] sqlx::Error),

    /// Dataset missing or unreadable at startup
    #[error("Dataset unavailable: {0}")]
    DatasetUnavailable(String),

    /// Tool-call loop cap exceeded within a sub-agent turn
    #[error("Tool-call loop cap exceeded after {0} iterations")]
    LoopCapExceeded(u32),

    /// Invoice tooling invoked without a verified customer identity
    #[error("No verified customer identity bound to the session")]
    IdentityNotBound,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an OpenRouter error
    pub fn openrouter(msg: impl Into<String>) -> Self {
        Self::OpenRouter(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a dataset-unavailable error
    pub fn dataset_unavailable(msg: impl Into<String>) -> Self {
        Self::DatasetUnavailable(msg.into())
    }

    /// Generic, actionable text safe to show to the end user.
    ///
    /// Never includes internal identifiers, credentials, or raw error
    /// strings from lower layers.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::IdentityNotBound => {
                "I need to verify your account first. Please provide your \
                 customer ID, email, or phone number."
            }
            Self::LoopCapExceeded(_) => {
                "I was unable to complete that request. Please try rephrasing \
                 it or ask for something else."
            }
            Self::DatasetUnavailable(_) => {
                "The store catalog is currently unavailable. Please try again later."
            }
            _ => {
                "I encountered a problem processing your request. Please try \
                 again, or start a new conversation."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_never_leaks_detail() {
        let err = Error::dataset_unavailable("no such table: Customer");
        assert!(!err.user_message().contains("Customer"));

        let err = Error::config("OPENROUTER_API_KEY environment variable not set");
        assert!(!err.user_message().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn loop_cap_is_reported_as_unable_to_complete() {
        let err = Error::LoopCapExceeded(8);
        assert!(err.user_message().contains("unable to complete"));
    }
}
