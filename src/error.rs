//! Error types shared across the crate.

use thiserror::Error;

/// Errors returned by the exam service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// The member already submitted this attempt.
    #[error("{0}")]
    AlreadyCompleted(String),
    #[error("not authorized: {0}")]
    Unauthorized(String),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("cannot decode response: {0}")]
    Decode(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ServiceError {
    pub fn is_already_completed(&self) -> bool {
        matches!(self, ServiceError::AlreadyCompleted(_))
    }

    /// Message suitable for showing to the member.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::AlreadyCompleted(msg) | ServiceError::Unauthorized(msg) => msg.clone(),
            ServiceError::Rejected { message, .. } => message.clone(),
            ServiceError::Decode(_) => "Unexpected response from the exam service".to_string(),
            ServiceError::Transport(_) => "Cannot reach the exam service".to_string(),
        }
    }
}

/// Errors returned by the answer store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("question {0} is not part of this attempt")]
    UnknownQuestion(String),
    #[error("the attempt has been submitted")]
    Sealed,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("no exam service URL configured (set base_url or TERMEXAM_BASE_URL)")]
    MissingBaseUrl,
}
