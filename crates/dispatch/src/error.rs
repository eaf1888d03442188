//! Error types for the dispatch module

use std::fmt;

/// Errors that can occur while talking to the media server or the chat API
#[derive(Debug)]
pub enum DispatchError {
    /// The HTTP request could not be completed
    RequestError { kind: &'static str, message: String },

    /// The server answered with a status other than the expected one
    UnexpectedStatus { status: u16, body: String },

    /// No watch root is configured for this library id
    UnknownLibrary(String),

    /// Configuration error
    ConfigError(String),
}

impl DispatchError {
    /// Classify a reqwest failure
    pub(crate) fn from_reqwest(e: &reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection"
        } else if e.is_request() {
            "request build"
        } else if e.is_body() {
            "body"
        } else {
            "unknown"
        };
        Self::RequestError {
            kind,
            message: e.to_string(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestError { kind, message } => write!(f, "Request failed ({kind}): {message}"),
            Self::UnexpectedStatus { status, body } => {
                write!(f, "Unexpected status {status}: {body}")
            }
            Self::UnknownLibrary(id) => write!(
                f,
                "No watch root configured for library {id}; check the [[roots]] mapping"
            ),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<DispatchError> for mediawatch_core::error::Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::ConfigError(msg) => mediawatch_core::error::Error::config(msg),
            other => mediawatch_core::error::Error::dispatch(other.to_string()),
        }
    }
}
