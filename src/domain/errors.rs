use serde_json::Value;
use thiserror::Error;

/// Failure detail recorded in a [`RequestState`](super::RequestState) when a
/// remote call settles unsuccessfully.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    /// No response was received (connection refused, timeout, DNS...).
    #[error("network error: {message}")]
    Transport { message: String },

    /// The server answered with a non-2xx status.
    #[error("request rejected with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        status: u16,
        message: Option<String>,
        body: Option<Value>,
    },

    /// A 2xx response whose body did not match the expected envelope.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Fallback text shown when nothing more specific is known about a failure.
pub const GENERIC_FAILURE_TEXT: &str = "Something went wrong. Please, try again";

impl RequestError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Builds a rejection from the raw error body, extracting its `message`
    /// field when the body is JSON and has one.
    pub fn rejected(status: u16, raw_body: &str) -> Self {
        let body = serde_json::from_str::<Value>(raw_body).ok();
        let message = body
            .as_ref()
            .and_then(|value| value.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Self::Rejected { status, message, body }
    }

    /// Status code of a rejection, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The structured error body returned by the server, if any.
    pub fn cause(&self) -> Option<&Value> {
        match self {
            Self::Rejected { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Non-blank `message` from the server's error body.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message: Some(message), .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Text suitable for a notification: the server message verbatim when
    /// one was provided, otherwise a generic "try again" phrasing.
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_FAILURE_TEXT)
    }

    pub fn user_message_or(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status_code() == Some(401)
    }
}

/// Problems caught on the client before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("blank identifier for {path}")]
    BlankIdentifier { path: String },

    #[error("unknown {kind} status: {value:?}")]
    UnknownStatus { kind: &'static str, value: String },

    /// A required form field left blank; `field` is its display name.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
}
