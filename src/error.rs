use thiserror::Error;
use uuid::Uuid;

/// Conversion failures are local and synchronous; they surface before any
/// transcript mutation and are never retried.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unexpected message shape: {0}")]
    Format(String),
    #[error("unsupported content part type: {0}")]
    UnsupportedPart(&'static str),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot reach agent service at '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{url}' timed out: {source}")]
    Timeout {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("agent service at '{url}' returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("malformed response from '{url}': {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// A send was requested while another is in flight. Surfaced
    /// synchronously with no state change; the session never queues.
    #[error("a message send is already in flight")]
    Busy,
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("no message with id {0} in the transcript")]
    UnknownMessage(Uuid),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
}

/// Non-fatal conditions observed while folding. Reported through the
/// session's update channel and `tracing`, never embedded in the transcript.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoldWarning {
    #[error("tool result '{tool_call_id}' has no matching tool call; dropped")]
    OrphanResult { tool_call_id: String },
    #[error("stream reported an error: {message}")]
    StreamError { message: String },
}
