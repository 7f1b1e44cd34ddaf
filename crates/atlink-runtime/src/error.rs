//! Error types for the link runtime.

use atlink_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur while running a modem link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The response stream broke the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error on the transport or a config file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A pipeline thread panicked.
    #[error("{0} thread panicked")]
    TaskPanicked(&'static str),

    /// The writer thread has stopped; no more commands can be sent.
    #[error("command queue closed")]
    WriterClosed,

    /// The parser has stopped; no more responses will arrive.
    #[error("response queue closed")]
    Closed,

    /// No response arrived in time.
    #[error("timeout waiting for response")]
    Timeout,
}

/// Result type alias for link operations.
pub type LinkResult<T> = Result<T, LinkError>;
