//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding the response stream.
///
/// Fatal errors mean the byte stream does not follow the response grammar at
/// all and continuing would risk misreading everything after it. Recoverable
/// errors cost a single frame; the parser has already resynchronized when one
/// is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A response line began with a space.
    #[error("response line starts with a space")]
    SpaceAtLineStart,

    /// A `<name> <token>` line carried a token outside the status vocabulary.
    #[error("unknown status token {0:?}")]
    UnknownStatus(String),

    /// The colon after a command name was not followed by a space.
    #[error("expected space after ':' in {name}, got {found}")]
    MissingSpaceAfterColon {
        /// Command name that preceded the colon.
        name: String,
        /// Symbolic rendering of the offending byte.
        found: String,
    },

    /// A payload header's byte count was not a non-negative integer.
    #[error("invalid payload byte count {0:?}")]
    InvalidByteCount(String),

    /// A payload header had no byte count parameter.
    #[error("payload header has no byte count")]
    MissingByteCount,

    /// A payload header declared more bytes than the parser accepts.
    #[error("payload too large: maximum {max} bytes, declared {declared}")]
    PayloadTooLarge {
        /// Declared length.
        declared: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A carriage return that ended a line was not followed by a line feed.
    ///
    /// The in-progress record is dropped.
    #[error("no LF after line-ending CR, got {found}; frame dropped")]
    MissingLineFeed {
        /// Symbolic rendering of the byte found instead.
        found: String,
    },
}

impl ProtocolError {
    /// Whether this error breaks the stream contract.
    ///
    /// Everything except [`ProtocolError::MissingLineFeed`] is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::MissingLineFeed { .. })
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
