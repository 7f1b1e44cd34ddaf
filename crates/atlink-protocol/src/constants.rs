//! Protocol constants
//!
//! Control bytes, status tokens and command identifiers used by the AT
//! response grammar.

// ============================================================================
// Control Bytes
// ============================================================================

/// Carriage return - opens and closes every response line.
pub const CR: u8 = b'\r';
/// Line feed - follows every carriage return that delimits a line.
pub const LF: u8 = b'\n';
/// Separates a name from its status token.
pub const SPACE: u8 = b' ';
/// Introduces a parameter list after a command name.
pub const COLON: u8 = b':';
/// Separates parameters.
pub const COMMA: u8 = b',';
/// First byte of a data-entry prompt line.
pub const PROMPT: u8 = b'>';
/// Ctrl-Z, the end-of-data marker for payload uploads.
///
/// Not escaped inside binary payloads; the declared payload length is the
/// only framing signal.
pub const CTRL_Z: u8 = 0x1A;

// ============================================================================
// Status Tokens
// ============================================================================

/// Command completed successfully.
pub const STATUS_OK: &str = "OK";
/// Command failed.
pub const STATUS_ERROR: &str = "ERROR";
/// Connection established at 115200 bps (`CONNECT 115200`).
pub const STATUS_115200: &str = "115200";
/// Carrier state; only meaningful as part of `NO CARRIER`.
pub const STATUS_CARRIER: &str = "CARRIER";

/// Every token accepted after `<name> `.
pub const STATUS_VOCABULARY: [&str; 4] = [STATUS_OK, STATUS_ERROR, STATUS_115200, STATUS_CARRIER];

/// Name that combines with [`STATUS_CARRIER`] into [`NO_CARRIER`].
pub const NAME_NO: &str = "NO";
/// Synthesized name for the `NO CARRIER` line.
pub const NO_CARRIER: &str = "NO CARRIER";

/// Request marker sent by the modem before a payload upload.
///
/// Declared for completeness; the parser does not consult it.
pub const MARKER_REQUEST: &str = "REQUEST";
/// Prefix of extended error reports (`+CME ERROR`).
///
/// Declared for completeness; the parser does not consult it.
pub const MARKER_CME: &str = "CME";

// ============================================================================
// Binary Payload Trigger
// ============================================================================

/// Command whose response may carry a raw payload.
pub const BINARY_TRIGGER_COMMAND: &str = "+CHTTPACT";
/// First parameter that marks a [`BINARY_TRIGGER_COMMAND`] line as a payload header.
pub const BINARY_TRIGGER_KEYWORD: &str = "DATA";

/// Returns true if `token` is a member of [`STATUS_VOCABULARY`].
pub fn is_status_token(token: &str) -> bool {
    STATUS_VOCABULARY.contains(&token)
}
