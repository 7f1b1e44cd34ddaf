//! Parser states and their debug names.

use std::borrow::Cow;
use std::fmt;

/// State of the frame parser.
///
/// Text lines walk `Idle → AwaitLf → LineStart → (NameAccum | BareStatus |
/// ParamSepExpectSpace | ParamAccum) → FrameEnd`; payload lines continue from
/// `FrameEnd` into `ReadBinary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Between frames, waiting for a CR.
    #[default]
    Idle,
    /// Saw the opening CR, expecting LF.
    AwaitLf,
    /// First byte of a line.
    LineStart,
    /// Collecting the name.
    NameAccum,
    /// Collecting the status token after `<name> `.
    BareStatus,
    /// Saw `<name>:`, expecting a space.
    ParamSepExpectSpace,
    /// Collecting comma-separated parameters. The one space after each
    /// comma is dropped; other spaces are kept.
    ParamAccum,
    /// Saw the closing CR, expecting LF.
    FrameEnd,
    /// Copying a declared-length payload.
    ReadBinary,
}

impl ParserState {
    /// Get the state name used in trace output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserState::Idle => "IDLE",
            ParserState::AwaitLf => "AWAIT_LF",
            ParserState::LineStart => "LINE_START",
            ParserState::NameAccum => "NAME",
            ParserState::BareStatus => "STATUS",
            ParserState::ParamSepExpectSpace => "PARAM_SEP",
            ParserState::ParamAccum => "PARAMS",
            ParserState::FrameEnd => "FRAME_END",
            ParserState::ReadBinary => "READ_BINARY",
        }
    }

    /// Whether the parser is inside a binary payload.
    pub fn is_binary(&self) -> bool {
        matches!(self, ParserState::ReadBinary)
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render a byte for trace output.
///
/// Control characters the grammar cares about get a name, other printable
/// ASCII is shown as-is, and everything else as hex.
pub fn byte_symbol(byte: u8) -> Cow<'static, str> {
    match byte {
        b' ' => Cow::Borrowed("SPACE"),
        b'\r' => Cow::Borrowed("CR"),
        b'\n' => Cow::Borrowed("LF"),
        0x1A => Cow::Borrowed("CTRL-Z"),
        0x21..=0x7E => Cow::Owned(format!("'{}'", byte as char)),
        _ => Cow::Owned(format!("0x{:02X}", byte)),
    }
}
