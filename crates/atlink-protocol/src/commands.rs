//! Commands that can be sent to the modem.
//!
//! AT commands come in four shapes:
//! - Execute: `AT<cmd>` (also plain `AT`)
//! - Read: `AT<cmd>?`
//! - Test: `AT<cmd>=?`
//! - Write: `AT<cmd>=<arg>,<arg>,...`
//!
//! Every encoded command ends with a carriage return. Nothing below the
//! producer adds one, so commands should always be encoded through here.

use crate::constants::CR;

/// Command prefix.
pub const AT_PREFIX: &str = "AT";

/// A command addressed to the modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `AT<name>`
    Execute {
        /// Command name including its `+`/`&` prefix, may be empty.
        name: String,
    },
    /// `AT<name>?`
    Read {
        /// Command name.
        name: String,
    },
    /// `AT<name>=?`
    Test {
        /// Command name.
        name: String,
    },
    /// `AT<name>=<args>`
    Write {
        /// Command name.
        name: String,
        /// Arguments, joined with commas. Quoting is the caller's job.
        args: Vec<String>,
    },
}

impl Command {
    /// The bare `AT` attention command.
    pub fn attention() -> Self {
        Command::Execute { name: String::new() }
    }

    /// `AT<name>`
    pub fn execute(name: impl Into<String>) -> Self {
        Command::Execute { name: name.into() }
    }

    /// `AT<name>?`
    pub fn query(name: impl Into<String>) -> Self {
        Command::Read { name: name.into() }
    }

    /// `AT<name>=?`
    pub fn test(name: impl Into<String>) -> Self {
        Command::Test { name: name.into() }
    }

    /// `AT<name>=<args>`
    pub fn write<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Command::Write {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Quote a string argument for a write command.
    pub fn quoted(arg: &str) -> String {
        format!("\"{}\"", arg)
    }

    /// Get the command text without the terminator.
    pub fn to_line(&self) -> String {
        match self {
            Command::Execute { name } => format!("{}{}", AT_PREFIX, name),
            Command::Read { name } => format!("{}{}?", AT_PREFIX, name),
            Command::Test { name } => format!("{}{}=?", AT_PREFIX, name),
            Command::Write { name, args } => format!("{}{}={}", AT_PREFIX, name, args.join(",")),
        }
    }

    /// Encode the command for transmission, CR terminator included.
    pub fn encode(&self) -> Vec<u8> {
        encode_line(&self.to_line())
    }
}

/// Encode a raw command line for transmission.
///
/// Appends the carriage return terminator.
pub fn encode_line(line: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(CR);
    buf
}
