//! Decoded response records.

use std::fmt;

use serde::Serialize;

use crate::constants::{NO_CARRIER, STATUS_ERROR, STATUS_OK};

/// A single response decoded from the modem.
///
/// Records are only handed out once complete: for payload lines that means
/// `data` holds exactly the number of bytes the header declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseRecord {
    /// Command mnemonic or bare token that produced the line (`+CSQ`, `OK`, `NO CARRIER`).
    pub name: String,
    /// Parameters from a `name: a, b` line, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
    /// Status token from a `name status` line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Raw payload for `+CHTTPACT: DATA, n` lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl ResponseRecord {
    /// Create a record with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        ResponseRecord {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// `OK` on its own, or any line whose status is `OK`.
    pub fn is_ok(&self) -> bool {
        self.name == STATUS_OK || self.status.as_deref() == Some(STATUS_OK)
    }

    /// `ERROR` on its own, or any line whose status is `ERROR`.
    pub fn is_error(&self) -> bool {
        self.name == STATUS_ERROR || self.status.as_deref() == Some(STATUS_ERROR)
    }

    /// The `NO CARRIER` line.
    pub fn is_no_carrier(&self) -> bool {
        self.name == NO_CARRIER
    }

    /// Whether this record ends the response to a command.
    pub fn is_final_result(&self) -> bool {
        self.is_ok() || self.is_error() || self.is_no_carrier()
    }
}

impl fmt::Display for ResponseRecord {
    /// Renders the record the way the modem printed it, without line
    /// terminators. Payloads are summarized by length.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(status) = &self.status {
            write!(f, " {}", status)?;
        }
        if !self.params.is_empty() {
            write!(f, ": {}", self.params.join(", "))?;
        }
        if let Some(data) = &self.data {
            write!(f, " <{} bytes>", data.len())?;
        }
        Ok(())
    }
}
