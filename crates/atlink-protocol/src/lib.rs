//! AT Command Response Protocol
//!
//! This crate provides types and utilities for decoding the responses of
//! serial-attached modems that speak a line-oriented AT command dialect.
//! Responses are framed as text lines, except for one command whose line
//! announces a binary payload that follows verbatim.
//!
//! # Protocol Overview
//!
//! Every response line starts with `\r\n` and ends with `\r\n`:
//!
//! - **Bare lines**: `OK`, `RING`, `+CPIN` - just a name
//! - **Status lines**: `<name> <status>` where status is one of `OK`, `ERROR`,
//!   `115200` or `CARRIER` (`NO CARRIER` is reported as a single name)
//! - **Parameter lines**: `<name>: <p1>, <p2>, ...`
//! - **Payload lines**: `+CHTTPACT: DATA, <n>` followed by exactly `n` raw
//!   bytes with no line terminator
//! - **Prompts**: lines starting with `>` are discarded
//!
//! # Example
//!
//! ```rust
//! use atlink_protocol::{Command, FrameParser};
//!
//! // Build a command
//! let line = Command::query("+CSQ").encode();
//! assert_eq!(line, b"AT+CSQ?\r");
//!
//! // Parse responses
//! let mut parser = FrameParser::new();
//! let records = parser.decode_all(b"\r\n+CSQ: 20, 99\r\n\r\nOK\r\n").unwrap();
//! assert_eq!(records[0].params, vec!["20", "99"]);
//! assert!(records[1].is_ok());
//! ```

mod commands;
mod constants;
mod error;
mod parser;
mod response;
mod state;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use parser::*;
pub use response::*;
pub use state::*;
