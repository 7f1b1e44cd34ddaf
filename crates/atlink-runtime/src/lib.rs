//! AT modem link runtime.
//!
//! Runs the response parser from [`atlink_protocol`] between a transport and
//! a consumer on three threads:
//!
//! - **Reader**: reads chunks from the transport
//! - **Parser**: turns chunks into [`ResponseRecord`]s
//! - **Writer**: writes queued commands to the transport
//!
//! All queues are unbuffered, so a consumer that stops receiving stalls the
//! parser, which in turn stalls the reader. Memory use stays bounded no matter
//! how fast the modem talks.
//!
//! # Example
//!
//! ```rust,ignore
//! use atlink_runtime::connect;
//! use atlink_protocol::Command;
//!
//! let port = std::net::TcpStream::connect("192.168.1.20:4001")?;
//! let conn = connect(port.try_clone()?, port)?;
//! for record in conn.execute(&Command::query("+CSQ"), Duration::from_secs(5))? {
//!     println!("{}", record);
//! }
//! ```
//!
//! [`ResponseRecord`]: atlink_protocol::ResponseRecord

pub mod config;
pub mod connection;
pub mod error;
pub mod parser_task;
pub mod replay;
pub mod transport;

pub use config::{FlowControl, LinkConfig, Parity, SerialSettings};
pub use connection::{connect, connect_with, Connection};
pub use error::{LinkError, LinkResult};
pub use parser_task::ParserExit;
pub use replay::{replay, write_record};
pub use transport::ReaderExit;
