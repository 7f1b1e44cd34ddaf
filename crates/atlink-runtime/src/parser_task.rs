//! The parser thread.
//!
//! Owns the [`FrameParser`] exclusively. Chunks arrive from the reader,
//! records leave towards the consumer, and both hand-offs block, which is
//! what carries backpressure from a slow consumer back to the transport.

use std::io;
use std::thread::{self, JoinHandle};

use atlink_protocol::{FrameParser, ProtocolResult, ResponseRecord};
use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, warn};

/// Why the parser thread stopped without a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserExit {
    /// The reader closed the chunk queue.
    InputClosed,
    /// The consumer dropped the response queue.
    ConsumerGone,
}

/// Spawn the parser thread.
pub fn spawn_parser(
    parser: FrameParser,
    chunks: Receiver<Bytes>,
    responses: Sender<ResponseRecord>,
) -> io::Result<JoinHandle<ProtocolResult<ParserExit>>> {
    thread::Builder::new()
        .name("atlink-parser".to_string())
        .spawn(move || run_parser(parser, chunks, responses))
}

/// Parser loop.
///
/// Recoverable framing faults are skipped. A fatal protocol error stops the
/// loop and is returned; dropping both queue ends on return tells the reader
/// and the consumer that the parser is gone.
pub fn run_parser(
    mut parser: FrameParser,
    chunks: Receiver<Bytes>,
    responses: Sender<ResponseRecord>,
) -> ProtocolResult<ParserExit> {
    for chunk in chunks.iter() {
        for item in parser.decode(&chunk) {
            match item {
                Ok(record) => {
                    if responses.send(record).is_err() {
                        debug!("consumer gone, parser stopping");
                        return Ok(ParserExit::ConsumerGone);
                    }
                }
                Err(e) if !e.is_fatal() => {}
                Err(e) => {
                    error!("fatal protocol violation: {}", e);
                    return Err(e);
                }
            }
        }
    }

    if !parser.is_idle() {
        warn!(state = %parser.state(), "input closed in the middle of a frame");
    }
    debug!("input closed, parser stopping");
    Ok(ParserExit::InputClosed)
}
