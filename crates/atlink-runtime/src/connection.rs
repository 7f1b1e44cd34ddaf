//! Connection handle tying the three pipeline threads together.
//!
//! ```text
//!  transport ──read──▶ [reader] ══chunks══▶ [parser] ══responses══▶ consumer
//!  transport ◀─write── [writer] ◀══commands══ producer
//! ```
//!
//! Every `══` queue is a rendezvous channel: a send completes only when the
//! other side receives. Nothing is buffered between stages apart from the
//! one chunk or record being handed over.

use std::io::{self, Read, Write};
use std::thread::JoinHandle;
use std::time::Duration;

use atlink_protocol::{Command, FrameParser, ProtocolResult, ResponseRecord};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::parser_task::{spawn_parser, ParserExit};
use crate::transport::{spawn_reader, spawn_writer, ReaderExit};

/// A running link to a modem.
///
/// Created by [`connect`]. Each call returns an independent pipeline; a
/// program that wants a single link per port has to keep its own handle.
pub struct Connection {
    commands: Sender<Vec<u8>>,
    responses: Receiver<ResponseRecord>,
    reader: JoinHandle<ReaderExit>,
    parser: JoinHandle<ProtocolResult<ParserExit>>,
    writer: JoinHandle<io::Result<()>>,
}

/// Start a link over a transport with the default configuration.
pub fn connect<R, W>(reader: R, writer: W) -> LinkResult<Connection>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    connect_with(reader, writer, &LinkConfig::default())
}

/// Start a link over a transport.
///
/// `reader` and `writer` are usually two handles to the same port. The
/// connection lives until the transport reports end-of-stream or the parser
/// hits a fatal protocol error.
pub fn connect_with<R, W>(reader: R, writer: W, config: &LinkConfig) -> LinkResult<Connection>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    config.validate()?;

    let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(0);
    let (response_tx, response_rx) = crossbeam_channel::bounded(0);
    let (command_tx, command_rx) = crossbeam_channel::bounded(0);

    let parser = spawn_parser(
        FrameParser::with_max_payload(config.max_payload),
        chunk_rx,
        response_tx,
    )?;
    let writer = spawn_writer(writer, command_rx)?;
    let reader = spawn_reader(reader, config.read_buffer_size, chunk_tx)?;

    info!(serial = %config.serial, "link started");

    Ok(Connection {
        commands: command_tx,
        responses: response_rx,
        reader,
        parser,
        writer,
    })
}

impl Connection {
    /// Queue raw bytes for the transport.
    ///
    /// Blocks until the writer takes the buffer. The bytes are written as
    /// given; use [`Connection::send_command`] for terminated command lines.
    pub fn send(&self, bytes: Vec<u8>) -> LinkResult<()> {
        self.commands.send(bytes).map_err(|_| LinkError::WriterClosed)
    }

    /// Encode and send a command.
    pub fn send_command(&self, command: &Command) -> LinkResult<()> {
        debug!("sending {}", command.to_line());
        self.send(command.encode())
    }

    /// Wait for the next response.
    ///
    /// Returns `None` once the parser has stopped and every record has been
    /// received.
    pub fn recv(&self) -> Option<ResponseRecord> {
        self.responses.recv().ok()
    }

    /// Wait up to `timeout` for the next response.
    pub fn recv_timeout(&self, timeout: Duration) -> LinkResult<ResponseRecord> {
        self.responses.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => LinkError::Timeout,
            RecvTimeoutError::Disconnected => LinkError::Closed,
        })
    }

    /// Take a response if the parser is offering one right now.
    pub fn try_recv(&self) -> LinkResult<Option<ResponseRecord>> {
        match self.responses.try_recv() {
            Ok(record) => Ok(Some(record)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(LinkError::Closed),
        }
    }

    /// Send a command and collect responses up to its final result code.
    ///
    /// Responses are matched to commands in FIFO order only; anything the
    /// modem reports unsolicited before the final result is included.
    pub fn execute(&self, command: &Command, timeout: Duration) -> LinkResult<Vec<ResponseRecord>> {
        self.send_command(command)?;
        let mut records = Vec::new();
        loop {
            let record = self.recv_timeout(timeout)?;
            let done = record.is_final_result();
            records.push(record);
            if done {
                return Ok(records);
            }
        }
    }

    /// Iterate over responses until the parser stops.
    pub fn responses(&self) -> crossbeam_channel::Iter<'_, ResponseRecord> {
        self.responses.iter()
    }

    /// Whether every pipeline thread has exited.
    pub fn is_finished(&self) -> bool {
        self.reader.is_finished() && self.parser.is_finished() && self.writer.is_finished()
    }

    /// Close the command queue and wait for all threads to exit.
    ///
    /// Unreceived responses are discarded. The reader only exits once the
    /// transport reports end-of-stream or an error, so whoever owns the
    /// transport must close it first if it is still live.
    ///
    /// Returns the parser's fatal protocol error or the writer's I/O error,
    /// if either occurred.
    pub fn shutdown(self) -> LinkResult<()> {
        let Connection {
            commands,
            responses,
            reader,
            parser,
            writer,
        } = self;
        drop(commands);
        drop(responses);

        let write_result = writer.join().map_err(|_| LinkError::TaskPanicked("writer"))?;
        let parse_result = parser.join().map_err(|_| LinkError::TaskPanicked("parser"))?;
        let reader_exit = reader.join().map_err(|_| LinkError::TaskPanicked("reader"))?;

        debug!(?reader_exit, "link stopped");
        let parser_exit = parse_result?;
        debug!(?parser_exit, "parser stopped");
        write_result?;
        Ok(())
    }
}
