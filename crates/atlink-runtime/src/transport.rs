//! Transport reader and writer threads.
//!
//! Both ends work on plain `std::io` handles, so a serial port, a TCP socket
//! to a serial bridge, or a captured log file all plug in the same way.
//! Opening and configuring the physical port is left to the caller.

use std::io::{self, ErrorKind, Read, Write};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, trace};

/// Why the reader thread stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The transport reported end-of-stream.
    EndOfStream,
    /// A read failed with the given error kind.
    ReadFailed(ErrorKind),
    /// The parser closed its end of the queue.
    ParserGone,
}

/// Spawn the reader thread.
///
/// Every successful read is forwarded as one chunk. The send blocks until the
/// parser takes the chunk, so the reader never runs ahead of the parser.
pub fn spawn_reader<R>(
    reader: R,
    buffer_size: usize,
    chunks: Sender<Bytes>,
) -> io::Result<JoinHandle<ReaderExit>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("atlink-reader".to_string())
        .spawn(move || run_reader(reader, buffer_size, chunks))
}

/// Reader loop. Returns when the transport ends, fails, or the parser is gone.
///
/// Dropping `chunks` on return closes the queue.
pub fn run_reader<R: Read>(mut reader: R, buffer_size: usize, chunks: Sender<Bytes>) -> ReaderExit {
    let mut buf = vec![0u8; buffer_size.max(1)];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                info!("no more data from transport");
                return ReaderExit::EndOfStream;
            }
            Ok(n) => {
                trace!(len = n, "read chunk");
                if chunks.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    debug!("parser gone, reader stopping");
                    return ReaderExit::ParserGone;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("transport read failed: {}", e);
                return ReaderExit::ReadFailed(e.kind());
            }
        }
    }
}

/// Spawn the writer thread.
pub fn spawn_writer<W>(
    writer: W,
    commands: Receiver<Vec<u8>>,
) -> io::Result<JoinHandle<io::Result<()>>>
where
    W: Write + Send + 'static,
{
    thread::Builder::new()
        .name("atlink-writer".to_string())
        .spawn(move || run_writer(writer, commands))
}

/// Writer loop. Writes each buffer exactly as queued, no terminator added.
///
/// Returns `Ok(())` once the queue is closed and drained. A write error is
/// returned immediately and is not retried.
pub fn run_writer<W: Write>(mut writer: W, commands: Receiver<Vec<u8>>) -> io::Result<()> {
    for command in commands.iter() {
        debug!(
            len = command.len(),
            "sending {:?}",
            String::from_utf8_lossy(&command)
        );
        if let Err(e) = write_fully(&mut writer, &command).and_then(|_| writer.flush()) {
            error!("transport write failed: {}", e);
            return Err(e);
        }
    }
    debug!("command queue closed, writer stopping");
    Ok(())
}

/// Write the whole buffer, looping over partial writes.
fn write_fully<W: Write>(writer: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "transport accepted no bytes",
                ))
            }
            Ok(n) => {
                trace!(sent = n, remaining = buf.len() - n, "partial write");
                buf = &buf[n..];
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
