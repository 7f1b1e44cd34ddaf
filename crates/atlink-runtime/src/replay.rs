//! Offline replay of captured modem output.
//!
//! A capture is the raw byte stream a modem sent, saved to a file. Replaying
//! it runs the full pipeline with a reader over the capture and a writer that
//! discards everything, and prints each record as one JSON line.

use std::io::{self, Read, Write};

use atlink_protocol::ResponseRecord;
use tracing::info;

use crate::config::LinkConfig;
use crate::connection::connect_with;
use crate::error::LinkResult;

/// Write a record as a single JSON line.
pub fn write_record<W: Write>(out: &mut W, record: &ResponseRecord) -> LinkResult<()> {
    writeln!(out, "{}", serde_json::to_string(record)?)?;
    Ok(())
}

/// Run `capture` through the pipeline and write every record to `out`.
///
/// Returns the number of records written. A fatal protocol error in the
/// capture is returned after the records before it have been written. A
/// failed write to `out` stops the replay.
pub fn replay<R, W>(capture: R, out: &mut W, config: &LinkConfig) -> LinkResult<usize>
where
    R: Read + Send + 'static,
    W: Write,
{
    let conn = connect_with(capture, io::sink(), config)?;

    let mut count = 0usize;
    for record in conn.responses() {
        write_record(out, &record)?;
        count += 1;
    }
    out.flush()?;
    info!("{} records", count);

    conn.shutdown()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    use crate::error::LinkError;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_record_json_line() {
        let mut out = Vec::new();
        let mut record = ResponseRecord::named("+CSQ");
        record.params = vec!["21".to_string(), "99".to_string()];
        write_record(&mut out, &record).unwrap();
        assert_eq!(out, b"{\"name\":\"+CSQ\",\"params\":[\"21\",\"99\"]}\n");
    }

    #[test]
    fn test_closed_output_is_an_error() {
        let capture = Cursor::new(b"\r\nOK\r\n".to_vec());
        let err = replay(capture, &mut ClosedPipe, &LinkConfig::default()).unwrap_err();
        assert!(matches!(err, LinkError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }
}
