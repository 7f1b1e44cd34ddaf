//! Byte-level response parser.
//!
//! The parser is a state machine fed one byte at a time. Chunk boundaries mean
//! nothing to it: a line may be split across any number of reads, and one
//! read may hold many lines. After a payload header it switches to copying
//! the declared number of raw bytes without looking at them, then resumes
//! text parsing on the very next byte.

use std::mem;

use bytes::{BufMut, BytesMut};
use log::{debug, trace, warn};

use crate::constants::*;
use crate::error::{ProtocolError, ProtocolResult};
use crate::response::ResponseRecord;
use crate::state::{byte_symbol, ParserState};

/// Initial capacity of the name, status and parameter accumulators.
const FIELD_CAPACITY: usize = 32;

/// Default upper bound on a declared payload length (16 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Incremental decoder for the AT response stream.
///
/// The accumulators are cleared, never reallocated, between frames.
#[derive(Debug)]
pub struct FrameParser {
    /// Current state.
    state: ParserState,
    /// Record being assembled.
    record: ResponseRecord,
    /// Name bytes of the current line.
    name: BytesMut,
    /// Status token bytes of the current line.
    status: BytesMut,
    /// Bytes of the parameter currently being read.
    param: BytesMut,
    /// The previous byte was a parameter separator.
    after_comma: bool,
    /// Next write position in the payload.
    filled: usize,
    /// Payload bytes still expected.
    remaining: usize,
    /// Largest payload a header may declare.
    max_payload: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create a parser in the idle state.
    ///
    /// Payload headers declaring more than [`DEFAULT_MAX_PAYLOAD`] (16 MiB)
    /// are refused with [`ProtocolError::PayloadTooLarge`], even when the
    /// count itself is well formed. Use [`FrameParser::with_max_payload`] to
    /// accept larger payloads.
    pub fn new() -> Self {
        Self::with_max_payload(DEFAULT_MAX_PAYLOAD)
    }

    /// Create a parser that rejects payload headers declaring more than
    /// `max_payload` bytes.
    pub fn with_max_payload(max_payload: usize) -> Self {
        FrameParser {
            state: ParserState::Idle,
            record: ResponseRecord::default(),
            name: BytesMut::with_capacity(FIELD_CAPACITY),
            status: BytesMut::with_capacity(FIELD_CAPACITY),
            param: BytesMut::with_capacity(FIELD_CAPACITY),
            after_comma: false,
            filled: 0,
            remaining: 0,
            max_payload,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Whether the parser is between frames.
    pub fn is_idle(&self) -> bool {
        self.state == ParserState::Idle
    }

    /// Payload bytes still expected, zero outside of a payload.
    pub fn payload_remaining(&self) -> usize {
        self.remaining
    }

    /// Drop any in-progress frame and return to the idle state.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.record = ResponseRecord::default();
        self.name.clear();
        self.status.clear();
        self.param.clear();
        self.after_comma = false;
        self.filled = 0;
        self.remaining = 0;
    }

    /// Feed a single byte.
    ///
    /// Returns `Ok(Some(record))` when the byte completes a record. On any
    /// error the in-progress frame is discarded and the parser is back in
    /// [`ParserState::Idle`]; see [`ProtocolError::is_fatal`] for whether it
    /// makes sense to keep feeding it.
    pub fn push(&mut self, byte: u8) -> ProtocolResult<Option<ResponseRecord>> {
        let prev = self.state;
        let result = self.step(byte);

        if prev != self.state && !prev.is_binary() {
            trace!("{} -> {} on {}", prev, self.state, byte_symbol(byte));
        }

        match result {
            Ok(Some(record)) => {
                debug!("received {}", record);
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                if !e.is_fatal() {
                    warn!("{}", e);
                }
                self.reset();
                Err(e)
            }
        }
    }

    /// Decode a chunk of bytes.
    ///
    /// The returned iterator consumes the chunk lazily and yields each record
    /// (or error) as soon as the byte that completes it has been consumed, so
    /// a caller can block on handing off a record before the rest of the
    /// chunk is parsed. Dropping the iterator early leaves the unconsumed
    /// bytes unparsed.
    pub fn decode<'p, 'c>(&'p mut self, chunk: &'c [u8]) -> Decode<'p, 'c> {
        Decode {
            parser: self,
            bytes: chunk.iter(),
        }
    }

    /// Decode a chunk and collect the completed records.
    ///
    /// Recoverable errors are skipped. Returns the first fatal error.
    pub fn decode_all(&mut self, chunk: &[u8]) -> ProtocolResult<Vec<ResponseRecord>> {
        let mut records = Vec::new();
        for item in self.decode(chunk) {
            match item {
                Ok(record) => records.push(record),
                Err(e) if !e.is_fatal() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    fn step(&mut self, byte: u8) -> ProtocolResult<Option<ResponseRecord>> {
        match self.state {
            ParserState::Idle => {
                if byte == CR {
                    self.state = ParserState::AwaitLf;
                }
            }
            ParserState::AwaitLf => {
                if byte == LF {
                    self.record = ResponseRecord::default();
                    self.state = ParserState::LineStart;
                } else {
                    self.state = ParserState::Idle;
                }
            }
            ParserState::LineStart => match byte {
                SPACE => return Err(ProtocolError::SpaceAtLineStart),
                PROMPT => {
                    debug!("ignoring prompt");
                    self.state = ParserState::Idle;
                }
                CR => {
                    trace!("empty line");
                    self.state = ParserState::AwaitLf;
                }
                _ => {
                    self.name.clear();
                    self.name.put_u8(byte);
                    self.state = ParserState::NameAccum;
                }
            },
            ParserState::NameAccum => match byte {
                SPACE => {
                    self.record.name = take_string(&mut self.name);
                    self.status.clear();
                    self.state = ParserState::BareStatus;
                }
                CR => {
                    self.record.name = take_string(&mut self.name);
                    self.state = ParserState::FrameEnd;
                }
                COLON => {
                    self.record.name = take_string(&mut self.name);
                    self.param.clear();
                    self.state = ParserState::ParamSepExpectSpace;
                }
                _ => self.name.put_u8(byte),
            },
            ParserState::BareStatus => {
                if byte == CR {
                    let token = take_string(&mut self.status);
                    if !is_status_token(&token) {
                        return Err(ProtocolError::UnknownStatus(token));
                    }
                    if token == STATUS_CARRIER && self.record.name == NAME_NO {
                        self.record.name = NO_CARRIER.to_string();
                    } else {
                        self.record.status = Some(token);
                    }
                    self.state = ParserState::FrameEnd;
                } else {
                    self.status.put_u8(byte);
                }
            }
            ParserState::ParamSepExpectSpace => {
                if byte == SPACE {
                    self.after_comma = false;
                    self.state = ParserState::ParamAccum;
                } else {
                    return Err(ProtocolError::MissingSpaceAfterColon {
                        name: self.record.name.clone(),
                        found: byte_symbol(byte).into_owned(),
                    });
                }
            }
            ParserState::ParamAccum => {
                let after_comma = mem::replace(&mut self.after_comma, false);
                match byte {
                    COMMA => {
                        let param = take_string(&mut self.param);
                        self.record.params.push(param);
                        self.after_comma = true;
                    }
                    CR => {
                        let param = take_string(&mut self.param);
                        self.record.params.push(param);
                        self.state = ParserState::FrameEnd;
                    }
                    // Only the single space of a ", " separator is dropped.
                    SPACE if after_comma => {}
                    _ => self.param.put_u8(byte),
                }
            }
            ParserState::FrameEnd => {
                if byte != LF {
                    return Err(ProtocolError::MissingLineFeed {
                        found: byte_symbol(byte).into_owned(),
                    });
                }
                if self.is_payload_header() {
                    return self.begin_payload();
                }
                return Ok(Some(self.publish()));
            }
            ParserState::ReadBinary => {
                let (_, record) = self.fill_payload(&[byte]);
                return Ok(record);
            }
        }
        Ok(None)
    }

    fn is_payload_header(&self) -> bool {
        self.record.name == BINARY_TRIGGER_COMMAND
            && self.record.param(0) == Some(BINARY_TRIGGER_KEYWORD)
    }

    /// Allocate the payload buffer declared by a `+CHTTPACT: DATA, n` header.
    fn begin_payload(&mut self) -> ProtocolResult<Option<ResponseRecord>> {
        let count = self.record.param(1).ok_or(ProtocolError::MissingByteCount)?;
        let len: usize = count
            .parse()
            .map_err(|_| ProtocolError::InvalidByteCount(count.to_string()))?;
        if len > self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                declared: len,
                max: self.max_payload,
            });
        }

        debug!("payload of {} bytes follows {}", len, self.record.name);
        self.record.data = Some(vec![0; len]);
        self.filled = 0;
        self.remaining = len;

        if len == 0 {
            return Ok(Some(self.publish()));
        }
        self.state = ParserState::ReadBinary;
        Ok(None)
    }

    /// Copy as much of `bytes` into the payload as it still needs.
    ///
    /// Returns the number of bytes consumed and the record if the payload is
    /// now complete.
    fn fill_payload(&mut self, bytes: &[u8]) -> (usize, Option<ResponseRecord>) {
        let n = bytes.len().min(self.remaining);
        if let Some(data) = self.record.data.as_mut() {
            data[self.filled..self.filled + n].copy_from_slice(&bytes[..n]);
        }
        self.filled += n;
        self.remaining -= n;

        if self.remaining == 0 {
            (n, Some(self.publish()))
        } else {
            (n, None)
        }
    }

    /// Hand out the finished record and go back to idle.
    fn publish(&mut self) -> ResponseRecord {
        self.state = ParserState::Idle;
        self.filled = 0;
        self.remaining = 0;
        mem::take(&mut self.record)
    }
}

/// Convert an accumulator to a string and clear it.
fn take_string(buf: &mut BytesMut) -> String {
    let s = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    s
}

/// Iterator over the records completed by a chunk.
///
/// Created by [`FrameParser::decode`].
#[derive(Debug)]
pub struct Decode<'p, 'c> {
    parser: &'p mut FrameParser,
    bytes: std::slice::Iter<'c, u8>,
}

impl Iterator for Decode<'_, '_> {
    type Item = ProtocolResult<ResponseRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.parser.state.is_binary() {
                // Payload bytes are copied in bulk.
                let rest = self.bytes.as_slice();
                if rest.is_empty() {
                    return None;
                }
                let (n, record) = self.parser.fill_payload(rest);
                self.bytes = rest[n..].iter();
                if let Some(record) = record {
                    debug!("received {}", record);
                    return Some(Ok(record));
                }
                continue;
            }

            let &byte = self.bytes.next()?;
            if let Some(item) = self.parser.push(byte).transpose() {
                return Some(item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &[u8]) -> Vec<ResponseRecord> {
        FrameParser::new().decode_all(input).expect("should decode")
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bare_ok() {
        let records = decode(b"\r\nOK\r\n");
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
        assert!(records[0].params.is_empty());
        assert!(records[0].status.is_none());
        assert!(records[0].data.is_none());
    }

    #[test]
    fn test_no_carrier() {
        let records = decode(b"\r\nNO CARRIER\r\n");
        assert_eq!(records, vec![ResponseRecord::named("NO CARRIER")]);
    }

    #[test]
    fn test_status_line() {
        let records = decode(b"\r\nCONNECT 115200\r\n\r\nSEND OK\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "CONNECT");
        assert_eq!(records[0].status.as_deref(), Some("115200"));
        assert_eq!(records[1].name, "SEND");
        assert_eq!(records[1].status.as_deref(), Some("OK"));
    }

    #[test]
    fn test_carrier_without_no() {
        let records = decode(b"\r\nLOST CARRIER\r\n");
        assert_eq!(records[0].name, "LOST");
        assert_eq!(records[0].status.as_deref(), Some("CARRIER"));
    }

    #[test]
    fn test_params() {
        let records = decode(b"\r\n+CSQ: 20, 99\r\n\r\n+CREG: 0,1\r\n");
        assert_eq!(records[0].name, "+CSQ");
        assert_eq!(records[0].params, strings(&["20", "99"]));
        assert_eq!(records[1].params, strings(&["0", "1"]));
    }

    #[test]
    fn test_empty_params() {
        let records = decode(b"\r\n+X: a, , b\r\n\r\n+Y: \r\n");
        assert_eq!(records[0].params, strings(&["a", "", "b"]));
        assert_eq!(records[1].params, strings(&[""]));
    }

    #[test]
    fn test_only_separator_space_dropped() {
        let records = decode(b"\r\n+X:  a,b , c,  d\r\n");
        assert_eq!(records[0].params, strings(&[" a", "b ", "c", " d"]));
    }

    #[test]
    fn test_binary_payload() {
        let mut parser = FrameParser::new();
        let records = parser.decode_all(b"\r\n+CHTTPACT: DATA, 5\r\nHELLO").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "+CHTTPACT");
        assert_eq!(records[0].params, strings(&["DATA", "5"]));
        assert_eq!(records[0].data.as_deref(), Some(&b"HELLO"[..]));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_binary_payload_holds_control_bytes() {
        let mut input = b"\r\n+CHTTPACT: DATA, 6\r\n".to_vec();
        input.extend_from_slice(b"\r\n>\x1a \x00");
        input.extend_from_slice(b"\r\nOK\r\n");

        let records = decode(&input);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data.as_deref(), Some(&b"\r\n>\x1a \x00"[..]));
        assert_eq!(records[1].name, "OK");
    }

    #[test]
    fn test_payload_resumes_text_parsing_immediately() {
        // Next frame begins right after the last payload byte.
        let records = decode(b"\r\n+CHTTPACT: DATA, 2\r\nAB\r\nOK\r\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data.as_deref(), Some(&b"AB"[..]));
        assert_eq!(records[1].name, "OK");
    }

    #[test]
    fn test_zero_length_payload() {
        let mut parser = FrameParser::new();
        let records = parser.decode_all(b"\r\n+CHTTPACT: DATA, 0\r\n").unwrap();
        assert_eq!(records[0].data.as_deref(), Some(&b""[..]));
        assert!(parser.is_idle());
    }

    #[test]
    fn test_chttpact_without_data_keyword() {
        let records = decode(b"\r\n+CHTTPACT: REQUEST\r\n");
        assert_eq!(records[0].params, strings(&["REQUEST"]));
        assert!(records[0].data.is_none());
    }

    #[test]
    fn test_stray_cr_then_frame() {
        let records = decode(b"\r\x01\r\nOK\r\n");
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
    }

    #[test]
    fn test_prompt_discarded() {
        let records = decode(b"\r\n> \r\nOK\r\n");
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
    }

    #[test]
    fn test_empty_line_restarts_frame() {
        let records = decode(b"\r\n\r\n\r\nOK\r\n");
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
    }

    #[test]
    fn test_missing_lf_drops_frame() {
        let mut parser = FrameParser::new();
        let results: Vec<_> = parser.decode(b"\r\nOK\rX\r\nERROR\r\n").collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[0],
            Err(ProtocolError::MissingLineFeed { found }) if found == "'X'"
        ));
        assert_eq!(results[1], Ok(ResponseRecord::named("ERROR")));
    }

    #[test]
    fn test_unknown_status_is_fatal() {
        let mut parser = FrameParser::new();
        let err = parser.decode_all(b"\r\nFOO BAR\r\n").unwrap_err();
        assert_eq!(err, ProtocolError::UnknownStatus("BAR".to_string()));
        assert!(err.is_fatal());
        assert!(parser.is_idle());
    }

    #[test]
    fn test_space_at_line_start_is_fatal() {
        let err = FrameParser::new().decode_all(b"\r\n OK\r\n").unwrap_err();
        assert_eq!(err, ProtocolError::SpaceAtLineStart);
    }

    #[test]
    fn test_missing_space_after_colon_is_fatal() {
        let err = FrameParser::new().decode_all(b"\r\n+CSQ:20\r\n").unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingSpaceAfterColon {
                name: "+CSQ".to_string(),
                found: "'2'".to_string(),
            }
        );
    }

    #[test]
    fn test_payload_header_without_colon_space_is_fatal() {
        // Modems print `+CHTTPACT: DATA, 5`; the unspaced form is rejected
        // like any other line missing the space after the colon.
        let mut parser = FrameParser::new();
        let err = parser
            .decode_all(b"\r\n+CHTTPACT:DATA, 5\r\nHELLO")
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::MissingSpaceAfterColon {
                name: "+CHTTPACT".to_string(),
                found: "'D'".to_string(),
            }
        );
        assert!(err.is_fatal());
        assert!(parser.is_idle());
    }

    #[test]
    fn test_invalid_byte_count_is_fatal() {
        let err = FrameParser::new()
            .decode_all(b"\r\n+CHTTPACT: DATA, five\r\n")
            .unwrap_err();
        assert_eq!(err, ProtocolError::InvalidByteCount("five".to_string()));

        let err = FrameParser::new()
            .decode_all(b"\r\n+CHTTPACT: DATA, -1\r\n")
            .unwrap_err();
        assert_eq!(err, ProtocolError::InvalidByteCount("-1".to_string()));
    }

    #[test]
    fn test_missing_byte_count_is_fatal() {
        let err = FrameParser::new()
            .decode_all(b"\r\n+CHTTPACT: DATA\r\n")
            .unwrap_err();
        assert_eq!(err, ProtocolError::MissingByteCount);
    }

    #[test]
    fn test_payload_limit() {
        let err = FrameParser::with_max_payload(4)
            .decode_all(b"\r\n+CHTTPACT: DATA, 5\r\n")
            .unwrap_err();
        assert_eq!(err, ProtocolError::PayloadTooLarge { declared: 5, max: 4 });
    }

    #[test]
    fn test_default_payload_limit() {
        let header = format!("\r\n+CHTTPACT: DATA, {}\r\n", DEFAULT_MAX_PAYLOAD + 1);
        let err = FrameParser::new().decode_all(header.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PayloadTooLarge {
                declared: DEFAULT_MAX_PAYLOAD + 1,
                max: DEFAULT_MAX_PAYLOAD,
            }
        );
    }

    #[test]
    fn test_iterator_continues_after_fatal_error() {
        // The iterator reports the error; the caller decides whether to go on.
        let mut parser = FrameParser::new();
        let results: Vec<_> = parser.decode(b"\r\nFOO BAR\r\n\r\nOK\r\n").collect();
        assert!(matches!(results[0], Err(ProtocolError::UnknownStatus(_))));
        assert_eq!(results[1], Ok(ResponseRecord::named("OK")));
    }

    #[test]
    fn test_split_across_chunks() {
        let mut parser = FrameParser::new();
        assert!(parser.decode_all(b"\r\n+CHTTPACT: DA").unwrap().is_empty());
        assert_eq!(parser.state(), ParserState::ParamAccum);
        assert!(parser.decode_all(b"TA, 4\r\nAB").unwrap().is_empty());
        assert_eq!(parser.state(), ParserState::ReadBinary);
        assert_eq!(parser.payload_remaining(), 2);

        let records = parser.decode_all(b"CD\r\nOK\r").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.as_deref(), Some(&b"ABCD"[..]));
        assert_eq!(parser.state(), ParserState::FrameEnd);

        let records = parser.decode_all(b"\n").unwrap();
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
    }

    #[test]
    fn test_push_byte_by_byte() {
        let mut parser = FrameParser::new();
        let mut records = Vec::new();
        for &byte in b"\r\n+CHTTPACT: DATA, 3\r\nxyz\r\nOK\r\n" {
            if let Some(record) = parser.push(byte).unwrap() {
                records.push(record);
            }
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].data.as_deref(), Some(&b"xyz"[..]));
    }

    #[test]
    fn test_decode_is_lazy() {
        let mut parser = FrameParser::new();
        let mut iter = parser.decode(b"\r\nOK\r\n\r\nERROR\r\n");
        assert_eq!(iter.next(), Some(Ok(ResponseRecord::named("OK"))));
        drop(iter);
        // The second frame was never consumed.
        assert!(parser.is_idle());
        assert!(parser.decode_all(b"").unwrap().is_empty());
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut parser = FrameParser::new();
        parser.decode_all(b"\r\n+CSQ: 2").unwrap();
        parser.reset();
        assert!(parser.is_idle());
        assert_eq!(parser.decode_all(b"0\r\n").unwrap(), vec![]);
    }

    #[test]
    fn test_noise_between_frames_ignored() {
        let records = decode(b"garbage\n\nAT\r\nOK\r\n");
        // "AT" echo has no leading CR LF; the CR LF after it opens the next frame.
        assert_eq!(records, vec![ResponseRecord::named("OK")]);
    }
}
