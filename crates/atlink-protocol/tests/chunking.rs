//! Chunk-boundary tests for the frame parser.
//!
//! Splitting a stream at arbitrary byte boundaries must not change what the
//! parser emits.

use atlink_protocol::{FrameParser, ProtocolError, ResponseRecord};
use proptest::prelude::*;

/// A capture resembling an HTTP fetch session.
fn session() -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(b"ATE0\n");
    stream.extend_from_slice(b"\r\n+CHTTPACT: REQUEST\r\n");
    stream.extend_from_slice(b"\r\n>");
    stream.extend_from_slice(b"\r\nOK\r\n");
    stream.extend_from_slice(b"\r\n+CHTTPACT: DATA, 12\r\n");
    stream.extend_from_slice(b"HTTP\r\n\r\n\x1a\x00\xff>");
    stream.extend_from_slice(b"\r\n+CHTTPACT: 0\r\n");
    stream.extend_from_slice(b"\r\nCONNECT 115200\r\n");
    stream.extend_from_slice(b"\r\nNO CARRIER\r\n");
    stream.extend_from_slice(b"\r\x01");
    stream.extend_from_slice(b"\r\n+CSQ: 21, 99\r\n");
    stream
}

fn decode_chunked(stream: &[u8], cuts: &[usize]) -> Result<Vec<ResponseRecord>, ProtocolError> {
    let mut parser = FrameParser::new();
    let mut records = Vec::new();
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&stream.len())) {
        let cut = cut.min(stream.len());
        if cut <= start {
            continue;
        }
        records.extend(parser.decode_all(&stream[start..cut])?);
        start = cut;
    }
    Ok(records)
}

#[test]
fn test_session_records() {
    let records = FrameParser::new().decode_all(&session()).unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["+CHTTPACT", "OK", "+CHTTPACT", "+CHTTPACT", "CONNECT", "NO CARRIER", "+CSQ"]
    );
    assert_eq!(records[2].data.as_deref(), Some(&b"HTTP\r\n\r\n\x1a\x00\xff>"[..]));
    assert_eq!(records[3].params, vec!["0"]);
    assert_eq!(records[4].status.as_deref(), Some("115200"));
}

#[test]
fn test_one_byte_chunks() {
    let stream = session();
    let cuts: Vec<usize> = (1..stream.len()).collect();
    let whole = FrameParser::new().decode_all(&stream).unwrap();
    assert_eq!(decode_chunked(&stream, &cuts).unwrap(), whole);
}

#[test]
fn test_fatal_error_survives_chunking() {
    let stream = b"\r\nOK\r\n\r\nFOO BAR\r\n";
    let err = decode_chunked(stream, &[3, 9, 12]).unwrap_err();
    assert_eq!(err, ProtocolError::UnknownStatus("BAR".to_string()));
}

proptest! {
    #[test]
    fn prop_chunk_boundaries_do_not_matter(cuts in prop::collection::vec(0usize..200, 0..40)) {
        let stream = session();
        let mut cuts = cuts;
        cuts.sort_unstable();
        let whole = FrameParser::new().decode_all(&stream).unwrap();
        let chunked = decode_chunked(&stream, &cuts).unwrap();
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn prop_payload_bytes_are_opaque(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut stream = format!("\r\n+CHTTPACT: DATA, {}\r\n", payload.len()).into_bytes();
        stream.extend_from_slice(&payload);
        stream.extend_from_slice(b"\r\nOK\r\n");

        let records = FrameParser::new().decode_all(&stream).unwrap();
        prop_assert_eq!(records.len(), 2);
        prop_assert_eq!(records[0].data.as_deref(), Some(&payload[..]));
        prop_assert_eq!(records[1].name.as_str(), "OK");
    }
}
