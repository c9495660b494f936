//! Newline-delimited framing for the dispatcher protocol
//!
//! Orders and feedback travel as one JSON document per line:
//! ```text
//! [ N bytes: UTF-8 JSON ][ '\n' ]
//! ```
//! Message boundaries must be reassembled from arbitrary TCP read chunks.

use bytes::BytesMut;
use thiserror::Error;

/// Maximum line length (1 MB) to prevent memory exhaustion by a peer that
/// never sends a newline
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Errors that can occur while decoding frames
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("line too long: {0} bytes (max: {MAX_LINE_LEN})")]
    LineTooLong(usize),

    #[error("invalid UTF-8 in frame: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Incremental decoder that reassembles newline-delimited frames from a byte
/// stream
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Append newly read bytes to the internal buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next complete line.
    ///
    /// Returns `Ok(Some(line))` with the newline (and any trailing CR)
    /// stripped, or `Ok(None)` when more data is needed.
    pub fn decode_next(&mut self) -> Result<Option<String>, CodecError> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let mut line = self.buffer.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(line.len() - 1);
                }
                Ok(Some(String::from_utf8(line.to_vec())?))
            }
            None if self.buffer.len() > MAX_LINE_LEN => {
                Err(CodecError::LineTooLong(self.buffer.len()))
            }
            None => Ok(None),
        }
    }
}

/// Frame one outbound message: payload plus the line terminator
pub fn encode(payload: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.extend_from_slice(payload.as_bytes());
    buf.push(b'\n');
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_line() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"{\"cmd\":\"runline\"}\n");
        assert_eq!(
            decoder.decode_next().unwrap(),
            Some("{\"cmd\":\"runline\"}".to_string())
        );
        assert_eq!(decoder.decode_next().unwrap(), None);
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"{\"cmd\":");
        assert_eq!(decoder.decode_next().unwrap(), None);
        decoder.extend(b"\"runline\"}\n");
        assert_eq!(
            decoder.decode_next().unwrap(),
            Some("{\"cmd\":\"runline\"}".to_string())
        );
    }

    #[test]
    fn test_decode_multiple_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"first\nsecond\nthird");
        assert_eq!(decoder.decode_next().unwrap(), Some("first".to_string()));
        assert_eq!(decoder.decode_next().unwrap(), Some("second".to_string()));
        assert_eq!(decoder.decode_next().unwrap(), None);
        decoder.extend(b"\n");
        assert_eq!(decoder.decode_next().unwrap(), Some("third".to_string()));
    }

    #[test]
    fn test_decode_strips_crlf() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"payload\r\n");
        assert_eq!(decoder.decode_next().unwrap(), Some("payload".to_string()));
    }

    #[test]
    fn test_oversized_line_rejected() {
        let mut decoder = LineDecoder::new();
        decoder.extend(&vec![b'x'; MAX_LINE_LEN + 1]);
        assert!(matches!(
            decoder.decode_next(),
            Err(CodecError::LineTooLong(_))
        ));
    }

    #[test]
    fn test_encode_appends_terminator() {
        assert_eq!(encode("abc"), b"abc\n");
    }
}
