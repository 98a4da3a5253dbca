//! Length-prefixed JSON frames on stdio.
//!
//! Each frame is a 4-byte little-endian length followed by exactly that
//! many bytes of UTF-8 JSON. Lengths outside `(0, 1 MiB]` poison the
//! stream. End-of-stream before the first length byte is a clean close;
//! anywhere later it is a truncation.

use std::io::{ErrorKind, Read, Write};

use serde_json::Value;
use thiserror::Error;

pub const MAX_FRAME_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("stream ended mid-frame")]
    Truncated,
    #[error("invalid frame length {0}")]
    BadLength(u32),
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reads one frame. `Ok(None)` is a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Value>, FrameError> {
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        let n = reader.read(&mut len_buf[filled..])?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(FrameError::Truncated)
            };
        }
        filled += n;
    }

    let len = u32::from_le_bytes(len_buf);
    if len == 0 || len as usize > MAX_FRAME_BYTES {
        return Err(FrameError::BadLength(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            FrameError::Truncated
        } else {
            FrameError::Io(err)
        }
    })?;

    Ok(Some(serde_json::from_slice(&body)?))
}

/// Writes one frame and flushes it immediately; responses must not sit in
/// a buffer while the peer waits.
pub fn write_frame<W: Write>(writer: &mut W, message: &Value) -> Result<(), FrameError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(FrameError::BadLength(body.len() as u32));
    }

    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_message() {
        let message = json!({"action": "ping", "params": {"nested": [1, 2, 3]}});
        let mut buf = Vec::new();
        write_frame(&mut buf, &message).expect("write");

        let mut cursor = Cursor::new(buf);
        let read = read_frame(&mut cursor).expect("read").expect("frame");
        assert_eq!(read, message);
        // Stream is now cleanly exhausted.
        assert!(read_frame(&mut cursor).expect("eof").is_none());
    }

    #[test]
    fn empty_stream_is_clean_eof() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_frame(&mut cursor).expect("eof").is_none());
    }

    #[test]
    fn zero_length_is_rejected() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 0]);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(FrameError::BadLength(0))
        ));
    }

    #[test]
    fn oversize_length_is_rejected() {
        let len = (MAX_FRAME_BYTES as u32) + 1;
        let mut cursor = Cursor::new(len.to_le_bytes().to_vec());
        assert!(matches!(
            read_frame(&mut cursor),
            Err(FrameError::BadLength(l)) if l == len
        ));
    }

    #[test]
    fn eof_inside_length_prefix_is_truncation() {
        let mut cursor = Cursor::new(vec![5, 0]);
        assert!(matches!(read_frame(&mut cursor), Err(FrameError::Truncated)));
    }

    #[test]
    fn eof_inside_body_is_truncation() {
        let mut bytes = 10u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{\"a\"");
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(read_frame(&mut cursor), Err(FrameError::Truncated)));
    }

    #[test]
    fn garbage_body_is_a_json_error() {
        let mut bytes = 4u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"@@@@");
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(read_frame(&mut cursor), Err(FrameError::Json(_))));
    }

    #[test]
    fn writer_refuses_oversize_frames() {
        let message = json!({"blob": "x".repeat(MAX_FRAME_BYTES)});
        let mut buf = Vec::new();
        assert!(matches!(
            write_frame(&mut buf, &message),
            Err(FrameError::BadLength(_))
        ));
        assert!(buf.is_empty());
    }
}
