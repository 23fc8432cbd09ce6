//! Codec for encoding and decoding Huddle frames.
//!
//! Frames travel as self-contained JSON text messages, one frame per
//! WebSocket message. There is no length prefix; the transport already
//! delimits messages.

use bytes::Bytes;
use thiserror::Error;

use crate::frames::{ClientFrame, ServerFrame};

/// Maximum inbound frame size in bytes.
///
/// Anything larger is a connection-fatal protocol violation, not a
/// recoverable decode error.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding/decoding error.
    #[error("Invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Whether this error must terminate the connection.
    ///
    /// Malformed JSON yields a local error frame and the connection stays
    /// open; an oversized frame tears the connection down.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::FrameTooLarge(_))
    }
}

/// Encode a server frame to JSON bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(frame: &ServerFrame) -> Result<Bytes, ProtocolError> {
    let payload = serde_json::to_vec(frame)?;
    Ok(Bytes::from(payload))
}

/// Decode a client frame from JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] if the payload exceeds
/// [`MAX_FRAME_SIZE`], or a JSON error if the payload is malformed.
pub fn decode(data: &[u8]) -> Result<ClientFrame, ProtocolError> {
    if data.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(data.len()));
    }
    let frame = serde_json::from_slice(data)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let frame = ServerFrame::dm_new(1, 2, "hi", "2026-01-02 03:04:05");
        let encoded = encode(&frame).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["type"], "dm_new");
        assert_eq!(value["from_user_id"], 1);
    }

    #[test]
    fn test_decode_invalid_json() {
        match decode(b"{not json") {
            Err(ProtocolError::Json(_)) => {}
            other => panic!("Expected Json error, got {:?}", other),
        }
        assert!(!decode(b"{not json").unwrap_err().is_fatal());
    }

    #[test]
    fn test_decode_oversize() {
        let huge = format!(
            r#"{{"type":"dm_send","to_user_id":2,"text":"{}"}}"#,
            "a".repeat(MAX_FRAME_SIZE)
        );
        match decode(huge.as_bytes()) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge error, got {:?}", other),
        }
        assert!(decode(huge.as_bytes()).unwrap_err().is_fatal());
    }

    #[test]
    fn test_decode_non_object() {
        assert!(decode(b"42").is_err());
    }
}
