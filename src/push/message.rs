//! JSON messages sent over the push channel

use crate::frame::EncodedFrame;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Event name carried by every frame message
pub const FRAME_EVENT: &str = "frame";

/// `{"event":"frame","data":"<base64 JPEG>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub event: String,
    pub data: String,
}

impl PushMessage {
    /// Wraps one encoded frame as a base64 `frame` event
    pub fn frame(frame: &EncodedFrame) -> Self {
        Self {
            event: FRAME_EVENT.to_string(),
            data: STANDARD.encode(frame.as_bytes()),
        }
    }

    pub fn is_frame(&self) -> bool {
        self.event == FRAME_EVENT
    }

    /// Raw JPEG bytes carried in `data`
    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }

    /// `data:` URI the viewer page assigns to its image element
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.data)
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Instant;

    fn encoded(data: &'static [u8]) -> EncodedFrame {
        EncodedFrame::new(Bytes::from_static(data), 2, 2, Instant::now())
    }

    #[test]
    fn test_frame_message_shape() {
        let msg = PushMessage::frame(&encoded(&[0xFF, 0xD8, 0xFF, 0xD9]));
        let json: serde_json::Value = serde_json::from_str(&msg.to_text().unwrap()).unwrap();

        assert_eq!(json["event"], "frame");
        assert_eq!(json["data"], "/9j/2Q==");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_payload_survives_text() {
        let msg = PushMessage::frame(&encoded(b"\x00\x01\x02jpeg"));
        let parsed = PushMessage::from_text(&msg.to_text().unwrap()).unwrap();

        assert!(parsed.is_frame());
        assert_eq!(parsed.decode_payload().unwrap(), b"\x00\x01\x02jpeg");
    }

    #[test]
    fn test_data_uri() {
        let msg = PushMessage::frame(&encoded(&[0xFF, 0xD8, 0xFF, 0xD9]));
        assert_eq!(msg.data_uri(), "data:image/jpeg;base64,/9j/2Q==");
    }

    #[test]
    fn test_bad_base64_rejected() {
        let msg = PushMessage {
            event: FRAME_EVENT.to_string(),
            data: "not base64!".to_string(),
        };
        assert!(msg.decode_payload().is_err());
    }
}
