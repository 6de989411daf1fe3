//! Audio frame type shared by both call legs.
//!
//! Both Twilio Media Streams and the OpenAI Realtime API carry audio as
//! base64 text inside JSON events. Frames are decoded once at the adapter
//! boundary so a corrupt payload is rejected before it reaches the other leg.

use base64::prelude::*;
use bytes::Bytes;

/// A chunk of G.711 μ-law audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Raw encoded audio bytes
    pub data: Bytes,
    /// Offset from stream start in ms (caller side only)
    pub timestamp_ms: Option<u64>,
}

impl AudioFrame {
    /// Decode a base64 payload from the model leg (no timestamp).
    pub fn from_base64(payload: &str) -> Result<Self, base64::DecodeError> {
        Ok(Self {
            data: Bytes::from(BASE64_STANDARD.decode(payload)?),
            timestamp_ms: None,
        })
    }

    /// Decode a base64 payload from the caller leg.
    pub fn from_base64_at(payload: &str, timestamp_ms: u64) -> Result<Self, base64::DecodeError> {
        let mut frame = Self::from_base64(payload)?;
        frame.timestamp_ms = Some(timestamp_ms);
        Ok(frame)
    }

    /// Encode the frame back to the base64 transport form.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }
}
