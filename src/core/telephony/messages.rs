//! Twilio Media Streams WebSocket message types.
//!
//! All events are JSON objects tagged by an `event` field.
//!
//! # Protocol Overview
//!
//! Events received from Twilio:
//! - connected - WebSocket established
//! - start - Stream metadata, carries the `streamSid`
//! - media - Base64 μ-law caller audio with a ms offset
//! - mark - A previously sent mark finished playing
//! - dtmf - Keypad digit pressed
//! - stop - Stream ended (caller hung up or call was redirected)
//!
//! Events sent to Twilio:
//! - media - Base64 μ-law audio to play to the caller
//! - mark - Request a playback acknowledgement
//! - clear - Drop all buffered audio not yet played

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::bridge::{BridgeError, Peer};

// =============================================================================
// Inbound Events (Twilio -> bridge)
// =============================================================================

/// Events received on the telephony socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Socket handshake completed
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream started
    Start {
        /// Stream metadata
        start: StreamStart,
    },

    /// Caller audio
    Media {
        /// Audio chunk
        media: MediaPayload,
    },

    /// Playback acknowledgement
    Mark {
        /// Acknowledged mark
        mark: MarkLabel,
    },

    /// Keypad digit
    Dtmf {
        dtmf: DtmfDigit,
    },

    /// Stream stopped
    Stop,

    /// Any event this bridge does not know about
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    /// Decode one text frame from the telephony socket.
    pub fn decode(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::malformed(Peer::Telephony, e))
    }
}

/// Metadata carried by the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamStart {
    /// Stream identifier used to tag every outbound event
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    /// Call identifier
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    /// Account identifier
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
    /// Tracks being streamed
    #[serde(default)]
    pub tracks: Vec<String>,
    /// Parameters set with `<Parameter>` in the TwiML
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
    /// Audio format of the stream
    #[serde(rename = "mediaFormat", default)]
    pub media_format: Option<MediaFormat>,
}

/// Audio format announced in the `start` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaFormat {
    pub encoding: String,
    #[serde(rename = "sampleRate")]
    pub sample_rate: u32,
    pub channels: u16,
}

/// Caller audio carried by the `media` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Base64 μ-law audio
    pub payload: String,
    /// Offset from stream start in ms (sent as a string)
    #[serde(deserialize_with = "deserialize_millis")]
    pub timestamp: u64,
    /// Track (inbound/outbound)
    #[serde(default)]
    pub track: Option<String>,
    /// Chunk sequence number
    #[serde(default)]
    pub chunk: Option<String>,
}

/// Mark name, used both inbound and outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkLabel {
    pub name: String,
}

/// DTMF digit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DtmfDigit {
    pub digit: String,
    #[serde(default)]
    pub track: Option<String>,
}

/// Twilio sends numeric fields as JSON strings; accept either form.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Number(u64),
        Text(String),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Number(n) => Ok(n),
        Millis::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Outbound Events (bridge -> Twilio)
// =============================================================================

/// Events sent on the telephony socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyCommand {
    /// Audio to play to the caller
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Playback acknowledgement request
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },

    /// Drop buffered audio
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

/// Outbound audio payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    /// Base64 μ-law audio
    pub payload: String,
}

impl TelephonyCommand {
    pub fn media(stream_sid: &str, payload: String) -> Self {
        Self::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: &str, name: impl Into<String>) -> Self {
        Self::Mark {
            stream_sid: stream_sid.to_string(),
            mark: MarkLabel { name: name.into() },
        }
    }

    pub fn clear(stream_sid: &str) -> Self {
        Self::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
