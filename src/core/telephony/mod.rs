//! Telephony call leg (Twilio Media Streams).
//!
//! Twilio streams caller audio as 8 kHz G.711 μ-law, base64 encoded inside
//! JSON events, and plays back audio sent in the same format.

pub mod messages;

pub use messages::{
    DtmfDigit, MarkLabel, MediaFormat, MediaPayload, OutboundMedia, StreamStart,
    TelephonyCommand, TelephonyEvent,
};
