//! Speech-model call leg (OpenAI Realtime API).
//!
//! # Audio Format
//!
//! The session is configured for G.711 μ-law at 8 kHz in both directions so
//! audio passes between the telephony leg and the model without transcoding.

mod client;
mod config;
pub mod messages;

pub use client::{ModelConnector, OpenAIRealtimeConnector};
pub use config::{
    DEFAULT_TRANSCRIPTION_MODEL, END_CALL_TOOL_NAME, OPENAI_REALTIME_URL, OpenAIRealtimeModel,
    OpenAIRealtimeVoice, RealtimeConfig, SessionSettings, TELEPHONY_AUDIO_FORMAT,
};
pub use messages::{ClientEvent, ServerEvent, SessionConfig};
