//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `api` - Health check endpoint
//! - `incoming_call` - Twilio voice webhook returning TwiML
//! - `media_stream` - Twilio Media Stream WebSocket bridged to the realtime model

pub mod api;
pub mod incoming_call;
pub mod media_stream;

// Re-export commonly used handlers for convenient access
pub use api::health_check;
pub use incoming_call::incoming_call_handler;
pub use media_stream::media_stream_handler;
