//! Transport-agnostic duplex channel of JSON text frames.
//!
//! The telephony leg arrives as an axum `WebSocket` and the model leg as a
//! tokio-tungstenite client stream. Both are reduced to a boxed
//! `Sink<String>` + `Stream<Item = Result<String, BridgeError>>` pair so the
//! bridge never sees either websocket type, and tests can drive it with
//! in-memory channels.

use std::pin::Pin;

use futures::{Sink, Stream};

use crate::core::bridge::BridgeError;

/// Outbound half of a channel.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = BridgeError> + Send>>;

/// Inbound half of a channel. The stream ending means the peer went away.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, BridgeError>> + Send>>;

/// A duplex text-frame channel to one call leg.
pub struct Channel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Channel {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<String, Error = BridgeError> + Send + 'static,
        St: Stream<Item = Result<String, BridgeError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Split into the owned halves.
    pub fn into_parts(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}
