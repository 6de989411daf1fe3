//! Twilio Media Stream WebSocket handler
//!
//! Each accepted socket is one phone call: the handler opens a fresh model
//! connection and runs the call bridge until either side ends the call.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::future;
use futures::{SinkExt, StreamExt};
use tracing::{error, info};

use crate::core::bridge::{BridgeError, Peer};
use crate::core::channel::Channel;
use crate::state::AppState;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Media stream WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket for the Twilio Media Stream.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("Media stream connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_media_stream(socket, state))
}

/// Reduce an axum WebSocket to a text-frame channel.
pub fn telephony_channel(socket: WebSocket) -> Channel {
    let (sender, receiver) = socket.split();

    let sink = sender
        .sink_map_err(|e| BridgeError::transport(Peer::Telephony, e))
        .with(|text: String| future::ready(Ok::<_, BridgeError>(Message::Text(text.into()))));

    let stream = receiver.filter_map(|msg| {
        future::ready(match msg {
            Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
            Ok(_) => None,
            Err(e) => Some(Err(BridgeError::transport(Peer::Telephony, e))),
        })
    });

    Channel::new(sink, stream)
}

async fn handle_media_stream(socket: WebSocket, state: Arc<AppState>) {
    info!("Media stream connected");
    let telephony = telephony_channel(socket);

    let model = match state.connector.connect().await {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "Could not connect to the realtime model, closing call");
            let (mut sink, _) = telephony.into_parts();
            let _ = sink.close().await;
            return;
        }
    };

    let instructions = state.config.instructions();
    match state.bridge.run(telephony, model, &instructions).await {
        Ok(outcome) => info!(%outcome, "Media stream finished"),
        Err(e) => error!(error = %e, "Media stream finished with error"),
    }
}
