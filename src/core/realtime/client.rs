//! OpenAI Realtime API connection.
//!
//! Opens the authenticated WebSocket to the Realtime API and reduces it to a
//! [`Channel`] of JSON text frames. Everything above the socket (handshake,
//! event handling) lives in the bridge.
//!
//! # API Reference
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Headers: `Authorization: Bearer <key>`, `OpenAI-Beta: realtime=v1`
//! - Protocol: WebSocket with JSON events

use async_trait::async_trait;
use futures::future;
use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use super::config::RealtimeConfig;
use crate::core::bridge::{BridgeError, BridgeResult, Peer};
use crate::core::channel::Channel;

/// Opens a fresh connection to the speech model for one call.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    /// Connect and return the duplex text channel.
    ///
    /// Any failure here is a configuration failure: no audio has been
    /// relayed yet.
    async fn connect(&self) -> BridgeResult<Channel>;
}

/// Connector for the OpenAI Realtime WebSocket API.
#[derive(Debug, Clone)]
pub struct OpenAIRealtimeConnector {
    config: RealtimeConfig,
}

impl OpenAIRealtimeConnector {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }

    /// Build the upgrade request with authentication headers.
    pub fn build_request(&self) -> BridgeResult<Request> {
        let mut request = self
            .config
            .ws_url()
            .into_client_request()
            .map_err(|e| BridgeError::Configuration(format!("invalid realtime URL: {e}")))?;

        let auth = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|_| BridgeError::Configuration("API key is not a valid header value".into()))?;

        let headers = request.headers_mut();
        headers.insert(http::header::AUTHORIZATION, auth);
        headers.insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }
}

#[async_trait]
impl ModelConnector for OpenAIRealtimeConnector {
    async fn connect(&self) -> BridgeResult<Channel> {
        let request = self.build_request()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| {
                BridgeError::Configuration(format!("failed to connect to realtime model: {e}"))
            })?;

        tracing::info!(model = %self.config.model, "Connected to OpenAI Realtime API");

        let (ws_sink, ws_stream) = ws_stream.split();

        let sink = ws_sink
            .sink_map_err(|e| BridgeError::transport(Peer::Model, e))
            .with(|text: String| future::ready(Ok::<_, BridgeError>(Message::Text(text.into()))));

        // Only text frames carry events; control frames are handled by tungstenite.
        let stream = ws_stream.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Realtime API sent close frame");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(BridgeError::transport(Peer::Model, e))),
            })
        });

        Ok(Channel::new(sink, stream))
    }
}
