//! Twilio voice webhook.
//!
//! Twilio requests this endpoint when a call comes in. The TwiML response
//! plays a short intro and then connects the call audio to the
//! `/media-stream` WebSocket.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::state::AppState;

/// Build the TwiML document that connects a call to the media stream.
pub fn connect_stream_twiml(intro_message: &str, stream_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Say>{}</Say>\
         <Pause length=\"1\"/>\
         <Connect><Stream url=\"{}\"/></Connect>\
         </Response>",
        xml_escape(intro_message),
        xml_escape(stream_url)
    )
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Incoming call handler (`GET`/`POST /incoming-call`)
pub async fn incoming_call_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let request_host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());

    let Some(stream_url) = state.config.media_stream_url(request_host) else {
        warn!("Incoming call without a Host header and no public host configured");
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    info!(%stream_url, "Incoming call, connecting media stream");

    (
        [(header::CONTENT_TYPE, "application/xml")],
        connect_stream_twiml(&state.config.intro_message, &stream_url),
    )
        .into_response()
}
