//! Route configuration
//!
//! - `api` - health check and the Twilio voice webhook
//! - `media_stream` - the Twilio Media Stream WebSocket

pub mod api;
pub mod media_stream;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the full application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(media_stream::create_media_stream_router())
        .with_state(state)
}
