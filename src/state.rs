use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::bridge::CallBridge;
use crate::core::realtime::{ModelConnector, OpenAIRealtimeConnector};

/// Shared application state
///
/// Built once at startup; every call gets its own bridge tasks and model
/// connection from it.
pub struct AppState {
    pub config: ServerConfig,
    /// Bridge configured from `config`
    pub bridge: CallBridge,
    /// Opens the model connection for each call
    pub connector: Arc<dyn ModelConnector>,
}

impl AppState {
    /// Create state that connects calls to the OpenAI Realtime API.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let connector = Arc::new(OpenAIRealtimeConnector::new(config.realtime_config()));
        Self::with_connector(config, connector)
    }

    /// Create state with a custom model connector.
    pub fn with_connector(config: ServerConfig, connector: Arc<dyn ModelConnector>) -> Arc<Self> {
        let bridge = CallBridge::new(config.bridge_options());
        Arc::new(Self {
            config,
            bridge,
            connector,
        })
    }
}
