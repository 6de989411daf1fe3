//! Configuration module for the call bridge server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use call_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod validation;
mod yaml;

pub use validation::TEMPERATURE_RANGE;
pub use yaml::YamlConfig;

use crate::core::bridge::BridgeOptions;
use crate::core::realtime::{
    OpenAIRealtimeModel, OpenAIRealtimeVoice, RealtimeConfig, SessionSettings,
};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Spoken to the caller before the media stream connects.
pub const DEFAULT_INTRO_MESSAGE: &str =
    "Please wait while we connect your call to the voice assistant.";

/// Server configuration
///
/// Contains all configuration needed to run the bridge server:
/// - Server settings (host, port, public host for the stream URL)
/// - OpenAI Realtime connection settings
/// - Assistant prompt and greeting
/// - Per-call bridge behaviour (hangup signal, diagnostics)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Host name used in the `<Stream>` URL; the request `Host` header when unset
    pub public_host: Option<String>,

    // OpenAI Realtime settings
    pub openai_api_key: Option<String>,
    pub realtime_url: String,
    pub realtime_model: OpenAIRealtimeModel,
    pub voice: OpenAIRealtimeVoice,
    pub temperature: f32,

    // Assistant settings
    /// System instructions; a built-in prompt is used when unset
    pub instructions: Option<String>,
    /// Prompt that makes the assistant speak first
    pub greeting: Option<String>,
    pub intro_message: String,

    // Call settings
    pub end_call_sentinel: String,
    pub end_call_tool: bool,
    pub hangup_grace_ms: u64,
    pub show_timing_math: bool,
    pub log_event_types: Vec<String>,
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The `.env` file is loaded in `main.rs` before this is called.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL Twilio should stream the call to.
    ///
    /// Uses `public_host` when configured, otherwise the host the webhook
    /// request arrived on. Returns `None` when neither is known.
    pub fn media_stream_url(&self, request_host: Option<&str>) -> Option<String> {
        let host = self.public_host.as_deref().or(request_host)?;
        Some(format!("wss://{host}/media-stream"))
    }

    /// System instructions for the model.
    pub fn instructions(&self) -> String {
        match &self.instructions {
            Some(instructions) => instructions.clone(),
            None => default_instructions(&self.end_call_sentinel),
        }
    }

    /// Connection settings for the realtime model.
    pub fn realtime_config(&self) -> RealtimeConfig {
        let mut config = RealtimeConfig::new(self.openai_api_key.clone().unwrap_or_default());
        config.url = self.realtime_url.clone();
        config.model = self.realtime_model;
        config
    }

    /// Options applied to every bridged call.
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            session: SessionSettings {
                voice: self.voice,
                temperature: self.temperature,
                end_call_tool: self.end_call_tool,
                ..SessionSettings::default()
            },
            greeting: self.greeting.clone(),
            end_call_sentinel: self.end_call_sentinel.clone(),
            hangup_grace: Duration::from_millis(self.hangup_grace_ms),
            show_timing_math: self.show_timing_math,
            log_event_types: self.log_event_types.clone(),
            ..BridgeOptions::default()
        }
    }
}

fn default_instructions(sentinel: &str) -> String {
    format!(
        "You are a helpful and friendly voice assistant answering a phone call. \
         Keep your answers short and conversational. \
         When the caller is done, say goodbye and end your final sentence with {sentinel}"
    )
}
