//! OpenAI Realtime API configuration types.
//!
//! This module contains configuration types for OpenAI's Realtime API:
//! - Connection settings (endpoint, model, credentials)
//! - Voice selection
//! - Turn detection and session settings sent in the `session.update` handshake

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::messages::{InputAudioTranscription, SessionConfig, ToolDef, TurnDetection};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Name of the function the model can call to hang up.
pub const END_CALL_TOOL_NAME: &str = "end_call";

/// Audio format of both directions. The telephony leg is fixed to 8 kHz
/// μ-law, so the model speaks it too and nothing is transcoded.
pub const TELEPHONY_AUDIO_FORMAT: &str = "g711_ulaw";

/// Default transcription model for caller audio.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Models
// =============================================================================

/// Supported OpenAI Realtime models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeModel {
    /// GPT-4o Realtime Preview model
    #[default]
    #[serde(rename = "gpt-4o-realtime-preview")]
    Gpt4oRealtimePreview,
    /// GPT-4o Realtime Preview 2024-10-01
    #[serde(rename = "gpt-4o-realtime-preview-2024-10-01")]
    Gpt4oRealtimePreview20241001,
    /// GPT-4o Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-realtime-preview-2024-12-17")]
    Gpt4oRealtimePreview20241217,
    /// GPT-4o Realtime Preview 2025-06-03
    #[serde(rename = "gpt-4o-realtime-preview-2025-06-03")]
    Gpt4oRealtimePreview20250603,
    /// GPT-4o Mini Realtime Preview
    #[serde(rename = "gpt-4o-mini-realtime-preview")]
    Gpt4oMiniRealtimePreview,
    /// GPT-4o Mini Realtime Preview 2024-12-17
    #[serde(rename = "gpt-4o-mini-realtime-preview-2024-12-17")]
    Gpt4oMiniRealtimePreview20241217,
    /// GPT Realtime (general availability)
    #[serde(rename = "gpt-realtime")]
    GptRealtime,
    /// GPT Realtime Mini
    #[serde(rename = "gpt-realtime-mini")]
    GptRealtimeMini,
}

impl OpenAIRealtimeModel {
    pub const ALL: &'static [Self] = &[
        Self::Gpt4oRealtimePreview,
        Self::Gpt4oRealtimePreview20241001,
        Self::Gpt4oRealtimePreview20241217,
        Self::Gpt4oRealtimePreview20250603,
        Self::Gpt4oMiniRealtimePreview,
        Self::Gpt4oMiniRealtimePreview20241217,
        Self::GptRealtime,
        Self::GptRealtimeMini,
    ];

    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oRealtimePreview => "gpt-4o-realtime-preview",
            Self::Gpt4oRealtimePreview20241001 => "gpt-4o-realtime-preview-2024-10-01",
            Self::Gpt4oRealtimePreview20241217 => "gpt-4o-realtime-preview-2024-12-17",
            Self::Gpt4oRealtimePreview20250603 => "gpt-4o-realtime-preview-2025-06-03",
            Self::Gpt4oMiniRealtimePreview => "gpt-4o-mini-realtime-preview",
            Self::Gpt4oMiniRealtimePreview20241217 => "gpt-4o-mini-realtime-preview-2024-12-17",
            Self::GptRealtime => "gpt-realtime",
            Self::GptRealtimeMini => "gpt-realtime-mini",
        }
    }
}

impl std::str::FromStr for OpenAIRealtimeModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == name)
            .ok_or_else(|| {
                format!(
                    "unknown realtime model '{s}', expected one of: {}",
                    join_names(Self::ALL.iter().map(Self::as_str))
                )
            })
    }
}

impl std::fmt::Display for OpenAIRealtimeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Voices
// =============================================================================

/// Available voices for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    Marin,
    Cedar,
}

impl OpenAIRealtimeVoice {
    pub const ALL: &'static [Self] = &[
        Self::Alloy,
        Self::Ash,
        Self::Ballad,
        Self::Coral,
        Self::Echo,
        Self::Sage,
        Self::Shimmer,
        Self::Verse,
        Self::Marin,
        Self::Cedar,
    ];

    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
            Self::Marin => "marin",
            Self::Cedar => "cedar",
        }
    }
}

impl std::str::FromStr for OpenAIRealtimeVoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|voice| voice.as_str() == name)
            .ok_or_else(|| {
                format!(
                    "unknown voice '{s}', expected one of: {}",
                    join_names(Self::ALL.iter().map(Self::as_str))
                )
            })
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

// =============================================================================
// Connection
// =============================================================================

/// Connection settings for the Realtime WebSocket.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,
    /// WebSocket endpoint, without the model query parameter
    pub url: String,
    /// Model to connect to
    pub model: OpenAIRealtimeModel,
}

impl RealtimeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: OPENAI_REALTIME_URL.to_string(),
            model: OpenAIRealtimeModel::default(),
        }
    }

    /// Build the WebSocket URL with model parameter.
    pub fn ws_url(&self) -> String {
        let base = if self.url.is_empty() {
            OPENAI_REALTIME_URL
        } else {
            self.url.as_str()
        };
        format!("{}?model={}", base, self.model.as_str())
    }
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish()
    }
}

impl Drop for RealtimeConfig {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

// =============================================================================
// Session
// =============================================================================

/// Session settings sent to the model in the `session.update` handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Output voice
    pub voice: OpenAIRealtimeVoice,
    /// Sampling temperature
    pub temperature: f32,
    /// Transcription model for caller audio (`None` disables transcription)
    pub transcription_model: Option<String>,
    /// Declare the `end_call` function to the model
    pub end_call_tool: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            voice: OpenAIRealtimeVoice::Alloy,
            temperature: 0.8,
            transcription_model: Some(DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            end_call_tool: false,
        }
    }
}

impl SessionSettings {
    /// Build the session configuration for the handshake.
    ///
    /// Turn detection is always server VAD: barge-in relies on the model's
    /// `input_audio_buffer.speech_started` events.
    pub fn build_session_config(&self, instructions: &str) -> SessionConfig {
        SessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: Some(instructions.to_string()),
            voice: Some(self.voice.as_str().to_string()),
            input_audio_format: Some(TELEPHONY_AUDIO_FORMAT.to_string()),
            output_audio_format: Some(TELEPHONY_AUDIO_FORMAT.to_string()),
            input_audio_transcription: self
                .transcription_model
                .as_ref()
                .map(|model| InputAudioTranscription {
                    model: model.clone(),
                }),
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: None,
                prefix_padding_ms: None,
                silence_duration_ms: None,
                create_response: None,
                interrupt_response: None,
            }),
            tools: self.end_call_tool.then(|| vec![end_call_tool()]),
            tool_choice: self.end_call_tool.then(|| "auto".to_string()),
            temperature: Some(self.temperature),
        }
    }
}

/// Tool declaration for the structured hangup signal.
fn end_call_tool() -> ToolDef {
    ToolDef {
        tool_type: "function".to_string(),
        name: END_CALL_TOOL_NAME.to_string(),
        description: Some(
            "End the phone call. Call this once the conversation is finished and you have said goodbye."
                .to_string(),
        ),
        parameters: Some(serde_json::json!({
            "type": "object",
            "properties": {},
        })),
    }
}

// =============================================================================
// Tests
// =============================================================================
