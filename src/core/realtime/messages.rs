//! OpenAI Realtime API WebSocket message types.
//!
//! This module defines the client and server event types the call bridge
//! exchanges with the Realtime API. All events are JSON-encoded and sent
//! over WebSocket.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure the session (handshake)
//! - input_audio_buffer.append - Append caller audio to buffer
//! - conversation.item.create - Add item to conversation (greeting seed)
//! - conversation.item.truncate - Cut an assistant item at the played position
//! - response.create - Generate a response
//!
//! Server events (received from server):
//! - session.created / session.updated - Session lifecycle
//! - input_audio_buffer.speech_started - Caller started talking
//! - input_audio_buffer.speech_stopped - Caller stopped talking
//! - input_audio_buffer.committed - Audio buffer committed
//! - conversation.item.input_audio_transcription.completed - Caller transcript
//! - response.created - Response generation started
//! - response.audio.delta - Audio data chunk
//! - response.audio_transcript.done - Assistant transcript complete
//! - response.done - Response complete
//! - rate_limits.updated - Rate limit information
//! - error - Error occurred
//!
//! Anything else decodes to [`ServerEvent::Unknown`].

use serde::{Deserialize, Serialize};

use crate::core::audio::AudioFrame;
use crate::core::bridge::{BridgeError, Peer};

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Voice for audio output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDef>>,

    /// Tool choice strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Audio prefix padding in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration in ms
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Whether to create response on turn end
        #[serde(skip_serializing_if = "Option::is_none")]
        create_response: Option<bool>,
        /// Whether to interrupt on speech
        #[serde(skip_serializing_if = "Option::is_none")]
        interrupt_response: Option<bool>,
    },
}

/// Tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Function parameters JSON schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type (message, function_call, function_call_output)
    #[serde(rename = "type")]
    pub item_type: String,
    /// Item role (user, assistant, system)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    /// Function name for function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Call ID for function call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ConversationItem {
    /// A user text message, used to seed an assistant greeting.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                content_type: "input_text".to_string(),
                text: Some(text.into()),
                transcript: None,
            }]),
            name: None,
            call_id: None,
        }
    }
}

/// Content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    /// Content type (input_text, input_audio, text, audio)
    #[serde(rename = "type")]
    pub content_type: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Transcript of audio content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
    },

    /// Truncate a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item ID
        item_id: String,
        /// Content index
        content_index: u32,
        /// Audio end in ms
        audio_end_ms: u64,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Create an audio append event from a caller frame.
    pub fn audio_append(frame: &AudioFrame) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: frame.to_base64(),
        }
    }

    /// Truncate the first content part of an assistant item.
    pub fn truncate(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        ClientEvent::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index: 0,
            audio_end_ms,
        }
    }

    /// Event type for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ConversationItemTruncate { .. } => "conversation.item.truncate",
            Self::ResponseCreate => "response.create",
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ApiError,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session information
        session: Session,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session information
        session: Session,
    },

    /// Speech started (VAD detected speech)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        #[serde(default)]
        audio_start_ms: u64,
        /// Item ID
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Speech stopped (VAD detected silence)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        #[serde(default)]
        audio_end_ms: u64,
    },

    /// Audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// New item ID
        item_id: String,
    },

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Item ID
        item_id: String,
        /// Transcript text
        transcript: String,
    },

    /// Response created
    #[serde(rename = "response.created")]
    ResponseCreated {
        /// Response information
        response: Response,
    },

    /// Audio delta (audio data chunk)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Item ID
        item_id: String,
        /// Base64-encoded audio delta
        delta: String,
    },

    /// Audio transcript done
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Item ID
        item_id: String,
        /// Full transcript
        transcript: String,
    },

    /// Response done
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Response information
        response: Response,
    },

    /// Rate limits updated
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        /// Rate limit information
        rate_limits: Vec<RateLimit>,
    },

    /// Any event the bridge does not act on
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode one text frame from the model socket.
    pub fn decode(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text).map_err(|e| BridgeError::malformed(Peer::Model, e))
    }

    /// Read the `type` field without decoding the whole event.
    pub fn peek_type(text: &str) -> Option<String> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(rename = "type")]
            event_type: String,
        }

        serde_json::from_str::<Envelope>(text)
            .ok()
            .map(|e| e.event_type)
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// API error information.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// Event ID that caused the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl From<ApiError> for BridgeError {
    fn from(error: ApiError) -> Self {
        BridgeError::UpstreamProtocol {
            code: error.code.unwrap_or(error.error_type),
            message: error.message,
        }
    }
}

/// Session information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    /// Session ID
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Voice
    #[serde(default)]
    pub voice: Option<String>,
}

/// Response information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    /// Response ID
    pub id: String,
    /// Response status (completed, cancelled, failed, incomplete)
    #[serde(default)]
    pub status: Option<String>,
    /// Output items
    #[serde(default)]
    pub output: Vec<ConversationItem>,
}

impl Response {
    /// Concatenated transcript of the assistant audio in this response.
    pub fn transcript(&self) -> String {
        self.output
            .iter()
            .filter(|item| item.item_type == "message")
            .flat_map(|item| item.content.iter().flatten())
            .filter_map(|part| part.transcript.as_deref().or(part.text.as_deref()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Names of the functions the model called in this response.
    pub fn function_calls(&self) -> Vec<String> {
        self.output
            .iter()
            .filter(|item| item.item_type == "function_call")
            .filter_map(|item| item.name.clone())
            .collect()
    }
}

/// Rate limit information.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RateLimit {
    /// Rate limit name
    pub name: String,
    /// Limit value
    pub limit: u32,
    /// Remaining value
    pub remaining: u32,
    /// Reset timestamp
    pub reset_seconds: f64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_audio_append() {
        let frame = AudioFrame {
            data: Bytes::from_static(&[0xff, 0xff, 0x00]),
            timestamp_ms: Some(20),
        };
        let json = serde_json::to_value(ClientEvent::audio_append(&frame)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "input_audio_buffer.append", "audio": "//8A"})
        );
    }

    #[test]
    fn test_truncate_serialization() {
        let json = serde_json::to_value(ClientEvent::truncate("item_X", 400)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "conversation.item.truncate",
                "item_id": "item_X",
                "content_index": 0,
                "audio_end_ms": 400
            })
        );
    }

    #[test]
    fn test_greeting_seed_serialization() {
        let event = ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text("Greet the caller."),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("conversation.item.create"));
        assert!(json.contains("input_text"));
        assert!(!json.contains("call_id"));

        let json = serde_json::to_string(&ClientEvent::ResponseCreate).unwrap();
        assert_eq!(json, r#"{"type":"response.create"}"#);
    }

    #[test]
    fn test_error_event_deserialization() {
        let json = r#"{
            "type": "error",
            "event_id": "evt_1",
            "error": {
                "type": "invalid_request_error",
                "code": "invalid_value",
                "message": "Test error"
            }
        }"#;
        let event = ServerEvent::decode(json).unwrap();
        match event {
            ServerEvent::Error { error } => {
                let err: BridgeError = error.into();
                assert_eq!(
                    err.to_string(),
                    "Upstream protocol error (invalid_value): Test error"
                );
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_audio_delta_deserialization() {
        let json = r#"{"type":"response.audio.delta","event_id":"e1","response_id":"resp_1","item_id":"item_X","output_index":0,"content_index":0,"delta":"//8A"}"#;
        match ServerEvent::decode(json).unwrap() {
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                assert_eq!(item_id, "item_X");
                assert_eq!(AudioFrame::from_base64(&delta).unwrap().data.len(), 3);
            }
            other => panic!("Wrong event type: {other:?}"),
        }
    }

    #[test]
    fn test_response_done_transcript_and_function_calls() {
        let json = r#"{
            "type": "response.done",
            "response": {
                "id": "resp_1",
                "object": "realtime.response",
                "status": "completed",
                "output": [
                    {
                        "id": "item_1",
                        "type": "message",
                        "role": "assistant",
                        "content": [{"type": "audio", "transcript": "Goodbye! [END_CALL]"}]
                    },
                    {
                        "id": "item_2",
                        "type": "function_call",
                        "name": "end_call",
                        "call_id": "call_1",
                        "arguments": "{}"
                    }
                ]
            }
        }"#;
        match ServerEvent::decode(json).unwrap() {
            ServerEvent::ResponseDone { response } => {
                assert_eq!(response.transcript(), "Goodbye! [END_CALL]");
                assert_eq!(response.function_calls(), vec!["end_call".to_string()]);
            }
            other => panic!("Wrong event type: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_type() {
        let json = r#"{"type":"response.content_part.added","item_id":"x"}"#;
        assert_eq!(ServerEvent::decode(json).unwrap(), ServerEvent::Unknown);
        assert_eq!(
            ServerEvent::peek_type(json).as_deref(),
            Some("response.content_part.added")
        );
    }

    #[test]
    fn test_malformed_server_event() {
        let err = ServerEvent::decode(r#"{"type":"response.audio.delta","delta":"AA"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MalformedEvent {
                peer: Peer::Model,
                ..
            }
        ));
        assert!(ServerEvent::peek_type("[]").is_none());
    }
}
