//! Error and outcome types for the call bridge.

use std::fmt;

use thiserror::Error;

/// Which side of the bridge an error or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peer {
    /// The telephony call leg (Twilio Media Stream)
    Telephony,
    /// The upstream speech model (OpenAI Realtime)
    Model,
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telephony => write!(f, "telephony"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// Errors that can occur while bridging a call.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A socket closed underneath the bridge
    #[error("{peer} transport closed")]
    TransportClosed { peer: Peer },

    /// A socket failed with an I/O or protocol error
    #[error("{peer} transport error: {message}")]
    Transport { peer: Peer, message: String },

    /// The speech model reported an error event
    #[error("Upstream protocol error ({code}): {message}")]
    UpstreamProtocol { code: String, message: String },

    /// A received event could not be decoded
    #[error("Malformed {peer} event: {reason}")]
    MalformedEvent { peer: Peer, reason: String },

    /// The session handshake failed or the model connection could not be set up
    #[error("Configuration failure: {0}")]
    Configuration(String),
}

impl BridgeError {
    /// Wrap a transport-level error from either websocket implementation.
    pub fn transport(peer: Peer, err: impl fmt::Display) -> Self {
        Self::Transport {
            peer,
            message: err.to_string(),
        }
    }

    pub fn malformed(peer: Peer, reason: impl fmt::Display) -> Self {
        Self::MalformedEvent {
            peer,
            reason: reason.to_string(),
        }
    }

    /// Whether the bridge can keep running after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedEvent { .. })
    }
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// How a call that ended without an error finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The telephony leg sent a stop event
    CallerHangup,
    /// The telephony socket dropped without a stop event
    CallerDisconnected,
    /// The assistant signalled the end of the call
    AssistantHangup,
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallerHangup => write!(f, "caller_hangup"),
            Self::CallerDisconnected => write!(f, "caller_disconnected"),
            Self::AssistantHangup => write!(f, "assistant_hangup"),
        }
    }
}
