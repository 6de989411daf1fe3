pub mod audio;
pub mod bridge;
pub mod channel;
pub mod realtime;
pub mod telephony;

// Re-export commonly used types for convenience
pub use audio::AudioFrame;

pub use bridge::{
    BridgeError, BridgeOptions, BridgeResult, CallBridge, CallOutcome, Peer, run_call_bridge,
};

pub use channel::{Channel, FrameSink, FrameStream};

pub use realtime::{ModelConnector, OpenAIRealtimeConnector, RealtimeConfig, SessionSettings};

pub use telephony::{TelephonyCommand, TelephonyEvent};
