//! Assistant-initiated hangup.
//!
//! After each completed assistant turn the configured detectors decide
//! whether the assistant ended the call. A positive decision arms a one-shot
//! [`HangupTimer`]; when it fires both sockets are closed.

use std::time::Duration;

use tokio::time::Instant;

use crate::core::realtime::messages::Response;

/// Default end-of-call marker the assistant is instructed to say.
pub const DEFAULT_END_CALL_SENTINEL: &str = "[END_CALL]";

/// Default time between the hangup decision and closing the sockets.
pub const DEFAULT_HANGUP_GRACE: Duration = Duration::from_secs(5);

/// What the assistant produced in one completed turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    pub response_id: String,
    pub transcript: String,
    pub function_calls: Vec<String>,
}

impl From<&Response> for TurnSummary {
    fn from(response: &Response) -> Self {
        Self {
            response_id: response.id.clone(),
            transcript: response.transcript(),
            function_calls: response.function_calls(),
        }
    }
}

/// Decides whether a completed turn ends the call.
pub trait TerminationDetector: Send + Sync {
    fn should_hang_up(&self, turn: &TurnSummary) -> bool;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

/// Hangs up when the transcript contains a marker string.
#[derive(Debug, Clone)]
pub struct SentinelDetector {
    sentinel: String,
}

impl SentinelDetector {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }
}

impl Default for SentinelDetector {
    fn default() -> Self {
        Self::new(DEFAULT_END_CALL_SENTINEL)
    }
}

impl TerminationDetector for SentinelDetector {
    fn should_hang_up(&self, turn: &TurnSummary) -> bool {
        !self.sentinel.is_empty() && turn.transcript.contains(&self.sentinel)
    }

    fn name(&self) -> &'static str {
        "sentinel"
    }
}

/// Hangs up when the model calls the end-call function.
#[derive(Debug, Clone)]
pub struct EndCallToolDetector {
    function_name: String,
}

impl EndCallToolDetector {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
        }
    }
}

impl TerminationDetector for EndCallToolDetector {
    fn should_hang_up(&self, turn: &TurnSummary) -> bool {
        turn.function_calls.iter().any(|f| *f == self.function_name)
    }

    fn name(&self) -> &'static str {
        "end_call_tool"
    }
}

/// One-shot hangup deadline.
#[derive(Debug, Default)]
pub struct HangupTimer {
    deadline: Option<Instant>,
}

impl HangupTimer {
    /// Arm the timer. Returns `false` if a hangup is already scheduled.
    pub fn schedule(&mut self, grace: Duration) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(Instant::now() + grace);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves at the deadline; pending forever while unarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}
