//! Barge-in handling.
//!
//! When the caller starts talking over the assistant, the in-flight
//! assistant item is truncated upstream at the point the caller actually
//! heard, and the telephony leg is told to drop any audio still buffered.
//!
//! ```text
//!            first audio delta
//!   Idle ─────────────────────────► Speaking
//!    ▲                                 │
//!    │ response.done, played out       │ speech_started
//!    ├─────────────────────────────────┤
//!    │                                 ▼
//!    └──────────────────────────── Interrupting
//!          truncate + clear queued
//! ```

use tracing::{debug, info};

use super::session::CallSession;

/// Interruption controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptionState {
    /// No assistant utterance in flight
    #[default]
    Idle,
    /// Assistant audio is being played to the caller
    Speaking,
    /// A truncation is being issued
    Interrupting,
}

/// Where to cut the interrupted assistant item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    pub item_id: String,
    pub audio_end_ms: u64,
}

/// Milliseconds of assistant audio the caller heard before interrupting.
///
/// Clamped to zero if the offsets arrive out of order.
pub fn played_ms(latest_media_timestamp_ms: u64, response_start_timestamp_ms: u64) -> u64 {
    latest_media_timestamp_ms.saturating_sub(response_start_timestamp_ms)
}

#[derive(Debug, Default)]
pub struct InterruptionController {
    state: InterruptionState,
    show_timing_math: bool,
}

impl InterruptionController {
    pub fn new(show_timing_math: bool) -> Self {
        Self {
            state: InterruptionState::Idle,
            show_timing_math,
        }
    }

    pub fn state(&self) -> InterruptionState {
        self.state
    }

    /// An assistant audio delta is about to be forwarded.
    pub fn on_audio_delta(&mut self, session: &mut CallSession, item_id: &str) {
        if session.note_assistant_audio(item_id) {
            debug!(
                item_id,
                response_start_ms = session.response_start_timestamp_ms(),
                "Assistant utterance started"
            );
        }
        self.state = InterruptionState::Speaking;
    }

    /// The caller started speaking.
    ///
    /// Returns the truncation to send upstream, or `None` when no assistant
    /// audio is in flight. Session state is cleared before returning so a
    /// second call is a no-op.
    pub fn on_speech_started(&mut self, session: &mut CallSession) -> Option<Truncation> {
        let Some(interrupted) = session.interrupt_utterance() else {
            self.state = InterruptionState::Idle;
            return None;
        };
        self.state = InterruptionState::Interrupting;

        let latest = interrupted.latest_media_timestamp_ms;
        let start = interrupted.response_start_timestamp_ms.unwrap_or(latest);
        let audio_end_ms = played_ms(latest, start);

        if self.show_timing_math {
            info!(
                "Calculating elapsed time for truncation: {} - {} = {}ms",
                latest, start, audio_end_ms
            );
        }

        self.state = InterruptionState::Idle;
        Some(Truncation {
            item_id: interrupted.item_id,
            audio_end_ms,
        })
    }

    /// The assistant finished its response.
    ///
    /// Audio the caller has not heard yet can still be interrupted, so the
    /// controller keeps speaking until the last mark for it comes back.
    pub fn on_turn_completed(&mut self, session: &mut CallSession) {
        if session.finish_utterance() {
            self.state = InterruptionState::Idle;
        }
    }
}
