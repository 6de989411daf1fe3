//! Per-call state shared by the telephony and model adapters.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

/// Name given to every playback-acknowledgement mark.
pub const MARK_NAME: &str = "responsePart";

/// Session shared between the two adapter tasks of one call.
///
/// The lock is only taken inside synchronous event handlers and is never
/// held across an `.await`.
pub type SharedSession = Arc<Mutex<CallSession>>;

/// State of one active call.
#[derive(Debug, Default)]
pub struct CallSession {
    stream_id: Option<String>,
    latest_media_timestamp_ms: u64,
    last_assistant_item_id: Option<String>,
    response_start_timestamp_ms: Option<u64>,
    pending_marks: VecDeque<String>,
    truncated_items: HashSet<String>,
    /// The model finished the current utterance but the caller has not
    /// heard all of it yet.
    awaiting_playback: bool,
}

/// An assistant utterance cut short by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptedUtterance {
    pub item_id: String,
    pub response_start_timestamp_ms: Option<u64>,
    pub latest_media_timestamp_ms: u64,
}

impl CallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Bind the session to a telephony stream.
    ///
    /// Returns `false` if the session is already bound to a different
    /// stream, in which case nothing changes.
    pub fn start(&mut self, stream_id: &str) -> bool {
        if let Some(current) = &self.stream_id
            && current != stream_id
        {
            return false;
        }

        self.stream_id = Some(stream_id.to_string());
        self.latest_media_timestamp_ms = 0;
        self.clear_utterance();
        true
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    /// Record the offset of an inbound caller frame.
    ///
    /// The stored offset never decreases; returns `false` when the frame
    /// reported an offset older than one already seen.
    pub fn record_media(&mut self, timestamp_ms: u64) -> bool {
        if timestamp_ms < self.latest_media_timestamp_ms {
            return false;
        }
        self.latest_media_timestamp_ms = timestamp_ms;
        true
    }

    pub fn latest_media_timestamp_ms(&self) -> u64 {
        self.latest_media_timestamp_ms
    }

    pub fn last_assistant_item_id(&self) -> Option<&str> {
        self.last_assistant_item_id.as_deref()
    }

    pub fn response_start_timestamp_ms(&self) -> Option<u64> {
        self.response_start_timestamp_ms
    }

    /// Note an assistant audio delta for `item_id`.
    ///
    /// Returns `true` when the delta is the first of a new utterance, which
    /// pins `response_start_timestamp_ms` to the current caller offset.
    pub fn note_assistant_audio(&mut self, item_id: &str) -> bool {
        // A new item after a completed one that is still playing out starts
        // a fresh utterance.
        if self.awaiting_playback && self.last_assistant_item_id.as_deref() != Some(item_id) {
            self.clear_utterance();
        }

        let first = self.response_start_timestamp_ms.is_none();
        if first {
            self.response_start_timestamp_ms = Some(self.latest_media_timestamp_ms);
        }
        if self.last_assistant_item_id.as_deref() != Some(item_id) {
            self.last_assistant_item_id = Some(item_id.to_string());
        }
        first
    }

    /// The model finished the current utterance.
    ///
    /// The utterance stays interruptible until every mark sent for it has
    /// been acknowledged. Returns `true` when it was already fully played
    /// and has been cleared.
    pub fn finish_utterance(&mut self) -> bool {
        if self.pending_marks.is_empty() {
            self.clear_utterance();
            return true;
        }
        self.awaiting_playback = true;
        false
    }

    fn clear_utterance(&mut self) {
        self.last_assistant_item_id = None;
        self.response_start_timestamp_ms = None;
        self.awaiting_playback = false;
    }

    /// Cut the current utterance short.
    ///
    /// Clears the in-flight item, its start offset and all pending marks,
    /// and remembers the item so later deltas for it can be dropped.
    /// Returns `None` when no assistant audio is in flight.
    pub fn interrupt_utterance(&mut self) -> Option<InterruptedUtterance> {
        let item_id = self.last_assistant_item_id.take()?;
        let response_start_timestamp_ms = self.response_start_timestamp_ms.take();
        self.pending_marks.clear();
        self.awaiting_playback = false;
        self.truncated_items.insert(item_id.clone());

        Some(InterruptedUtterance {
            item_id,
            response_start_timestamp_ms,
            latest_media_timestamp_ms: self.latest_media_timestamp_ms,
        })
    }

    pub fn is_truncated(&self, item_id: &str) -> bool {
        self.truncated_items.contains(item_id)
    }

    /// Queue a playback mark for a frame about to be sent; returns its name.
    pub fn push_mark(&mut self) -> String {
        self.pending_marks.push_back(MARK_NAME.to_string());
        MARK_NAME.to_string()
    }

    /// Pop the oldest pending mark. A no-op on an empty queue.
    ///
    /// The ack that empties the queue after the model finished the
    /// utterance ends it.
    pub fn ack_mark(&mut self) -> Option<String> {
        let mark = self.pending_marks.pop_front()?;
        if self.pending_marks.is_empty() && self.awaiting_playback {
            self.clear_utterance();
        }
        Some(mark)
    }

    pub fn pending_marks(&self) -> usize {
        self.pending_marks.len()
    }
}
