//! Call bridge between a telephony leg and a realtime speech model.
//!
//! One call runs as four tasks: a read loop per socket and a writer task
//! per socket. The read loops share a [`CallSession`] behind a mutex and
//! stop together through a single [`Teardown`].
//!
//! ```text
//!  telephony ──► telephony loop ──(append)──► model writer ──► model
//!      ▲                                                         │
//!      └── telephony writer ◄──(media/mark/clear)── model loop ◄─┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use call_bridge::core::bridge::run_call_bridge;
//!
//! let outcome = run_call_bridge(telephony, model, "You are a helpful assistant.").await?;
//! println!("call ended: {outcome}");
//! ```

mod error;
mod interruption;
mod model_adapter;
mod session;
mod telephony_adapter;
mod teardown;
mod termination;
mod writer;

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

pub use error::{BridgeError, BridgeResult, CallOutcome, Peer};
pub use interruption::{InterruptionController, InterruptionState, Truncation, played_ms};
pub use model_adapter::{ModelActions, ModelAdapter};
pub use session::{CallSession, InterruptedUtterance, MARK_NAME, SharedSession};
pub use telephony_adapter::{TelephonyAction, TelephonyAdapter};
pub use teardown::Teardown;
pub use termination::{
    DEFAULT_END_CALL_SENTINEL, DEFAULT_HANGUP_GRACE, EndCallToolDetector, HangupTimer,
    SentinelDetector, TerminationDetector, TurnSummary,
};

use crate::core::channel::{Channel, FrameSink};
use crate::core::realtime::messages::{ClientEvent, ConversationItem};
use crate::core::realtime::{END_CALL_TOOL_NAME, SessionSettings};

/// Model event types logged at info level by default.
pub const DEFAULT_LOG_EVENT_TYPES: &[&str] = &[
    "error",
    "response.content.done",
    "rate_limits.updated",
    "response.done",
    "input_audio_buffer.committed",
    "input_audio_buffer.speech_stopped",
    "input_audio_buffer.speech_started",
    "session.created",
];

/// Capacity of each per-socket outbound queue.
const QUEUE_CAPACITY: usize = 1024;

/// Per-call behaviour that does not depend on the caller.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Session settings sent in the handshake
    pub session: SessionSettings,
    /// Prompt that makes the assistant speak first
    pub greeting: Option<String>,
    /// End-of-call marker in the assistant transcript
    pub end_call_sentinel: String,
    /// Delay between the hangup decision and closing the sockets
    pub hangup_grace: Duration,
    /// Log the truncation arithmetic
    pub show_timing_math: bool,
    /// Model event types logged at info level
    pub log_event_types: Vec<String>,
    /// Capacity of each outbound socket queue
    pub queue_capacity: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            greeting: None,
            end_call_sentinel: DEFAULT_END_CALL_SENTINEL.to_string(),
            hangup_grace: DEFAULT_HANGUP_GRACE,
            show_timing_math: false,
            log_event_types: DEFAULT_LOG_EVENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            queue_capacity: QUEUE_CAPACITY,
        }
    }
}

impl BridgeOptions {
    fn detectors(&self) -> Vec<Box<dyn TerminationDetector>> {
        let mut detectors: Vec<Box<dyn TerminationDetector>> =
            vec![Box::new(SentinelDetector::new(self.end_call_sentinel.clone()))];
        if self.session.end_call_tool {
            detectors.push(Box::new(EndCallToolDetector::new(END_CALL_TOOL_NAME)));
        }
        detectors
    }
}

/// Bridges calls using a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct CallBridge {
    options: BridgeOptions,
}

impl CallBridge {
    pub fn new(options: BridgeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Run one call until it ends.
    ///
    /// Returns how the call finished, or the error that ended it. Both
    /// sockets are closed when this returns.
    pub async fn run(
        &self,
        telephony: Channel,
        model: Channel,
        instructions: &str,
    ) -> BridgeResult<CallOutcome> {
        let call_id = Uuid::new_v4();
        let span = info_span!("call", %call_id);
        self.run_call(telephony, model, instructions)
            .instrument(span)
            .await
    }

    async fn run_call(
        &self,
        telephony: Channel,
        model: Channel,
        instructions: &str,
    ) -> BridgeResult<CallOutcome> {
        let (mut telephony_sink, telephony_stream) = telephony.into_parts();
        let (mut model_sink, model_stream) = model.into_parts();

        if let Err(e) = self.handshake(&mut model_sink, instructions).await {
            error!(error = %e, "Model session handshake failed");
            let _ = model_sink.close().await;
            let _ = telephony_sink.close().await;
            return Err(e);
        }
        info!("Call bridge started");

        let teardown = Arc::new(Teardown::new());
        let session = CallSession::shared();
        let (model_tx, model_rx) = mpsc::channel::<ClientEvent>(self.options.queue_capacity);
        let (telephony_tx, telephony_rx) =
            mpsc::channel(self.options.queue_capacity);

        let model_writer = writer::spawn_writer(Peer::Model, model_sink, model_rx, teardown.clone());
        let telephony_writer =
            writer::spawn_writer(Peer::Telephony, telephony_sink, telephony_rx, teardown.clone());

        let telephony_reader = tokio::spawn(
            telephony_adapter::run_telephony_loop(
                telephony_stream,
                TelephonyAdapter::new(session.clone()),
                model_tx.clone(),
                teardown.clone(),
            )
            .in_current_span(),
        );

        let adapter = ModelAdapter::new(
            session,
            InterruptionController::new(self.options.show_timing_math),
            self.options.detectors(),
        )
        .with_log_event_types(self.options.log_event_types.iter().cloned());
        let model_reader = tokio::spawn(
            model_adapter::run_model_loop(
                model_stream,
                adapter,
                model_tx,
                telephony_tx,
                teardown.clone(),
                self.options.hangup_grace,
            )
            .in_current_span(),
        );

        let (telephony_reader, model_reader, model_writer, telephony_writer) =
            tokio::join!(telephony_reader, model_reader, model_writer, telephony_writer);
        for (task, result) in [
            ("telephony reader", telephony_reader),
            ("model reader", model_reader),
            ("model writer", model_writer),
            ("telephony writer", telephony_writer),
        ] {
            if let Err(e) = result {
                error!(task, "Bridge task failed: {}", e);
            }
        }

        let result = teardown.take_result();
        match &result {
            Ok(outcome) => info!(%outcome, "Call ended"),
            Err(e) => error!(error = %e, "Call ended with error"),
        }
        result
    }

    /// Configure the model session, then seed the greeting if one is set.
    async fn handshake(&self, model_sink: &mut FrameSink, instructions: &str) -> BridgeResult<()> {
        let mut events = vec![ClientEvent::SessionUpdate {
            session: self.options.session.build_session_config(instructions),
        }];
        if let Some(greeting) = &self.options.greeting {
            events.push(ClientEvent::ConversationItemCreate {
                item: ConversationItem::user_text(greeting.clone()),
            });
            events.push(ClientEvent::ResponseCreate);
        }

        for event in events {
            let text = serde_json::to_string(&event).map_err(|e| {
                BridgeError::Configuration(format!("failed to encode {}: {e}", event.name()))
            })?;
            model_sink.send(text).await.map_err(|e| {
                BridgeError::Configuration(format!("failed to send {}: {e}", event.name()))
            })?;
            debug!(event_type = event.name(), "Sent handshake event");
        }
        Ok(())
    }
}

/// Run one call with default options.
pub async fn run_call_bridge(
    telephony: Channel,
    model: Channel,
    instructions: &str,
) -> BridgeResult<CallOutcome> {
    CallBridge::default().run(telephony, model, instructions).await
}
