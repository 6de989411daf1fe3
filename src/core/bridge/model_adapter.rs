//! Model side of the bridge: assistant audio out, turn and error events.
//!
//! Every event bound for the telephony socket (media, mark, clear) is
//! produced here, so a `clear` can never overtake audio queued before it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::{BridgeError, BridgeResult, CallOutcome, Peer};
use super::interruption::InterruptionController;
use super::session::SharedSession;
use super::teardown::Teardown;
use super::termination::{HangupTimer, TerminationDetector, TurnSummary};
use crate::core::audio::AudioFrame;
use crate::core::channel::FrameStream;
use crate::core::realtime::messages::{ClientEvent, ServerEvent};
use crate::core::telephony::TelephonyCommand;

/// Outbound work produced by one model event.
#[derive(Debug, Default, PartialEq)]
pub struct ModelActions {
    pub to_model: Vec<ClientEvent>,
    pub to_telephony: Vec<TelephonyCommand>,
    /// The assistant ended the call
    pub hang_up: bool,
}

/// Applies model events to the call session.
pub struct ModelAdapter {
    session: SharedSession,
    interruption: InterruptionController,
    detectors: Vec<Box<dyn TerminationDetector>>,
    log_event_types: HashSet<String>,
    session_acknowledged: bool,
}

impl ModelAdapter {
    pub fn new(
        session: SharedSession,
        interruption: InterruptionController,
        detectors: Vec<Box<dyn TerminationDetector>>,
    ) -> Self {
        Self {
            session,
            interruption,
            detectors,
            log_event_types: HashSet::new(),
            session_acknowledged: false,
        }
    }

    /// Event types logged at info level when received.
    pub fn with_log_event_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.log_event_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Log a raw frame if its type is one of the configured event types.
    pub fn log_frame(&self, text: &str) {
        if self.log_event_types.is_empty() {
            return;
        }
        if let Some(event_type) = ServerEvent::peek_type(text)
            && self.log_event_types.contains(&event_type)
        {
            info!(event_type = %event_type, event = %text, "Received model event");
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent) -> BridgeResult<ModelActions> {
        let mut actions = ModelActions::default();

        match event {
            ServerEvent::Error { error } => {
                if !self.session_acknowledged {
                    return Err(BridgeError::Configuration(format!(
                        "session rejected by model: {}",
                        error.message
                    )));
                }
                return Err(error.into());
            }
            ServerEvent::SessionCreated { session } => {
                debug!(session_id = %session.id, "Model session created");
            }
            ServerEvent::SessionUpdated { session } => {
                self.session_acknowledged = true;
                info!(session_id = %session.id, voice = ?session.voice, "Model session configured");
            }
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                debug!(
                    audio_start_ms,
                    state = ?self.interruption.state(),
                    "Caller speech started"
                );
                let mut session = self.session.lock();
                if let Some(truncation) = self.interruption.on_speech_started(&mut session) {
                    info!(
                        item_id = %truncation.item_id,
                        audio_end_ms = truncation.audio_end_ms,
                        "Caller interrupted the assistant"
                    );
                    actions.to_model.push(ClientEvent::truncate(
                        truncation.item_id,
                        truncation.audio_end_ms,
                    ));
                    if let Some(stream_id) = session.stream_id() {
                        actions.to_telephony.push(TelephonyCommand::clear(stream_id));
                    }
                }
            }
            ServerEvent::AudioDelta { item_id, delta, .. } => {
                let frame = AudioFrame::from_base64(&delta)
                    .map_err(|e| BridgeError::malformed(Peer::Model, e))?;

                let mut session = self.session.lock();
                let Some(stream_id) = session.stream_id().map(str::to_owned) else {
                    debug!(%item_id, "Dropping assistant audio before stream start");
                    return Ok(actions);
                };
                if session.is_truncated(&item_id) {
                    debug!(%item_id, "Dropping audio for truncated item");
                    return Ok(actions);
                }

                self.interruption.on_audio_delta(&mut session, &item_id);
                let mark = session.push_mark();

                actions
                    .to_telephony
                    .push(TelephonyCommand::media(&stream_id, frame.to_base64()));
                actions
                    .to_telephony
                    .push(TelephonyCommand::mark(&stream_id, mark));
            }
            ServerEvent::ResponseDone { response } => {
                self.interruption.on_turn_completed(&mut self.session.lock());

                let turn = TurnSummary::from(&response);
                debug!(
                    response_id = %turn.response_id,
                    status = ?response.status,
                    transcript = %turn.transcript,
                    "Assistant turn completed"
                );

                if let Some(detector) = self.detectors.iter().find(|d| d.should_hang_up(&turn)) {
                    info!(detector = detector.name(), "Assistant ended the call");
                    actions.hang_up = true;
                }
            }
            ServerEvent::AudioTranscriptDone { item_id, transcript } => {
                info!(%item_id, %transcript, "Assistant said");
            }
            ServerEvent::TranscriptionCompleted { item_id, transcript } => {
                info!(%item_id, %transcript, "Caller said");
            }
            ServerEvent::SpeechStopped { audio_end_ms } => {
                debug!(audio_end_ms, "Caller speech stopped");
            }
            ServerEvent::InputAudioBufferCommitted { item_id } => {
                debug!(%item_id, "Caller audio committed");
            }
            ServerEvent::ResponseCreated { response } => {
                debug!(response_id = %response.id, "Assistant response started");
            }
            ServerEvent::RateLimitsUpdated { rate_limits } => {
                debug!(?rate_limits, "Rate limits updated");
            }
            ServerEvent::Unknown => {}
        }

        Ok(actions)
    }
}

/// Read loop for the model socket.
pub(crate) async fn run_model_loop(
    mut stream: FrameStream,
    mut adapter: ModelAdapter,
    model_tx: mpsc::Sender<ClientEvent>,
    telephony_tx: mpsc::Sender<TelephonyCommand>,
    teardown: Arc<Teardown>,
    hangup_grace: Duration,
) {
    let mut hangup = HangupTimer::default();

    loop {
        let frame = select! {
            biased;
            _ = teardown.cancelled() => break,
            _ = hangup.expired(), if hangup.is_armed() => {
                info!("Hangup grace period elapsed");
                teardown.finish(CallOutcome::AssistantHangup);
                break;
            }
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                teardown.transport_lost(Peer::Model, e);
                break;
            }
            None if hangup.is_armed() => {
                teardown.finish(CallOutcome::AssistantHangup);
                break;
            }
            None => {
                teardown.fail(BridgeError::TransportClosed { peer: Peer::Model });
                break;
            }
        };

        adapter.log_frame(&text);

        let actions = match ServerEvent::decode(&text).and_then(|event| adapter.handle_event(event)) {
            Ok(actions) => actions,
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Dropping model event");
                continue;
            }
            Err(e) => {
                error!(error = %e, "Model reported a fatal error");
                teardown.fail(e);
                break;
            }
        };

        for event in actions.to_model {
            if model_tx.send(event).await.is_err() {
                debug!("Model queue closed");
            }
        }
        for command in actions.to_telephony {
            if telephony_tx.send(command).await.is_err() {
                debug!("Telephony queue closed");
            }
        }

        if actions.hang_up && hangup.schedule(hangup_grace) {
            info!(
                grace_ms = hangup_grace.as_millis() as u64,
                "Hanging up after grace period"
            );
        }
    }

    debug!("Model read loop finished");
}
