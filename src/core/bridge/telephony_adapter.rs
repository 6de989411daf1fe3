//! Telephony side of the bridge: caller audio in, session lifecycle events.

use std::sync::Arc;

use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::error::{BridgeError, BridgeResult, CallOutcome, Peer};
use super::session::SharedSession;
use super::teardown::Teardown;
use crate::core::audio::AudioFrame;
use crate::core::channel::FrameStream;
use crate::core::realtime::messages::ClientEvent;
use crate::core::telephony::TelephonyEvent;

/// What the read loop should do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum TelephonyAction {
    Continue,
    /// Send caller audio upstream
    Forward(AudioFrame),
    /// The caller hung up
    Stop,
}

/// Applies telephony events to the call session.
#[derive(Debug, Clone)]
pub struct TelephonyAdapter {
    session: SharedSession,
}

impl TelephonyAdapter {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }

    pub fn handle_event(&self, event: TelephonyEvent) -> BridgeResult<TelephonyAction> {
        match event {
            TelephonyEvent::Connected { protocol } => {
                debug!(?protocol, "Telephony stream connected");
            }
            TelephonyEvent::Start { start } => {
                let mut session = self.session.lock();
                if session.start(&start.stream_sid) {
                    info!(
                        stream_id = %start.stream_sid,
                        call_sid = ?start.call_sid,
                        "Incoming stream has started"
                    );
                } else {
                    warn!(
                        stream_id = %start.stream_sid,
                        current = ?session.stream_id(),
                        "Ignoring start event for a different stream"
                    );
                }
            }
            TelephonyEvent::Media { media } => {
                let frame = AudioFrame::from_base64_at(&media.payload, media.timestamp)
                    .map_err(|e| BridgeError::malformed(Peer::Telephony, e))?;

                if !self.session.lock().record_media(media.timestamp) {
                    debug!(
                        timestamp_ms = media.timestamp,
                        "Caller frame offset went backwards"
                    );
                }
                return Ok(TelephonyAction::Forward(frame));
            }
            TelephonyEvent::Mark { mark } => {
                let mut session = self.session.lock();
                match session.ack_mark() {
                    None => debug!(mark = %mark.name, "Mark acknowledged with no pending marks"),
                    Some(_) if session.pending_marks() == 0 => {
                        debug!(mark = %mark.name, "Assistant audio fully played");
                    }
                    Some(_) => {}
                }
            }
            TelephonyEvent::Dtmf { dtmf } => {
                debug!(digit = %dtmf.digit, "Caller pressed a key");
            }
            TelephonyEvent::Stop => return Ok(TelephonyAction::Stop),
            TelephonyEvent::Unknown => {
                debug!("Ignoring unknown telephony event");
            }
        }
        Ok(TelephonyAction::Continue)
    }
}

/// Read loop for the telephony socket.
///
/// Caller audio is forwarded with `try_send`: a full or closed upstream
/// queue drops the frame instead of stalling the caller side.
pub(crate) async fn run_telephony_loop(
    mut stream: FrameStream,
    adapter: TelephonyAdapter,
    model_tx: mpsc::Sender<ClientEvent>,
    teardown: Arc<Teardown>,
) {
    loop {
        let frame = select! {
            biased;
            _ = teardown.cancelled() => break,
            frame = stream.next() => frame,
        };

        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                teardown.transport_lost(Peer::Telephony, e);
                break;
            }
            None => {
                warn!("Telephony socket closed without a stop event");
                teardown.finish(CallOutcome::CallerDisconnected);
                break;
            }
        };

        let action = TelephonyEvent::decode(&text).and_then(|event| adapter.handle_event(event));

        match action {
            Ok(TelephonyAction::Continue) => {}
            Ok(TelephonyAction::Forward(frame)) => {
                match model_tx.try_send(ClientEvent::audio_append(&frame)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!("Model queue full, dropping caller audio frame");
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Model queue closed, dropping caller audio frame");
                    }
                }
            }
            Ok(TelephonyAction::Stop) => {
                info!("Caller hung up");
                teardown.finish(CallOutcome::CallerHangup);
                break;
            }
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "Dropping telephony event");
            }
            Err(e) => {
                teardown.fail(e);
                break;
            }
        }
    }

    debug!("Telephony read loop finished");
}
