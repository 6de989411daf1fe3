//! Socket writer tasks.
//!
//! Each socket sink is owned by exactly one task fed through a bounded
//! queue, so producers never contend on the sink and per-socket ordering is
//! the queue order.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use serde::Serialize;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error};

use super::error::Peer;
use super::teardown::Teardown;
use crate::core::channel::FrameSink;

/// Upper bound on waiting for a close frame to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Spawn the writer for one socket.
///
/// The task serializes every queued event onto the sink until teardown is
/// requested or all senders are dropped, then closes the sink.
pub(crate) fn spawn_writer<T>(
    peer: Peer,
    mut sink: FrameSink,
    mut queue: mpsc::Receiver<T>,
    teardown: Arc<Teardown>,
) -> JoinHandle<()>
where
    T: Serialize + Send + 'static,
{
    let task = async move {
        loop {
            let event = select! {
                biased;
                _ = teardown.cancelled() => break,
                event = queue.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!(%peer, "Failed to serialize outgoing event: {}", e);
                    continue;
                }
            };

            let sent = select! {
                biased;
                _ = teardown.cancelled() => break,
                sent = sink.send(text) => sent,
            };

            if let Err(e) = sent {
                teardown.transport_lost(peer, e);
                break;
            }
        }

        debug!(%peer, "Closing socket");
        match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(%peer, "Error while closing socket: {}", e),
            Err(_) => debug!(%peer, "Timed out closing socket"),
        }
    };

    tokio::spawn(task.in_current_span())
}
