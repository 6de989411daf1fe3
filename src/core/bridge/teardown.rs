//! Single cancellation point for one call.

use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info, warn};

use super::error::{BridgeError, BridgeResult, CallOutcome, Peer};

/// Records how a call ended and cancels every task of that call.
///
/// Only the first request wins; later requests are ignored.
#[derive(Debug, Default)]
pub struct Teardown {
    result: Mutex<Option<BridgeResult<CallOutcome>>>,
    token: CancellationToken,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// End the call normally. Returns `true` if this request won.
    pub fn finish(&self, outcome: CallOutcome) -> bool {
        self.trigger(Ok(outcome))
    }

    /// End the call with an error. Returns `true` if this request won.
    pub fn fail(&self, error: BridgeError) -> bool {
        self.trigger(Err(error))
    }

    /// A socket failed or closed underneath the bridge.
    ///
    /// Losing the caller ends the call without error; losing the model does not.
    pub fn transport_lost(&self, peer: Peer, error: BridgeError) -> bool {
        match peer {
            Peer::Telephony => {
                warn!(error = %error, "Telephony transport lost");
                self.finish(CallOutcome::CallerDisconnected)
            }
            Peer::Model => self.fail(error),
        }
    }

    fn trigger(&self, result: BridgeResult<CallOutcome>) -> bool {
        {
            let mut slot = self.result.lock();
            if slot.is_some() {
                debug!(ignored = ?result, "Teardown already in progress");
                return false;
            }
            match &result {
                Ok(outcome) => info!(%outcome, "Tearing down call"),
                Err(error) => warn!(error = %error, "Tearing down call after error"),
            }
            *slot = Some(result);
        }
        self.token.cancel();
        true
    }

    /// Resolves once teardown has been requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Take the recorded result.
    ///
    /// Calls torn down without a recorded reason count as a model disconnect.
    pub fn take_result(&self) -> BridgeResult<CallOutcome> {
        self.result
            .lock()
            .take()
            .unwrap_or(Err(BridgeError::TransportClosed { peer: Peer::Model }))
    }
}
