use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app_core::SessionEvent;
use crate::domain::ActionId;

/// Single-shot deadline for the action currently in flight.
///
/// Expiry only posts [`SessionEvent::TimedOut`]; the orchestrator decides
/// whether it still applies by asking [`TimeoutGuard::armed_action`].
pub struct TimeoutGuard {
    tx: mpsc::Sender<SessionEvent>,
    pending: Option<Pending>,
}

struct Pending {
    action_id: ActionId,
    cancel: CancellationToken,
}

impl TimeoutGuard {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx, pending: None }
    }

    /// Start the timer for `action_id`, replacing any pending one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, action_id: ActionId, after: Duration) {
        self.disarm();

        let cancel = CancellationToken::new();
        let tx = self.tx.clone();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    debug!(%action_id, "deadline elapsed");
                    let _ = tx.send(SessionEvent::TimedOut { action_id }).await;
                }
            }
        });

        self.pending = Some(Pending { action_id, cancel });
    }

    /// Cancel the pending timer. No-op when nothing is armed.
    pub fn disarm(&mut self) {
        if let Some(p) = self.pending.take() {
            p.cancel.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    pub fn armed_action(&self) -> Option<ActionId> {
        self.pending.as_ref().map(|p| p.action_id)
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}
