use std::sync::Arc;

use futures::StreamExt;
use manimatic_core::decode_event;
use manimatic_infra::TransportError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app_core::SessionEvent;
use crate::ports::BackendPort;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("health probe failed: {0}")]
    Probe(TransportError),
    #[error("could not open event stream: {0}")]
    Open(TransportError),
    #[error("event channel was already connected once")]
    AlreadyUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Fresh,
    Open,
    Closed,
}

/// Long-lived push channel. Connects once; any failure is terminal.
pub struct EventChannel {
    state: Lifecycle,
    cancel: CancellationToken,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self {
            state: Lifecycle::Fresh,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == Lifecycle::Open
    }

    /// Probe the backend, open the event stream and spawn the reader task.
    ///
    /// The reader forwards decoded events to `tx` and posts
    /// [`SessionEvent::ChannelFailed`] once when the stream errors or ends.
    pub async fn connect<B: BackendPort>(
        &mut self,
        backend: Arc<B>,
        tx: mpsc::Sender<SessionEvent>,
    ) -> Result<(), ChannelError> {
        if self.state != Lifecycle::Fresh {
            return Err(ChannelError::AlreadyUsed);
        }
        self.state = Lifecycle::Closed;

        backend.probe().await.map_err(ChannelError::Probe)?;
        let mut stream = backend.open_events().await.map_err(ChannelError::Open)?;

        self.state = Lifecycle::Open;
        info!("event channel open");

        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return,
                    next = stream.next() => next,
                };

                match next {
                    Some(Ok(data)) => match decode_event(&data) {
                        Ok(Some(ev)) => {
                            if tx.send(SessionEvent::Server(ev)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => debug!("ignoring event of unknown kind: {data}"),
                        Err(e) => warn!("skipping malformed event: {e}"),
                    },
                    Some(Err(e)) => {
                        error!("event channel failed: {e}");
                        let _ = tx.send(SessionEvent::ChannelFailed).await;
                        return;
                    }
                    None => {
                        error!("event channel ended");
                        let _ = tx.send(SessionEvent::ChannelFailed).await;
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    /// Stop the reader. Idempotent.
    pub fn dispose(&mut self) {
        self.cancel.cancel();
        self.state = Lifecycle::Closed;
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
