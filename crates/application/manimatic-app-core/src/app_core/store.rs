use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::SessionState;

use super::{events::SessionEvent, reducer::reduce};

/// Shared handle to the session state. The orchestrator is the only writer;
/// presentation code holds clones to read snapshots.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn apply(&self, ev: SessionEvent) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let next = reduce(guard.clone(), ev);
        *guard = next;
    }
}
