//! Persisting cluster events to the audit log.

use std::sync::Arc;

use dockyard_core::Event;
use dockyard_store::Store;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Background task appending every received event to the store.
///
/// A failed write is logged and the event dropped. The task ends when every
/// sender is gone. Dropping the capture aborts the task, so events still
/// queued are lost; use [`EventCapture::finish`] to drain them.
pub struct EventCapture {
    handle: Option<JoinHandle<()>>,
}

impl EventCapture {
    /// Start capturing events from `events` into `store`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S: Store + 'static>(
        store: Arc<S>,
        mut events: broadcast::Receiver<Event>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = store.append_event(&event) {
                            tracing::error!(
                                error = %e,
                                kind = %event.kind,
                                engine_id = %event.engine_id,
                                "Failed to persist event"
                            );
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event capture fell behind; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Event capture stopped");
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Check whether the capture task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wait for the task to persist every queued event and stop.
    ///
    /// Returns once every sender of the channel is gone and the backlog is
    /// written. Callers must drop their senders first or this never returns.
    pub async fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Event capture task failed");
            }
        }
    }
}

impl Drop for EventCapture {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for EventCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCapture")
            .field("running", &self.is_running())
            .finish()
    }
}
