//! Debounced background persistence.
//!
//! Mutations hand their resulting snapshot to the queue and move on. The
//! worker keeps only the newest snapshot per token and writes it once no
//! newer mutation has arrived for `debounce`. Two writes for one token are
//! never in flight at once, and the last snapshot enqueued is the one that
//! ends up stored.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant};

use std::collections::HashMap;
use std::sync::Arc;

use crate::internal_error::{InternalError, InternalResult};

use super::data::{Snapshot, UserToken};
use super::store::TaskStore;

enum SaveRequest {
    Save(UserToken, Snapshot),
    SaveNow(UserToken, Snapshot, oneshot::Sender<InternalResult<()>>),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct SaveQueue {
    sender: mpsc::UnboundedSender<SaveRequest>,
}

impl SaveQueue {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn TaskStore>, debounce: Duration) -> (SaveQueue, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(store, debounce, receiver));

        (SaveQueue { sender }, worker)
    }

    pub fn enqueue(&self, token: UserToken, snapshot: Snapshot) {
        if self.sender.send(SaveRequest::Save(token, snapshot)).is_err() {
            tracing::warn!("save worker has stopped; change kept in memory only");
        }
    }

    /// Writes `snapshot` ahead of the debounce window, replacing anything
    /// still pending for `token`. The returned future reports the store's
    /// answer; the request itself is queued as soon as this is called.
    pub fn save_now(
        &self,
        token: UserToken,
        snapshot: Snapshot,
    ) -> impl std::future::Future<Output = InternalResult<()>> {
        let (done, finished) = oneshot::channel();
        let sent = self.sender.send(SaveRequest::SaveNow(token, snapshot, done));

        async move {
            if sent.is_err() {
                return Err(InternalError::StoreUnavailable(
                    "save worker has stopped".to_string(),
                ));
            }

            finished.await.unwrap_or_else(|_| {
                Err(InternalError::StoreUnavailable(
                    "save worker has stopped".to_string(),
                ))
            })
        }
    }

    /// Writes everything pending now and waits for the writes to finish.
    pub async fn flush(&self) {
        let (done, finished) = oneshot::channel();

        if self.sender.send(SaveRequest::Flush(done)).is_ok() {
            let _ = finished.await;
        }
    }
}

async fn run_worker(
    store: Arc<dyn TaskStore>,
    debounce: Duration,
    mut receiver: mpsc::UnboundedReceiver<SaveRequest>,
) {
    let mut pending: HashMap<UserToken, Snapshot> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let request = match deadline {
            Some(at) => tokio::select! {
                request = receiver.recv() => request,
                _ = time::sleep_until(at) => {
                    write_pending(&store, &mut pending).await;
                    deadline = None;
                    continue;
                }
            },
            None => receiver.recv().await,
        };

        match request {
            Some(SaveRequest::Save(token, snapshot)) => {
                pending.insert(token, snapshot);
                deadline = Some(Instant::now() + debounce);
            }
            Some(SaveRequest::SaveNow(token, snapshot, done)) => {
                pending.remove(&token);
                if pending.is_empty() {
                    deadline = None;
                }
                let _ = done.send(write_one(&store, token, snapshot).await);
            }
            Some(SaveRequest::Flush(done)) => {
                write_pending(&store, &mut pending).await;
                deadline = None;
                let _ = done.send(());
            }
            None => {
                write_pending(&store, &mut pending).await;
                tracing::debug!("save queue closed");
                return;
            }
        }
    }
}

async fn write_pending(store: &Arc<dyn TaskStore>, pending: &mut HashMap<UserToken, Snapshot>) {
    for (token, snapshot) in pending.drain() {
        let _ = write_one(store, token, snapshot).await;
    }
}

async fn write_one(
    store: &Arc<dyn TaskStore>,
    token: UserToken,
    snapshot: Snapshot,
) -> InternalResult<()> {
    let store = Arc::clone(store);
    let saved = tokio::task::spawn_blocking(move || {
        let result = store.save_all(&token, &snapshot);
        (token, result)
    })
    .await;

    match saved {
        Ok((_, Ok(()))) => Ok(()),
        Ok((token, Err(e))) => {
            tracing::error!(%token, error = %e, "failed to save document");
            Err(e)
        }
        Err(e) => {
            tracing::error!(error = %e, "save task panicked");
            Err(InternalError::StoreUnavailable(e.to_string()))
        }
    }
}

/// Waits for the worker and logs how it ended. Resolves to `false` if it
/// died instead of shutting down with its queue.
pub async fn supervise(worker: JoinHandle<()>) -> bool {
    match worker.await {
        Ok(()) => {
            tracing::debug!("save worker stopped");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "save worker died; changes are no longer persisted");
            false
        }
    }
}
