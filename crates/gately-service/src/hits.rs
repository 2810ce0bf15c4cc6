//! Deferred hit accounting.
//!
//! A redirect must not wait on the durable store to count itself, so hits
//! are queued on a bounded channel and applied by a single worker task with
//! its own deadline. Cancelling the request that queued a hit does not
//! cancel the update.

use gately_core::{ShortKey, UrlStore};
use jiff::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

const DEFAULT_CAPACITY: usize = 1024;
const DEFAULT_UPDATE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, TypedBuilder)]
pub struct HitRecorderConfig {
    /// Number of pending updates held before new ones are dropped.
    #[builder(default = DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Deadline for a single store update.
    #[builder(default = DEFAULT_UPDATE_TIMEOUT)]
    pub update_timeout: Duration,
}

impl Default for HitRecorderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug)]
struct Hit {
    key: ShortKey,
    at: Timestamp,
}

/// Queues hit updates and applies them in the background.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct HitRecorder {
    tx: mpsc::Sender<Hit>,
    closing: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HitRecorder {
    /// Spawns the worker for `store`.
    pub fn spawn<S: UrlStore + ?Sized>(store: Arc<S>, config: HitRecorderConfig) -> Self {
        // A zero-capacity mpsc channel panics.
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (closing, closing_rx) = watch::channel(false);
        let worker = tokio::spawn(run_worker(store, rx, closing_rx, config.update_timeout));

        Self {
            tx,
            closing,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queues one hit for `key`, stamped with the current time.
    ///
    /// Never blocks. A full or closed queue drops the hit.
    pub fn record(&self, key: &ShortKey) {
        let hit = Hit {
            key: key.clone(),
            at: Timestamp::now(),
        };

        match self.tx.try_send(hit) {
            Ok(()) => trace!(key = %key, "Queued hit update"),
            Err(TrySendError::Full(hit)) => {
                warn!(key = %hit.key, "Hit queue is full, dropping update")
            }
            Err(TrySendError::Closed(hit)) => {
                warn!(key = %hit.key, "Hit recorder is shut down, dropping update")
            }
        }
    }

    /// Stops accepting hits and waits until every queued one is applied.
    ///
    /// Calling it more than once is harmless.
    pub async fn shutdown(&self) {
        self.closing.send_replace(true);

        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        if let Err(e) = worker.await {
            warn!(error = %e, "Hit recorder worker ended abnormally");
        }
    }
}

async fn run_worker<S: UrlStore + ?Sized>(
    store: Arc<S>,
    mut rx: mpsc::Receiver<Hit>,
    mut closing: watch::Receiver<bool>,
    update_timeout: Duration,
) {
    loop {
        tokio::select! {
            hit = rx.recv() => match hit {
                Some(hit) => apply(store.as_ref(), hit, update_timeout).await,
                None => break,
            },
            // Fires on shutdown, and also if the recorder is dropped.
            _ = closing.changed() => {
                rx.close();
                let mut drained = 0usize;
                while let Some(hit) = rx.recv().await {
                    apply(store.as_ref(), hit, update_timeout).await;
                    drained += 1;
                }
                info!(drained, "Hit recorder drained");
                break;
            }
        }
    }
}

async fn apply<S: UrlStore + ?Sized>(store: &S, hit: Hit, update_timeout: Duration) {
    match tokio::time::timeout(update_timeout, store.increment_hit(&hit.key, hit.at)).await {
        Ok(Ok(true)) => trace!(key = %hit.key, "Hit recorded"),
        Ok(Ok(false)) => debug!(key = %hit.key, "Hit for a key that no longer exists"),
        Ok(Err(e)) => warn!(key = %hit.key, error = %e, "Failed to record hit"),
        Err(_) => warn!(
            key = %hit.key,
            timeout_ms = update_timeout.as_millis() as u64,
            "Hit update timed out"
        ),
    }
}
