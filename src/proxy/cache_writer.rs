//! Background cache writes
//!
//! The request path hands finished responses to a bounded queue and returns
//! immediately. A single task drains the queue into the [`CacheStore`]. When
//! the queue is full the write is dropped; a lost write only costs one extra
//! upstream call later. Entries still queued at shutdown are discarded.

use crate::proxy::cache::CacheStore;
use crate::proxy::types::CacheEntry;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Result of one background write, reported when an observer is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWriteOutcome {
    Stored { key: String },
    Failed { key: String, reason: String },
}

/// Cheap, clonable sender side used by request handlers
#[derive(Debug, Clone)]
pub struct CacheWriteHandle {
    tx: mpsc::Sender<CacheEntry>,
}

impl CacheWriteHandle {
    /// Queue an entry without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, entry: CacheEntry) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(entry)) => {
                warn!(cache_key = %entry.key, "Cache write queue full, dropping write");
                false
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                warn!(cache_key = %entry.key, "Cache writer stopped, dropping write");
                false
            }
        }
    }
}

/// Task that persists queued entries
pub struct CacheWriter {
    store: Arc<dyn CacheStore>,
    rx: mpsc::Receiver<CacheEntry>,
    shutdown_rx: mpsc::Receiver<()>,
    outcomes: Option<mpsc::UnboundedSender<CacheWriteOutcome>>,
}

impl CacheWriter {
    /// Create a writer, its enqueue handle and a shutdown sender
    pub fn new(
        store: Arc<dyn CacheStore>,
        capacity: usize,
        outcomes: Option<mpsc::UnboundedSender<CacheWriteOutcome>>,
    ) -> (Self, CacheWriteHandle, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = Self {
            store,
            rx,
            shutdown_rx,
            outcomes,
        };

        (writer, CacheWriteHandle { tx }, shutdown_tx)
    }

    /// Persist queued entries until shutdown, or until every handle is dropped.
    ///
    /// Dropping the shutdown sender counts as a shutdown signal.
    pub async fn run(mut self) {
        info!("Cache writer started");

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Cache writer shutting down");
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(entry) => self.write(entry).await,
                    None => break,
                },
            }
        }

        info!("Cache writer stopped");
    }

    async fn write(&self, entry: CacheEntry) {
        let key = entry.key.clone();
        let outcome = match self.store.set(entry).await {
            Ok(()) => {
                debug!(cache_key = %key, "Cached upstream response");
                CacheWriteOutcome::Stored { key }
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache write failed");
                CacheWriteOutcome::Failed {
                    key,
                    reason: e.to_string(),
                }
            }
        };

        if let Some(outcomes) = &self.outcomes {
            // Observer may have gone away; nothing to do then
            let _ = outcomes.send(outcome);
        }
    }
}
