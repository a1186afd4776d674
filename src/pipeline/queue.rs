//! Bounded drop-oldest frame queue

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;
use flume::{Receiver, Sender, TrySendError};
use serde::Serialize;

use super::bundle::FrameBundle;

/// Bounded MPMC queue of frame bundles.
///
/// One producer (the capture loop) pushes; any number of consumers pull.
/// A push never blocks: when the queue is full the oldest bundle is evicted
/// so the newest one always gets in. Consumers see bundles in push order.
pub struct BundleQueue {
    tx: Sender<Arc<FrameBundle>>,
    /// Producer-side receiver used to evict the oldest entry
    evict_rx: Receiver<Arc<FrameBundle>>,
    capacity: usize,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    written: AtomicU64,
    read: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub written: u64,
    pub read: u64,
    pub dropped: u64,
}

impl BundleQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, evict_rx) = flume::bounded(capacity);
        Self {
            tx,
            evict_rx,
            capacity,
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Producer: push, evicting the oldest bundle if full. Returns the id of
    /// the evicted bundle, if any.
    pub fn push(&self, bundle: Arc<FrameBundle>) -> Option<u64> {
        let mut evicted = None;
        let mut pending = bundle;

        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    self.stats.written.fetch_add(1, Ordering::Relaxed);
                    return evicted;
                }
                Err(TrySendError::Full(bundle)) => {
                    pending = bundle;
                    // A consumer may have drained it meanwhile; retry either way
                    if let Ok(oldest) = self.evict_rx.try_recv() {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("frames_dropped_total").increment(1);
                        evicted = Some(oldest.frame_id);
                    }
                }
                // We hold a receiver, so the channel cannot disconnect
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Consumer: take the oldest bundle without waiting
    pub fn try_pull(&self) -> Option<Arc<FrameBundle>> {
        let bundle = self.evict_rx.try_recv().ok()?;
        self.stats.read.fetch_add(1, Ordering::Relaxed);
        Some(bundle)
    }

    /// Consumer: wait for the next bundle
    pub async fn pull(&self) -> Option<Arc<FrameBundle>> {
        let bundle = self.evict_rx.recv_async().await.ok()?;
        self.stats.read.fetch_add(1, Ordering::Relaxed);
        Some(bundle)
    }

    pub fn len(&self) -> usize {
        self.evict_rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evict_rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything queued, returning how many bundles were discarded
    pub fn clear(&self) -> usize {
        self.evict_rx.drain().count()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            written: self.stats.written.load(Ordering::Relaxed),
            read: self.stats.read.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}
