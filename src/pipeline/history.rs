//! Bounded detection history

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ringbuf::traits::{Consumer, Observer, RingBuffer};
use ringbuf::HeapRb;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::bundle::HistoryEntry;
use crate::error::DumpError;
use crate::utils;

/// Cumulative counts since the last clear, including evicted entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTotals {
    pub frames: u64,
    pub detections: u64,
    pub texts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub totals: HistoryTotals,
    pub entries: Vec<HistoryEntry>,
}

/// Ring of the most recent history entries plus running totals.
///
/// The capture loop is the only writer; request handlers read. Entries are
/// kept in strictly increasing `frame_id` order; out-of-order appends are
/// rejected.
pub struct DetectionHistory {
    inner: Mutex<Inner>,
}

struct Inner {
    ring: HeapRb<HistoryEntry>,
    totals: HistoryTotals,
    last_frame_id: Option<u64>,
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ring: HeapRb::new(capacity.max(1)),
                totals: HistoryTotals::default(),
                last_frame_id: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append, overwriting the oldest entry when full. Returns false if the
    /// entry would break frame ordering.
    pub fn append(&self, entry: HistoryEntry) -> bool {
        let mut inner = self.lock();

        if inner.last_frame_id.is_some_and(|last| entry.frame_id <= last) {
            warn!(
                "Rejecting history entry {} after {:?}",
                entry.frame_id, inner.last_frame_id
            );
            return false;
        }

        inner.last_frame_id = Some(entry.frame_id);
        inner.totals.frames += 1;
        inner.totals.detections += entry.detection_count as u64;
        inner.totals.texts += entry.text_count as u64;
        inner.ring.push_overwrite(entry);
        true
    }

    /// Up to `limit` most recent entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let inner = self.lock();
        let skip = inner.ring.occupied_len().saturating_sub(limit);
        inner.ring.iter().skip(skip).cloned().collect()
    }

    pub fn totals(&self) -> HistoryTotals {
        self.lock().totals
    }

    /// Entries currently retained
    pub fn len(&self) -> usize {
        self.lock().ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().ring.capacity().get()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.ring.clear();
        inner.totals = HistoryTotals::default();
        inner.last_frame_id = None;
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let inner = self.lock();
        HistorySnapshot {
            totals: inner.totals,
            entries: inner.ring.iter().cloned().collect(),
        }
    }

    /// Write the current snapshot as pretty JSON
    pub fn dump_json(&self, path: &Path) -> Result<(), DumpError> {
        let snapshot = self.snapshot();
        utils::write_json_pretty(path, &snapshot)?;
        info!(
            "Dumped {} history entries to {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::tests::bundle;

    fn entry(frame_id: u64, detections: usize, texts: usize) -> HistoryEntry {
        bundle(frame_id, detections, texts).history_entry()
    }

    #[test]
    fn totals_survive_eviction() {
        let history = DetectionHistory::new(3);
        for id in 1..=5 {
            assert!(history.append(entry(id, 2, 1)));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.totals(),
            HistoryTotals {
                frames: 5,
                detections: 10,
                texts: 5
            }
        );
        let ids: Vec<_> = history.recent(10).iter().map(|e| e.frame_id).collect();
        assert_eq!(ids, [3, 4, 5]);
    }

    #[test]
    fn recent_returns_newest_tail() {
        let history = DetectionHistory::new(50);
        for id in 1..=8 {
            history.append(entry(id, 0, 0));
        }
        let ids: Vec<_> = history.recent(3).iter().map(|e| e.frame_id).collect();
        assert_eq!(ids, [6, 7, 8]);
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let history = DetectionHistory::new(4);
        assert!(history.append(entry(2, 1, 0)));
        assert!(!history.append(entry(2, 1, 0)));
        assert!(!history.append(entry(1, 1, 0)));
        assert_eq!(history.totals().frames, 1);
    }

    #[test]
    fn clear_resets_ordering_and_totals() {
        let history = DetectionHistory::new(4);
        history.append(entry(9, 1, 1));
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.totals(), HistoryTotals::default());
        assert!(history.append(entry(1, 0, 0)));
    }

    #[test]
    fn dump_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let history = DetectionHistory::new(4);
        history.append(entry(1, 1, 2));
        history.append(entry(2, 1, 0));

        history.dump_json(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let snapshot: HistorySnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(snapshot.totals.frames, 2);
        assert_eq!(snapshot.totals.texts, 2);
        assert_eq!(snapshot.entries, history.recent(4));
    }
}
