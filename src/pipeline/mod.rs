pub mod bundle;
pub mod history;
pub mod manager;
pub mod queue;

pub use bundle::{FrameBundle, HistoryEntry};
pub use history::{DetectionHistory, HistorySnapshot, HistoryTotals};
pub use manager::{
    HistoryPage, StartOutcome, StopOutcome, StreamManager, StreamState, StreamStatus,
};
pub use queue::{BundleQueue, QueueStats};
