//! Stream manager: camera lifecycle, capture loop and consumer access.
//!
//! States are `Idle` and `Streaming`. At most one capture thread exists; it
//! owns the camera, so the device is released exactly once, when the loop
//! returns. Handlers talk to the loop only through the queue, the history
//! and the atomics in [`Shared`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::bundle::{FrameBundle, HistoryEntry};
use super::history::DetectionHistory;
use super::queue::BundleQueue;
use crate::capture::{Camera, CameraSource, Frame};
use crate::render::{encode_jpeg, FrameAnnotator};
use crate::vision::{DetectionProvider, TextExtractionProvider};
use crate::{CaptureConfig, PipelineConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyStreaming,
    /// Camera could not be acquired; the manager stayed idle
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    pub was_streaming: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStatus {
    pub is_streaming: bool,
    pub frame_count: u64,
    pub queue_size: usize,
    pub total_detections: u64,
    pub total_texts: u64,
    pub dropped_frames: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    pub total_frames: u64,
    pub history: Vec<HistoryEntry>,
}

/// State shared between the capture thread and request handlers
struct Shared {
    streaming: AtomicBool,
    queue: BundleQueue,
    history: DetectionHistory,
    last_error: ArcSwapOption<String>,
}

struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct StreamManager {
    source: Arc<dyn CameraSource>,
    capture: CaptureConfig,
    pipeline: PipelineConfig,
    detector: Arc<DetectionProvider>,
    ocr: Arc<TextExtractionProvider>,
    annotator: Arc<FrameAnnotator>,
    shared: Arc<Shared>,
    // Serializes start/stop
    worker: Mutex<Option<Worker>>,
}

impl StreamManager {
    pub fn new(
        source: Arc<dyn CameraSource>,
        capture: CaptureConfig,
        pipeline: PipelineConfig,
        detector: Arc<DetectionProvider>,
        ocr: Arc<TextExtractionProvider>,
        annotator: Arc<FrameAnnotator>,
    ) -> Self {
        let shared = Arc::new(Shared {
            streaming: AtomicBool::new(false),
            queue: BundleQueue::new(pipeline.queue_capacity),
            history: DetectionHistory::new(pipeline.history_capacity),
            last_error: ArcSwapOption::empty(),
        });

        Self {
            source,
            capture,
            pipeline,
            detector,
            ocr,
            annotator,
            shared,
            worker: Mutex::new(None),
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> StreamState {
        if self.shared.streaming.load(Ordering::Acquire) {
            StreamState::Streaming
        } else {
            StreamState::Idle
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    /// Acquire the camera and spawn the capture loop. No-op while streaming.
    ///
    /// Blocks while opening the device and while reaping a loop that ended on
    /// its own; call from a blocking context.
    pub fn start(&self) -> StartOutcome {
        let mut worker = self.lock_worker();

        if self.shared.streaming.load(Ordering::Acquire) {
            debug!("Start requested while already streaming");
            return StartOutcome::AlreadyStreaming;
        }

        // A loop that stopped after a read failure is finished but not joined
        if let Some(previous) = worker.take() {
            reap(previous);
        }

        let camera = match self.source.open(&self.capture) {
            Ok(camera) => camera,
            Err(e) => {
                error!("Failed to start stream: {}", e);
                self.shared.last_error.store(Some(Arc::new(e.to_string())));
                return StartOutcome::Failed(e.to_string());
            }
        };

        self.shared.queue.clear();
        self.shared.history.clear();
        self.shared.last_error.store(None);

        let running = Arc::new(AtomicBool::new(true));
        self.shared.streaming.store(true, Ordering::Release);

        let capture_loop = CaptureLoop {
            camera,
            running: running.clone(),
            shared: self.shared.clone(),
            detector: self.detector.clone(),
            ocr: self.ocr.clone(),
            annotator: self.annotator.clone(),
            jpeg_quality: self.pipeline.jpeg_quality,
            history_dump_path: self.pipeline.history_dump_path.clone(),
            last_frame_id: 0,
        };

        // On spawn failure the closure, and with it the camera, is dropped
        match thread::Builder::new()
            .name("fieldglass-capture".into())
            .spawn(move || capture_loop.run())
        {
            Ok(handle) => {
                *worker = Some(Worker { running, handle });
                info!(
                    "Stream started at {}x{}@{}",
                    self.capture.width, self.capture.height, self.capture.fps
                );
                StartOutcome::Started
            }
            Err(e) => {
                self.shared.streaming.store(false, Ordering::Release);
                error!("Failed to spawn capture thread: {}", e);
                StartOutcome::Failed(format!("failed to spawn capture thread: {e}"))
            }
        }
    }

    /// Stop streaming and release the camera. Idempotent.
    ///
    /// Joins the capture thread, which takes at most one frame interval plus
    /// one iteration of processing; call from a blocking context.
    pub fn stop(&self) -> StopOutcome {
        let mut worker = self.lock_worker();
        let was_streaming = self.shared.streaming.swap(false, Ordering::AcqRel);

        if let Some(previous) = worker.take() {
            reap(previous);
        }

        if was_streaming {
            info!(frames = self.shared.history.totals().frames, "Stream stopped");
        }
        StopOutcome { was_streaming }
    }

    /// Non-blocking pull of the oldest queued bundle
    pub fn latest_frame(&self) -> Option<Arc<FrameBundle>> {
        self.shared.queue.try_pull()
    }

    /// Wait for the next bundle. Pending while idle.
    pub async fn next_frame(&self) -> Option<Arc<FrameBundle>> {
        self.shared.queue.pull().await
    }

    pub fn status(&self) -> StreamStatus {
        // One snapshot, so frame_count always equals the history's frame total
        let totals = self.shared.history.totals();
        StreamStatus {
            is_streaming: self.is_streaming(),
            frame_count: totals.frames,
            queue_size: self.shared.queue.len(),
            total_detections: totals.detections,
            total_texts: totals.texts,
            dropped_frames: self.shared.queue.stats().dropped,
            last_error: self.shared.last_error.load_full().map(|e| (*e).clone()),
        }
    }

    /// The `limit` most recent history entries, oldest first
    pub fn history(&self, limit: usize) -> HistoryPage {
        HistoryPage {
            total_frames: self.shared.history.totals().frames,
            history: self.shared.history.recent(limit),
        }
    }
}

impl Drop for StreamManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reap(worker: Worker) {
    worker.running.store(false, Ordering::Release);
    if worker.handle.join().is_err() {
        error!("Capture thread panicked");
    }
}

/// Clears the streaming flag however the loop exits, panics included
struct StreamingGuard(Arc<Shared>);

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.0.streaming.store(false, Ordering::Release);
    }
}

struct CaptureLoop {
    camera: Box<dyn Camera>,
    running: Arc<AtomicBool>,
    shared: Arc<Shared>,
    detector: Arc<DetectionProvider>,
    ocr: Arc<TextExtractionProvider>,
    annotator: Arc<FrameAnnotator>,
    jpeg_quality: u8,
    history_dump_path: Option<PathBuf>,
    last_frame_id: u64,
}

impl CaptureLoop {
    fn run(mut self) {
        let _guard = StreamingGuard(self.shared.clone());
        info!("Capture loop running");

        while self.running.load(Ordering::Acquire) {
            let frame = match self.camera.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Capture error, stopping stream: {}", e);
                    metrics::counter!("capture_errors_total").increment(1);
                    self.shared.last_error.store(Some(Arc::new(e.to_string())));
                    break;
                }
            };

            // stop() may have been requested while we waited on the device
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            self.process(frame);
        }

        info!(frames = self.last_frame_id, "Capture loop exited");

        // Every exit path, read failures included
        if let Some(path) = &self.history_dump_path {
            if let Err(e) = self.shared.history.dump_json(path) {
                warn!("Failed to dump history to {}: {}", path.display(), e);
            }
        }
    }

    fn process(&mut self, frame: Frame) {
        let started = Instant::now();
        self.last_frame_id += 1;
        let frame_id = self.last_frame_id;
        metrics::counter!("frames_captured_total").increment(1);

        let detection_result = self.detector.detect(&frame);
        let ocr_result = self.ocr.extract_text(&frame);

        let annotated_frame = self.annotator.annotate(
            &frame,
            &detection_result.objects,
            &ocr_result.texts,
            frame_id,
        );
        let jpeg = encode_jpeg(&annotated_frame, self.jpeg_quality).unwrap_or_else(|e| {
            warn!("Failed to encode frame {}: {}", frame_id, e);
            Bytes::new()
        });

        let bundle = FrameBundle {
            frame_id,
            timestamp: frame.captured_at,
            annotated_frame,
            jpeg,
            detection_result,
            ocr_result,
        };

        self.shared.history.append(bundle.history_entry());
        if let Some(evicted) = self.shared.queue.push(Arc::new(bundle)) {
            debug!("Queue full, dropped frame {}", evicted);
        }

        metrics::histogram!("pipeline_time_us").record(started.elapsed().as_micros() as f64);
    }
}
