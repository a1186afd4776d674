#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::RgbImage;

use fieldglass::capture::{Camera, CameraSource, Frame};
use fieldglass::error::CaptureError;
use fieldglass::pipeline::StreamManager;
use fieldglass::render::FrameAnnotator;
use fieldglass::vision::{DetectionProvider, SimulatedOcr, TextExtractionProvider};
use fieldglass::{CaptureConfig, PipelineConfig};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub releases: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// In-memory camera source
pub struct FakeSource {
    pub counters: Arc<Counters>,
    /// Reads succeed this many times, then fail; `None` never fails
    pub frames_before_failure: Option<u64>,
    pub fail_open: bool,
    pub frame_delay: Duration,
}

impl FakeSource {
    pub fn endless() -> Self {
        Self {
            counters: Arc::default(),
            frames_before_failure: None,
            fail_open: false,
            frame_delay: Duration::from_millis(2),
        }
    }

    pub fn failing_after(frames: u64) -> Self {
        Self {
            frames_before_failure: Some(frames),
            ..Self::endless()
        }
    }

    pub fn unopenable() -> Self {
        Self {
            fail_open: true,
            ..Self::endless()
        }
    }
}

impl CameraSource for FakeSource {
    fn open(&self, _config: &CaptureConfig) -> Result<Box<dyn Camera>, CaptureError> {
        if self.fail_open {
            return Err(CaptureError::NoDevice);
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeCamera {
            counters: self.counters.clone(),
            remaining: self.frames_before_failure,
            delay: self.frame_delay,
            sequence: 0,
        }))
    }
}

pub struct FakeCamera {
    counters: Arc<Counters>,
    remaining: Option<u64>,
    delay: Duration,
    sequence: u64,
}

impl Camera for FakeCamera {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return Err(CaptureError::Read("fake camera exhausted".into()));
            }
            *remaining -= 1;
        }
        std::thread::sleep(self.delay);
        self.sequence += 1;

        Ok(Frame::from_rgb_image(
            RgbImage::new(WIDTH, HEIGHT),
            self.sequence,
        ))
    }
}

impl Drop for FakeCamera {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn capture_config() -> CaptureConfig {
    CaptureConfig {
        width: WIDTH,
        height: HEIGHT,
        ..CaptureConfig::default()
    }
}

pub fn manager(source: FakeSource) -> (StreamManager, Arc<Counters>) {
    manager_with(source, PipelineConfig::default())
}

pub fn manager_with(source: FakeSource, pipeline: PipelineConfig) -> (StreamManager, Arc<Counters>) {
    let counters = source.counters.clone();
    let manager = StreamManager::new(
        Arc::new(source),
        capture_config(),
        pipeline,
        Arc::new(DetectionProvider::unavailable("test")),
        Arc::new(TextExtractionProvider::new(Box::new(SimulatedOcr::default()))),
        Arc::new(FrameAnnotator::default()),
    );
    (manager, counters)
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
