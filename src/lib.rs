pub mod api;
pub mod capture;
pub mod error;
pub mod knowledge;
pub mod pipeline;
pub mod render;
pub mod utils;
pub mod vision;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::utils::FoundDevice;

pub use capture::{Frame, FrameMetadata};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FIELDGLASS_CONFIG";

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub pipeline: PipelineConfig,
    pub annotate: AnnotateConfig,
    pub vision: VisionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device: FoundDevice,
    /// Scan `/dev/video*` instead of using `device.path`
    pub auto_detect: bool,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame bundles held for consumers before the oldest is dropped
    pub queue_capacity: usize,
    /// History entries retained for inspection
    pub history_capacity: usize,
    /// Entries returned by the history endpoint when no limit is given
    pub history_window: usize,
    /// Written on every stop when set
    pub history_dump_path: Option<PathBuf>,
    pub ws_interval_ms: u64,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// TrueType font overriding the bundled DejaVu Sans Mono
    pub font_path: Option<PathBuf>,
    pub label_scale: f32,
    pub overlay_scale: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub model: String,
    pub simulated_ocr: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: FoundDevice::default(),
            auto_detect: false,
            width: 640,
            height: 480,
            fps: 30,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            history_capacity: 50,
            history_window: 50,
            history_dump_path: None,
            ws_interval_ms: 33, // ~30 Hz
            jpeg_quality: 80,
        }
    }
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            label_scale: 16.0,
            overlay_scale: 22.0,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "yolov8n".into(),
            simulated_ocr: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fieldglass=info,tower_http=info".into(),
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `FIELDGLASS__*` environment
    /// variables (e.g. `FIELDGLASS__PIPELINE__QUEUE_CAPACITY=20`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("fieldglass").required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("FIELDGLASS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capture = &self.capture;
        if capture.width == 0 || capture.height == 0 {
            return Err(ConfigError::Invalid(
                "capture resolution must be non-zero".into(),
            ));
        }
        if capture.fps == 0 {
            return Err(ConfigError::Invalid("capture.fps must be non-zero".into()));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.queue_capacity must be at least 1".into(),
            ));
        }
        if self.pipeline.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.history_capacity must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.pipeline.jpeg_quality) {
            return Err(ConfigError::Invalid(
                "pipeline.jpeg_quality must be within 1..=100".into(),
            ));
        }
        Ok(())
    }
}

impl PipelineConfig {
    pub fn ws_interval(&self) -> Duration {
        Duration::from_millis(self.ws_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_vga_settings() {
        let config = Config::default();
        assert_eq!(config.capture.width, 640);
        assert_eq!(config.capture.height, 480);
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.pipeline.queue_capacity, 10);
        assert_eq!(config.pipeline.history_window, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let mut config = Config::default();
        config.pipeline.queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loads_partial_toml_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldglass.toml");
        std::fs::write(
            &path,
            "[pipeline]\nqueue_capacity = 4\n\n[capture]\nfps = 15\nformat = \"yuyv4\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.pipeline.queue_capacity, 4);
        assert_eq!(config.pipeline.history_capacity, 50);
        assert_eq!(config.capture.fps, 15);
        assert_eq!(config.capture.format, PixelFormat::Yuyv4);
        assert_eq!(config.capture.width, 640);
    }

    #[test]
    fn device_table_with_only_a_path_defaults_to_mjpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fieldglass.toml");
        std::fs::write(&path, "[capture.device]\npath = \"/dev/video2\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.capture.device.path, "/dev/video2");
        assert_eq!(config.capture.device.format, PixelFormat::Mjpeg);
    }
}
