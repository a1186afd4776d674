//! Offline pipeline diagnostic.
//!
//! Runs detection, text extraction and knowledge lookup on synthetic frames,
//! then the combined workflow, and writes a JSON report.
//!
//! Usage: `pipeline_check [REPORT_PATH]`

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fieldglass::capture::Frame;
use fieldglass::knowledge::{KnowledgeAnswer, KnowledgeBase};
use fieldglass::utils::write_json_pretty;
use fieldglass::vision::{
    DetectionProvider, DetectionResult, OcrResult, SimulatedOcr, TextExtractionProvider,
};

const DEFAULT_REPORT: &str = "pipeline_check_results.json";
const KNOWLEDGE_QUERY: &str = "How does object detection work on smart_glass hardware?";
const SIMULATED_FRAMES: u64 = 5;

#[derive(Serialize)]
struct Report {
    timestamp: DateTime<Utc>,
    duration_seconds: f64,
    detection: DetectionResult,
    ocr: OcrResult,
    knowledge: KnowledgeAnswer,
    simulated_stream: Vec<SimulatedFrame>,
    workflow: Workflow,
    overall_status: &'static str,
}

#[derive(Serialize)]
struct SimulatedFrame {
    frame_id: u64,
    objects_count: usize,
    processing_time_ms: f64,
}

#[derive(Serialize)]
struct Workflow {
    detection: DetectionResult,
    ocr: OcrResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    knowledge: Option<KnowledgeAnswer>,
    status: &'static str,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let report_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT));

    let detector = DetectionProvider::unavailable("pipeline check runs without a model");
    let ocr = TextExtractionProvider::new(Box::new(SimulatedOcr::default()));
    let knowledge = KnowledgeBase::default();

    let started_at = Utc::now();
    let started = Instant::now();

    info!("Checking detection");
    let detection = detector.detect(&outlined_frame(640, 480, 0));
    info!(
        objects = detection.objects.len(),
        status = ?detection.status,
        "Detection done in {:.2}ms",
        detection.processing_time_ms
    );

    info!("Checking text extraction");
    let ocr_result = ocr.extract_text(&outlined_frame(400, 240, 0));
    for region in &ocr_result.texts {
        info!("  '{}' ({:.2})", region.text, region.confidence);
    }

    info!("Checking knowledge lookup");
    let knowledge_answer = knowledge.query(KNOWLEDGE_QUERY);
    info!(
        sources = knowledge_answer.sources.len(),
        "Knowledge confidence {:.2}", knowledge_answer.confidence
    );

    info!("Simulating {} stream frames", SIMULATED_FRAMES);
    let simulated_stream: Vec<SimulatedFrame> = (1..=SIMULATED_FRAMES)
        .map(|frame_id| {
            let result = detector.detect(&noise_frame(640, 480, frame_id));
            SimulatedFrame {
                frame_id,
                objects_count: result.objects.len(),
                processing_time_ms: result.processing_time_ms,
            }
        })
        .collect();

    info!("Running combined workflow");
    let workflow = run_workflow(&detector, &ocr, &knowledge);
    info!("Workflow finished: {}", workflow.status);

    let report = Report {
        timestamp: started_at,
        duration_seconds: started.elapsed().as_secs_f64(),
        detection,
        ocr: ocr_result,
        knowledge: knowledge_answer,
        simulated_stream,
        workflow,
        overall_status: "completed",
    };

    write_json_pretty(&report_path, &report)?;
    info!(
        "Report written to {} ({:.2}s)",
        report_path.display(),
        report.duration_seconds
    );
    Ok(())
}

/// Detected labels become a knowledge query
fn run_workflow(
    detector: &DetectionProvider,
    ocr: &TextExtractionProvider,
    knowledge: &KnowledgeBase,
) -> Workflow {
    let frame = outlined_frame(640, 480, 0);
    let detection = detector.detect(&frame);
    let ocr = ocr.extract_text(&frame);

    if detection.objects.is_empty() {
        return Workflow {
            detection,
            ocr,
            knowledge: None,
            status: "no_objects",
        };
    }

    let labels: Vec<&str> = detection.objects.iter().map(|d| d.label.as_str()).collect();
    let query = format!(
        "Detected objects: {}. Describe these objects.",
        labels.join(", ")
    );
    let answer = knowledge.query(&query);

    Workflow {
        detection,
        ocr,
        knowledge: Some(answer),
        status: "success",
    }
}

/// Black frame with a green outline, shifted by `offset`
fn outlined_frame(width: u32, height: u32, offset: i32) -> Frame {
    let mut image = RgbImage::new(width, height);
    draw_outline(&mut image, offset);
    Frame::from_rgb_image(image, 0)
}

/// Seeded noise frame with a moving outline
fn noise_frame(width: u32, height: u32, seq: u64) -> Frame {
    let mut image = RgbImage::new(width, height);
    StdRng::seed_from_u64(seq).fill_bytes(&mut image);
    draw_outline(&mut image, seq as i32 * 10);
    Frame::from_rgb_image(image, seq)
}

fn draw_outline(image: &mut RgbImage, offset: i32) {
    draw_hollow_rect_mut(
        image,
        Rect::at(100 + offset, 100 + offset).of_size(200, 200),
        Rgb([0, 255, 0]),
    );
}
