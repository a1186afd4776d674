//! `/vision/*` handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{ApiError, AppContext};
use crate::capture::Frame;
use crate::render::decode_image;
use crate::vision::{DetectionResult, DetectorStatus, OcrResult};

const BLANK_WIDTH: u32 = 640;
const BLANK_HEIGHT: u32 = 480;

#[derive(Debug, Serialize)]
pub struct VisionStatus {
    pub status: &'static str,
    #[serde(flatten)]
    pub detector: DetectorStatus,
    pub ocr_available: bool,
}

pub async fn status(State(ctx): State<AppContext>) -> Json<VisionStatus> {
    let detector = ctx.detector.status();
    Json(VisionStatus {
        status: if detector.model_loaded { "ready" } else { "mock_mode" },
        detector,
        ocr_available: ctx.ocr.is_available(),
    })
}

/// Detection on a blank frame; exercises the provider without a camera
pub async fn detect_blank(State(ctx): State<AppContext>) -> Result<Json<DetectionResult>, ApiError> {
    let detector = ctx.detector.clone();
    let result = tokio::task::spawn_blocking(move || {
        detector.detect(&Frame::blank(BLANK_WIDTH, BLANK_HEIGHT))
    })
    .await?;
    Ok(Json(result))
}

pub async fn detect_upload(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<DetectionResult>, ApiError> {
    let frame = decode_upload(&body)?;
    let detector = ctx.detector.clone();
    let result = tokio::task::spawn_blocking(move || detector.detect(&frame)).await?;
    Ok(Json(result))
}

pub async fn ocr_upload(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<OcrResult>, ApiError> {
    let frame = decode_upload(&body)?;
    let ocr = ctx.ocr.clone();
    let result = tokio::task::spawn_blocking(move || ocr.extract_text(&frame)).await?;
    Ok(Json(result))
}

fn decode_upload(body: &[u8]) -> Result<Frame, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty image upload".into()));
    }
    decode_image(body).map_err(|e| ApiError::BadRequest(format!("could not decode image: {e}")))
}
