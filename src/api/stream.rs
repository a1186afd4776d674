//! `/stream/*` handlers

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppContext};
use crate::pipeline::{FrameBundle, HistoryPage, StartOutcome, StreamStatus};
use crate::render::to_base64;
use crate::vision::{DetectionResult, OcrResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamReply {
    pub status: String,
    pub message: String,
}

impl StreamReply {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

/// Frame fields shared by the HTTP pull and the WebSocket push
#[derive(Debug, Serialize)]
pub struct FrameView<'a> {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub frame_base64: String,
    pub detection_result: &'a DetectionResult,
    pub ocr_result: &'a OcrResult,
}

impl<'a> FrameView<'a> {
    pub fn new(bundle: &'a FrameBundle) -> Self {
        Self {
            frame_id: bundle.frame_id,
            timestamp: bundle.timestamp,
            frame_base64: to_base64(&bundle.jpeg),
            detection_result: &bundle.detection_result,
            ocr_result: &bundle.ocr_result,
        }
    }
}

#[derive(Serialize)]
struct FrameReply<'a> {
    status: &'static str,
    #[serde(flatten)]
    frame: FrameView<'a>,
}

fn no_frame() -> Response {
    Json(serde_json::json!({ "status": "no_frame" })).into_response()
}

pub async fn start(State(ctx): State<AppContext>) -> Result<Json<StreamReply>, ApiError> {
    let manager = ctx.manager.clone();
    let outcome = tokio::task::spawn_blocking(move || manager.start()).await?;

    Ok(Json(match outcome {
        StartOutcome::Started => StreamReply::new("success", "stream started"),
        StartOutcome::AlreadyStreaming => {
            StreamReply::new("already_streaming", "stream is already running")
        }
        StartOutcome::Failed(message) => StreamReply::new("error", message),
    }))
}

pub async fn stop(State(ctx): State<AppContext>) -> Result<Json<StreamReply>, ApiError> {
    let manager = ctx.manager.clone();
    let outcome = tokio::task::spawn_blocking(move || manager.stop()).await?;

    let message = if outcome.was_streaming {
        "stream stopped"
    } else {
        "stream was not running"
    };
    Ok(Json(StreamReply::new("success", message)))
}

pub async fn status(State(ctx): State<AppContext>) -> Json<StreamStatus> {
    Json(ctx.manager.status())
}

pub async fn frame(State(ctx): State<AppContext>) -> Response {
    let Some(bundle) = ctx.manager.latest_frame() else {
        return no_frame();
    };
    Json(FrameReply {
        status: "success",
        frame: FrameView::new(&bundle),
    })
    .into_response()
}

pub async fn frame_image(State(ctx): State<AppContext>) -> Result<Response, ApiError> {
    let Some(bundle) = ctx.manager.latest_frame() else {
        return Ok(no_frame());
    };
    if bundle.jpeg.is_empty() {
        return Err(ApiError::Internal(format!(
            "frame {} could not be encoded",
            bundle.frame_id
        )));
    }

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bundle.jpeg.clone(),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn history(
    State(ctx): State<AppContext>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryPage> {
    let limit = params
        .limit
        .unwrap_or(ctx.config.pipeline.history_window);
    Json(ctx.manager.history(limit))
}
