//! HTTP and WebSocket surface.
//!
//! Handlers map requests onto the [`AppContext`] built once at startup; they
//! hold no state of their own.

pub mod health;
pub mod rag;
pub mod stream;
pub mod vision;
pub mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::capture::CameraSource;
use crate::knowledge::KnowledgeBase;
use crate::pipeline::StreamManager;
use crate::render::FrameAnnotator;
use crate::vision::{DetectionProvider, TextExtractionProvider};
use crate::Config;

/// Everything the handlers need, shared across requests
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub manager: Arc<StreamManager>,
    pub detector: Arc<DetectionProvider>,
    pub ocr: Arc<TextExtractionProvider>,
    pub knowledge: Arc<KnowledgeBase>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppContext {
    pub fn new(
        config: Config,
        source: Arc<dyn CameraSource>,
        detector: DetectionProvider,
        ocr: TextExtractionProvider,
        knowledge: KnowledgeBase,
    ) -> Self {
        let detector = Arc::new(detector);
        let ocr = Arc::new(ocr);
        let annotator = Arc::new(FrameAnnotator::from_config(&config.annotate));

        let manager = Arc::new(StreamManager::new(
            source,
            config.capture.clone(),
            config.pipeline.clone(),
            detector.clone(),
            ocr.clone(),
            annotator,
        ));

        Self {
            config: Arc::new(config),
            manager,
            detector,
            ocr,
            knowledge: Arc::new(knowledge),
            started_at: chrono::Utc::now(),
        }
    }
}

/// Build the router with all routes.
pub fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/stream/start", post(stream::start))
        .route("/stream/stop", post(stream::stop))
        .route("/stream/status", get(stream::status))
        .route("/stream/frame", get(stream::frame))
        .route("/stream/frame/image", get(stream::frame_image))
        .route("/stream/history", get(stream::history))
        .route("/stream/ws", get(ws::stream_ws))
        .route("/vision/status", get(vision::status))
        .route("/vision/detect/image", post(vision::detect_blank))
        .route("/vision/detect/upload", post(vision::detect_upload))
        .route("/vision/ocr/upload", post(vision::ocr_upload))
        .route("/rag/query", post(rag::query))
        .route("/rag/status", get(rag::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Field Intelligence Backend API" }))
}

/// Converted to `{status: "error", message}` with a matching status code
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "status": "error", "message": self.to_string() });
        (code, Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {e}"))
    }
}
