//! `/rag/*` handlers over the keyword knowledge base

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppContext};
use crate::knowledge::KnowledgeAnswer;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RagStatus {
    pub status: &'static str,
    pub entries: usize,
    pub mode: &'static str,
}

pub async fn query(
    State(ctx): State<AppContext>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<KnowledgeAnswer>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    Ok(Json(ctx.knowledge.query(&req.query)))
}

pub async fn status(State(ctx): State<AppContext>) -> Json<RagStatus> {
    Json(RagStatus {
        status: "ready",
        entries: ctx.knowledge.len(),
        mode: "keyword",
    })
}
