mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::{SinkExt, StreamExt};
use image::{ImageFormat, RgbImage};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use common::{wait_for, FakeSource};
use fieldglass::api::{self, AppContext};
use fieldglass::knowledge::KnowledgeBase;
use fieldglass::vision::{DetectionProvider, SimulatedOcr, TextExtractionProvider};
use fieldglass::Config;

fn context(source: FakeSource) -> AppContext {
    AppContext::new(
        Config::default(),
        Arc::new(source),
        DetectionProvider::unavailable("test"),
        TextExtractionProvider::new(Box::new(SimulatedOcr::default())),
        KnowledgeBase::default(),
    )
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::GET, uri, Body::empty()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_bytes(app: &Router, uri: &str, payload: Vec<u8>) -> (StatusCode, Value) {
    let (status, body) = send(app, Method::POST, uri, Body::from(payload)).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[tokio::test]
async fn root_and_health() {
    let app = api::router(context(FakeSource::endless()));

    let (status, body) = get_json(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["streaming"], false);
    assert_eq!(body["detector_mode"], "mock");

    let (_, body) = get_json(&app, "/health/ready").await;
    assert_eq!(body["status"], "ready");
    let (_, body) = get_json(&app, "/health/live").await;
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn frame_before_start_is_no_frame() {
    let app = api::router(context(FakeSource::endless()));

    let (status, body) = get_json(&app, "/stream/frame").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "no_frame" }));

    let (_, body) = get_json(&app, "/stream/frame/image").await;
    assert_eq!(body["status"], "no_frame");

    let (_, body) = get_json(&app, "/stream/status").await;
    assert_eq!(body["is_streaming"], false);
    assert_eq!(body["frame_count"], 0);
    assert_eq!(body["queue_size"], 0);
}

#[tokio::test]
async fn start_failure_is_reported() {
    let app = api::router(context(FakeSource::unopenable()));

    let (status, body) = post_json(&app, "/stream/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert!(body["message"].is_string());

    let (_, body) = get_json(&app, "/stream/status").await;
    assert_eq!(body["is_streaming"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stream_lifecycle_over_http() {
    let ctx = context(FakeSource::endless());
    let manager = ctx.manager.clone();
    let app = api::router(ctx);

    let (_, body) = post_json(&app, "/stream/start", json!({})).await;
    assert_eq!(body["status"], "success");
    let (_, body) = post_json(&app, "/stream/start", json!({})).await;
    assert_eq!(body["status"], "already_streaming");

    let ready = {
        let manager = manager.clone();
        tokio::task::spawn_blocking(move || {
            wait_for(Duration::from_secs(5), || {
                manager.status().frame_count >= 12 && manager.status().queue_size >= 2
            })
        })
        .await
        .unwrap()
    };
    assert!(ready);

    let (_, body) = get_json(&app, "/stream/frame").await;
    assert_eq!(body["status"], "success");
    assert!(body["frame_id"].as_u64().unwrap() >= 1);
    assert!(!body["frame_base64"].as_str().unwrap().is_empty());
    assert_eq!(body["detection_result"]["status"], "mock_mode");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/stream/frame/image")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let (_, body) = get_json(&app, "/stream/history?limit=3").await;
    assert_eq!(body["history"].as_array().unwrap().len(), 3);
    assert!(body["total_frames"].as_u64().unwrap() >= 12);

    let (_, body) = post_json(&app, "/stream/stop", json!({})).await;
    assert_eq!(body["status"], "success");
    let (_, body) = get_json(&app, "/stream/status").await;
    assert_eq!(body["is_streaming"], false);
}

#[tokio::test]
async fn vision_status_reports_mock_mode() {
    let app = api::router(context(FakeSource::endless()));

    let (_, body) = get_json(&app, "/vision/status").await;
    assert_eq!(body["status"], "mock_mode");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["ocr_available"], true);

    let (status, body) = post_bytes(&app, "/vision/detect/image", Vec::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["objects"][0]["label"], "person");
    assert_eq!(body["resolution"], json!([640, 480]));
}

#[tokio::test]
async fn uploads_are_decoded() {
    let app = api::router(context(FakeSource::endless()));

    let (status, body) = post_bytes(&app, "/vision/detect/upload", png(320, 240)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "mock_mode");
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);

    let (status, body) = post_bytes(&app, "/vision/ocr/upload", png(400, 240)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["total_texts"], 2);
}

#[tokio::test]
async fn garbage_upload_is_rejected() {
    let app = api::router(context(FakeSource::endless()));

    let (status, body) = post_bytes(&app, "/vision/detect/upload", b"not an image".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, _) = post_bytes(&app, "/vision/ocr/upload", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn knowledge_queries() {
    let app = api::router(context(FakeSource::endless()));

    let (status, body) = post_json(&app, "/rag/query", json!({ "query": "What is YOLO?" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["confidence"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    assert_eq!(body["sources"][0]["source"], "knowledge_base_yolo");

    let (_, body) = post_json(&app, "/rag/query", json!({ "query": "zzqx" })).await;
    assert_eq!(body["confidence"].as_f64().unwrap(), 0.0);
    assert_eq!(body["sources"][0]["source"], "no_match");

    let (status, body) = post_json(&app, "/rag/query", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (_, body) = get_json(&app, "/rag/status").await;
    assert_eq!(body["entries"], 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn websocket_pushes_frames_until_client_closes() {
    let ctx = context(FakeSource::endless());
    let manager = ctx.manager.clone();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, api::router(ctx)).await });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/stream/ws"))
        .await
        .unwrap();

    let starter = manager.clone();
    tokio::task::spawn_blocking(move || starter.start())
        .await
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no frame pushed within timeout")
        .unwrap()
        .unwrap();
    let body: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
    assert_eq!(body["type"], "frame");
    assert!(body["frame_id"].as_u64().unwrap() >= 1);
    assert!(!body["frame_base64"].as_str().unwrap().is_empty());
    assert_eq!(body["detection_result"]["status"], "mock_mode");
    assert!(body["ocr_result"].is_object());

    socket.send(Message::Close(None)).await.unwrap();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(message)) = socket.next().await {
            if message.is_close() {
                break;
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "server kept the socket open after close");

    tokio::task::spawn_blocking(move || manager.stop())
        .await
        .unwrap();
    server.abort();
}
