//! `/stream/ws`: push processed frames to a live client

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::stream::FrameView;
use super::AppContext;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage<'a> {
    Frame(FrameView<'a>),
}

pub async fn stream_ws(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, ctx))
}

async fn handle_connection(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let mut pacing = tokio::time::interval(ctx.config.pipeline.ws_interval());
    pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent = 0u64;

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            bundle = ctx.manager.next_frame() => {
                let Some(bundle) = bundle else { break };

                let json = match serde_json::to_string(&WsMessage::Frame(FrameView::new(&bundle))) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize frame {}: {}", bundle.frame_id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
                sent += 1;
                pacing.tick().await;
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(other)) => debug!("Ignoring client message: {:?}", other),
            }
        }
    }

    info!(frames = sent, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::queue::tests::bundle;

    #[test]
    fn frame_message_is_tagged_and_flat() {
        let bundle = bundle(12, 1, 2);
        let json = serde_json::to_value(WsMessage::Frame(FrameView::new(&bundle))).unwrap();

        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "detection_result",
                "frame_base64",
                "frame_id",
                "ocr_result",
                "timestamp",
                "type"
            ]
        );
        assert_eq!(json["type"], "frame");
        assert_eq!(json["frame_id"], 12);
        assert_eq!(json["ocr_result"]["total_texts"], 2);
    }
}
