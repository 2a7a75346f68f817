use super::state::AppState;
use crate::error::SpeechError;
use crate::session::{SessionHandler, SpeechSessionHandler, TranscriptSink};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outbound half of a client socket
struct SocketSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

impl SocketSink {
    fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    async fn close(&self) {
        let mut sender = self.sender.lock().await;
        let _ = sender.send(Message::Close(None)).await;
        let _ = sender.close().await;
    }
}

#[async_trait]
impl TranscriptSink for SocketSink {
    async fn send_text(&self, text: String) -> Result<(), SpeechError> {
        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| SpeechError::Transport(e.to_string()))
    }
}

/// GET /ws/speech
/// Upgrade to a duplex socket: binary audio in, JSON transcripts out
pub async fn speech_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let handler = Arc::clone(&state.socket_handler);
    ws.on_upgrade(move |socket| handle_socket(socket, handler))
}

async fn handle_socket(socket: WebSocket, handler: Arc<SpeechSessionHandler>) {
    let session_id = Uuid::new_v4().to_string();
    let (sender, mut receiver) = socket.split();
    let sink = Arc::new(SocketSink::new(sender));

    if let Err(e) = handler.on_open(&session_id, sink.clone()).await {
        warn!("[{}] Could not open session: {}", session_id, e);
        sink.close().await;
        return;
    }

    let mediator_closed = handler.wait_closed(&session_id);
    tokio::pin!(mediator_closed);

    let mut failure = None;
    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Binary(audio))) => handler.on_binary(&session_id, audio).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => debug!("[{}] Ignoring non-binary frame", session_id),
                Some(Err(e)) => {
                    failure = Some(SpeechError::Transport(e.to_string()));
                    break;
                }
            },
            _ = &mut mediator_closed => {
                info!("[{}] Recognizer call ended, closing socket", session_id);
                sink.close().await;
                break;
            }
        }
    }

    match failure {
        Some(e) => handler.on_error(&session_id, e).await,
        None => handler.on_close(&session_id).await,
    }
}
