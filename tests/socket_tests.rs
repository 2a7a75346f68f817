// Integration tests for the /ws/speech socket
//
// These tests serve the real router on a local port and talk to it with a
// WebSocket client, so the socket loop itself is exercised: binary audio in,
// JSON text frames out, and teardown on either side.

mod common;

use anyhow::Result;
use common::{transcript, MockRecognizer};
use futures::{SinkExt, StreamExt};
use speech_gateway::recognizer::StreamingRequest;
use speech_gateway::session::{MediatorState, Session, SessionRegistry};
use speech_gateway::{create_router, AppState, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn serve(state: AppState) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = create_router(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

async fn only_session(registry: &SessionRegistry) -> Arc<Session> {
    wait_until("the session to attach", || registry.len() == 1).await;
    let id = registry.snapshot()[0].session_id.clone();
    registry.get(&id).expect("session vanished")
}

#[tokio::test]
async fn test_socket_relays_transcripts_as_text() -> Result<()> {
    let (recognizer, mut calls) = MockRecognizer::new(32);
    let state = AppState::new(&Config::defaults()?, recognizer);
    let registry = Arc::clone(&state.sessions);
    let addr = serve(state).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws/speech", addr)).await?;
    let mut call = calls.recv().await.expect("no streaming call was opened");
    let session = only_session(&registry).await;

    for fill in [1u8, 2, 3] {
        ws.send(Message::binary(vec![fill; 8192])).await?;
    }

    let first = call.next_request().await.unwrap();
    assert!(first.is_config());
    for fill in [1u8, 2, 3] {
        assert_eq!(
            call.next_request().await.unwrap(),
            StreamingRequest::Audio(vec![fill; 8192])
        );
    }

    call.respond(transcript("안녕", false)).await;
    call.respond(transcript("안녕하세요", true)).await;

    let mut frames = Vec::new();
    while frames.len() < 2 {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await?
            .expect("socket closed early")?;
        assert!(msg.is_text(), "unexpected frame: {:?}", msg);
        frames.push(serde_json::from_str::<serde_json::Value>(msg.to_text()?)?);
    }
    assert_eq!(frames[0]["transcript"], "안녕");
    assert_eq!(frames[0]["isFinal"], false);
    assert_eq!(frames[1]["transcript"], "안녕하세요");
    assert_eq!(frames[1]["isFinal"], true);

    ws.close(None).await?;

    wait_until("the session to detach", || registry.is_empty()).await;
    assert!(call.drain().await.is_empty());
    call.complete();

    timeout(Duration::from_secs(5), session.mediator.closed()).await?;
    assert_eq!(session.mediator.state(), MediatorState::Closed);
    assert_eq!(session.mediator.transcripts_delivered(), 2);

    Ok(())
}

#[tokio::test]
async fn test_recognizer_failure_closes_socket() -> Result<()> {
    let (recognizer, mut calls) = MockRecognizer::new(32);
    let state = AppState::new(&Config::defaults()?, recognizer);
    let registry = Arc::clone(&state.sessions);
    let addr = serve(state).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws/speech", addr)).await?;
    let mut call = calls.recv().await.expect("no streaming call was opened");
    let session = only_session(&registry).await;

    ws.send(Message::binary(vec![9u8; 8192])).await?;
    assert!(call.next_request().await.unwrap().is_config());
    call.next_request().await;

    call.fail("quota exceeded").await;

    // The server ends the conversation without any transcript
    let mut texts = 0;
    timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(msg) if msg.is_text() => texts += 1,
                Ok(_) => {}
            }
        }
    })
    .await?;
    assert_eq!(texts, 0);

    wait_until("the session to detach", || registry.is_empty()).await;
    assert_eq!(session.mediator.state(), MediatorState::Closed);

    Ok(())
}
