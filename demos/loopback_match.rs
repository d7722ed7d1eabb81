//! # Loopback Match
//!
//! Plays a short scripted match against an in-process "server" and renders
//! it onto a text surface. Shows the join → create fallback, inferred cues,
//! overlay changes and speculative paddle moves without any network.
//!
//! ## Running
//!
//! ```sh
//! RUST_LOG=debug cargo run --example loopback_match
//! ```

use std::time::Duration;

use async_trait::async_trait;
use paddle_sync_client::render::{DrawCommand, Surface};
use paddle_sync_client::{
    ClientConfig, ClientVariant, InputEvent, PongClient, PongClientError, PongEvent, Transport,
};
use serde_json::json;
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Loopback transport
// ─────────────────────────────────────────────────────────────────────

struct LoopbackTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

struct LoopbackServer {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackServer {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), PongClientError> {
        self.tx
            .send(message)
            .map_err(|e| PongClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, PongClientError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), PongClientError> {
        self.rx.close();
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Scripted server
// ─────────────────────────────────────────────────────────────────────

async fn expect_type(server: &mut LoopbackServer, expected: &str) -> Result<(), String> {
    let raw = server.rx.recv().await.ok_or("client went away")?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
    if value["type"] == expected {
        tracing::info!("server <- {raw}");
        Ok(())
    } else {
        Err(format!("expected {expected}, got {raw}"))
    }
}

fn patch(data: serde_json::Value) -> String {
    json!({ "type": "Patch", "data": data }).to_string()
}

async fn run_server(mut server: LoopbackServer) -> Result<(), String> {
    let send = |tx: &mpsc::UnboundedSender<String>, msg: String| {
        tx.send(msg).map_err(|e| e.to_string())
    };
    let beat = || tokio::time::sleep(Duration::from_millis(120));

    expect_type(&mut server, "JoinRoom").await?;
    send(
        &server.tx,
        json!({ "type": "JoinFailed", "data": { "reason": "no open rooms" } }).to_string(),
    )?;

    expect_type(&mut server, "CreateRoom").await?;
    send(
        &server.tx,
        json!({
            "type": "Joined",
            "data": {
                "session_id": "p1",
                "room_id": "demo",
                "state": { "players": { "p1": { "x": 0, "y": 160, "score": 0 } } }
            }
        })
        .to_string(),
    )?;
    beat().await;

    send(
        &server.tx,
        json!({
            "type": "PlayerAdded",
            "data": { "session_id": "p2", "player": { "x": 0, "y": 160 } }
        })
        .to_string(),
    )?;
    send(&server.tx, patch(json!({ "game_state": "countdown", "state_message": "3" })))?;
    beat().await;
    send(&server.tx, patch(json!({ "game_state": "playing", "state_message": "Playing" })))?;

    // Ball crosses the table and bounces off p2's paddle.
    for x in [320.0, 400.0, 480.0, 560.0] {
        send(&server.tx, patch(json!({ "ball": { "x": x, "y": 200, "vx": 8, "vy": 0 } })))?;
        beat().await;
    }
    send(&server.tx, patch(json!({ "ball": { "x": 552, "vx": -8 } })))?;
    beat().await;
    send(&server.tx, patch(json!({ "ball": { "x": 540 } })))?;

    send(
        &server.tx,
        patch(json!({
            "game_state": "point_scored",
            "state_message": "p1 scores!",
            "players": { "p1": { "score": 1 } }
        })),
    )?;
    beat().await;
    send(
        &server.tx,
        patch(json!({ "game_state": "game_over", "state_message": "p1 wins!" })),
    )?;
    beat().await;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Text surface
// ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct TextSurface {
    frame: Vec<String>,
}

impl Surface for TextSurface {
    fn draw(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::Fill { rect, .. } if rect.x == 0.0 && rect.y == 0.0 => {
                if !self.frame.is_empty() {
                    tracing::trace!("frame: {}", self.frame.join(" | "));
                }
                self.frame.clear();
            }
            DrawCommand::Fill { rect, .. } => {
                self.frame.push(format!("paddle@({:.0},{:.0})", rect.x, rect.y));
            }
            DrawCommand::Circle { center, .. } => {
                self.frame.push(format!("ball@({:.0},{:.0})", center.0, center.1));
            }
            DrawCommand::Text { text, .. } => self.frame.push(text.clone()),
            DrawCommand::DashedLine { .. } => {}
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, server) = loopback_pair();
    let server_task = tokio::spawn(run_server(server));

    let config = ClientConfig::new("pong").with_variant(ClientVariant::Classic);
    let (mut client, mut events) = PongClient::start(transport, config);
    let render_task = client.render_loop().spawn(TextSurface::default());

    while let Some(event) = events.recv().await {
        match event {
            PongEvent::Status(status) => tracing::info!("status: {status}"),
            PongEvent::Cue(cue) => tracing::info!("cue: {cue:?} -> {:?}", cue.tone()),
            PongEvent::OverlayChanged(overlay) => tracing::info!("overlay: {overlay:?}"),
            PongEvent::State(change) => {
                tracing::debug!("state: {change:?}");
                if let paddle_sync_client::snapshot::StateChange::PlayerAdded { .. } = change {
                    let sent = client.handle_input(InputEvent::KeyDown("ArrowUp".into()))?;
                    tracing::info!("speculative move: {sent:?}");
                }
            }
            PongEvent::MatchmakingFailed { reason } => {
                tracing::error!("matchmaking failed: {reason}");
                break;
            }
            PongEvent::Disconnected { reason } => {
                tracing::info!("disconnected: {reason:?}");
                break;
            }
            PongEvent::Connected | PongEvent::ServerError { .. } => {}
        }
        if server_task.is_finished() {
            break;
        }
    }

    match server_task.await? {
        Ok(()) => tracing::info!("script finished"),
        Err(e) => tracing::error!("script failed: {e}"),
    }
    client.shutdown().await;
    render_task.await?;
    Ok(())
}
