#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for paddle sync client integration tests.
//!
//! Provides a scripted [`MockTransport`] and helpers that build the server
//! messages a match is made of.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use paddle_sync_client::protocol::{
    BallPatch, GamePhase, Player, PlayerPatch, RoomState, ServerMessage, StatePatch,
};
use paddle_sync_client::{PongClientError, PongEvent, Transport};
use tokio::sync::mpsc;

pub type Scripted = Option<Result<String, PongClientError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Scripted server responses are consumed in order by `recv()`; once they
/// run out, `recv()` pends forever. Everything the client sends is recorded.
pub struct MockTransport {
    incoming: VecDeque<Scripted>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new(incoming: Vec<Scripted>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, sent, closed)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), PongClientError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, PongClientError>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else {
            std::future::pending().await
        }
    }

    async fn close(&mut self) -> Result<(), PongClientError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── Server message builders ─────────────────────────────────────────

pub fn to_json(msg: &ServerMessage) -> Scripted {
    Some(Ok(serde_json::to_string(msg).unwrap()))
}

pub fn player(x: f64, y: f64, score: u32) -> Player {
    Player { x, y, score }
}

/// `Joined` for `local`, with every `(id, player)` already in the room.
pub fn joined_json(local: &str, players: &[(&str, Player)]) -> Scripted {
    let mut state = RoomState::default();
    for (id, p) in players {
        state.players.insert((*id).to_string(), *p);
    }
    to_json(&ServerMessage::Joined {
        session_id: local.into(),
        room_id: "room-1".into(),
        state,
    })
}

pub fn join_failed_json(reason: &str) -> Scripted {
    to_json(&ServerMessage::JoinFailed {
        reason: reason.into(),
    })
}

pub fn player_added_json(id: &str, p: Player) -> Scripted {
    to_json(&ServerMessage::PlayerAdded {
        session_id: id.into(),
        player: p,
    })
}

pub fn phase_json(phase: GamePhase, status: &str) -> Scripted {
    to_json(&ServerMessage::Patch(StatePatch {
        game_state: Some(phase),
        state_message: Some(status.into()),
        ..StatePatch::default()
    }))
}

pub fn status_json(status: &str) -> Scripted {
    to_json(&ServerMessage::Patch(StatePatch {
        state_message: Some(status.into()),
        ..StatePatch::default()
    }))
}

pub fn ball_json(x: Option<f64>, vx: Option<f64>) -> Scripted {
    to_json(&ServerMessage::Patch(StatePatch {
        ball: Some(BallPatch {
            x,
            vx,
            ..BallPatch::default()
        }),
        ..StatePatch::default()
    }))
}

pub fn paddle_json(id: &str, y: f64) -> Scripted {
    let mut players = BTreeMap::new();
    players.insert(
        id.to_string(),
        PlayerPatch {
            y: Some(y),
            ..PlayerPatch::default()
        },
    );
    to_json(&ServerMessage::Patch(StatePatch {
        players,
        ..StatePatch::default()
    }))
}

// ── Event helpers ───────────────────────────────────────────────────

/// Collect events until the stream has been quiet for `quiet`.
pub async fn drain(events: &mut mpsc::Receiver<PongEvent>, quiet: Duration) -> Vec<PongEvent> {
    let mut seen = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(quiet, events.recv()).await {
        seen.push(event);
    }
    seen
}

/// Collect events up to and including `Disconnected`.
pub async fn until_disconnected(events: &mut mpsc::Receiver<PongEvent>) -> Vec<PongEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = matches!(event, PongEvent::Disconnected { .. });
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

/// The `type` tag of every recorded outgoing message.
pub fn sent_types(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<String> {
    sent.lock()
        .unwrap()
        .iter()
        .map(|m| {
            let value: serde_json::Value = serde_json::from_str(m).unwrap();
            value["type"].as_str().unwrap().to_string()
        })
        .collect()
}
