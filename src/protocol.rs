//! Wire types exchanged with the authoritative game server.
//!
//! All messages are JSON, adjacently tagged as `{"type": "...", "data": {...}}`.
//! Coordinates are canonical table coordinates: the single, orientation-free
//! space the server simulates in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Type aliases ────────────────────────────────────────────────────

/// Opaque per-connection identifier assigned by the server.
pub type SessionId = String;

/// Identifier of a game room.
pub type RoomId = String;

// ── Game phase ──────────────────────────────────────────────────────

/// High-level stage of a match.
///
/// Phases are received from the server, never computed locally. Values the
/// client does not know are kept verbatim in [`GamePhase::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GamePhase {
    #[default]
    WaitingForPlayers,
    Starting,
    Countdown,
    Playing,
    PointScored,
    GameOver,
    Other(String),
}

impl GamePhase {
    /// Wire name of this phase.
    pub fn as_str(&self) -> &str {
        match self {
            Self::WaitingForPlayers => "waiting_for_players",
            Self::Starting => "starting",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::PointScored => "point_scored",
            Self::GameOver => "game_over",
            Self::Other(raw) => raw,
        }
    }

    /// Returns `true` for phases this client has no behavior for.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl From<String> for GamePhase {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "waiting_for_players" => Self::WaitingForPlayers,
            "starting" => Self::Starting,
            "countdown" => Self::Countdown,
            "playing" => Self::Playing,
            "point_scored" => Self::PointScored,
            "game_over" => Self::GameOver,
            _ => Self::Other(raw),
        }
    }
}

impl From<GamePhase> for String {
    fn from(phase: GamePhase) -> Self {
        match phase {
            GamePhase::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── State ───────────────────────────────────────────────────────────

/// A seated participant as mirrored from the server.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub score: u32,
}

/// Ball position and velocity in canonical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ball {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
}

fn default_state_message() -> String {
    "Waiting for players...".to_owned()
}

fn default_countdown_time() -> u32 {
    3
}

fn default_winning_score() -> u32 {
    10
}

/// Full room state, sent once when the server accepts a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomState {
    #[serde(default)]
    pub players: BTreeMap<SessionId, Player>,
    #[serde(default)]
    pub ball: Ball,
    #[serde(default)]
    pub game_state: GamePhase,
    #[serde(default = "default_state_message")]
    pub state_message: String,
    #[serde(default = "default_countdown_time")]
    pub countdown_time: u32,
    #[serde(default = "default_winning_score")]
    pub winning_score: u32,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            players: BTreeMap::new(),
            ball: Ball::default(),
            game_state: GamePhase::default(),
            state_message: default_state_message(),
            countdown_time: default_countdown_time(),
            winning_score: default_winning_score(),
        }
    }
}

// ── Deltas ──────────────────────────────────────────────────────────

/// Field-level changes to a single player. Absent fields are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Field-level changes to the ball. Absent fields are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
}

/// An incremental state delta. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub players: BTreeMap<SessionId, PlayerPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<BallPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GamePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_score: Option<u32>,
}

// ── Messages ────────────────────────────────────────────────────────

/// Paddle target sent with a `Move` command.
///
/// Horizontal paddles move along `y`; vertical paddles move along `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveTarget {
    Vertical { y: f64 },
    Horizontal { x: f64 },
}

impl MoveTarget {
    /// The coordinate carried by this target, whichever axis it is on.
    pub fn position(self) -> f64 {
        match self {
            Self::Vertical { y } => y,
            Self::Horizontal { x } => x,
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Join an existing room by name.
    JoinRoom { room_name: String },
    /// Create a new room; sent only after `JoinRoom` was rejected.
    CreateRoom { room_name: String },
    /// Move the local paddle to a position along its axis.
    Move(MoveTarget),
    /// Ask the server to start a new match after game over.
    Restart,
    /// Signal readiness from the lobby.
    Join,
    /// Leave the room.
    Leave,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// A join or create request was accepted.
    Joined {
        session_id: SessionId,
        room_id: RoomId,
        #[serde(default)]
        state: RoomState,
    },
    /// A join or create request was rejected.
    JoinFailed { reason: String },
    /// A participant entered the room.
    PlayerAdded {
        session_id: SessionId,
        player: Player,
    },
    /// A participant left the room.
    PlayerRemoved { session_id: SessionId },
    /// Incremental state delta.
    Patch(StatePatch),
    /// Server-side error.
    Error { message: String },
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn phases_parse_from_wire_names() {
        let phase: GamePhase = serde_json::from_str(r#""point_scored""#).unwrap();
        assert_eq!(phase, GamePhase::PointScored);
        assert_eq!(serde_json::to_string(&GamePhase::GameOver).unwrap(), r#""game_over""#);
    }

    #[test]
    fn unknown_phase_is_kept_verbatim() {
        let phase: GamePhase = serde_json::from_str(r#""overtime""#).unwrap();
        assert_eq!(phase, GamePhase::Other("overtime".into()));
        assert!(phase.is_unrecognized());
        assert_eq!(serde_json::to_string(&phase).unwrap(), r#""overtime""#);
    }

    #[test]
    fn move_serializes_single_axis_payload() {
        let json = serde_json::to_string(&ClientMessage::Move(MoveTarget::Vertical { y: 40.0 }))
            .unwrap();
        assert_eq!(json, r#"{"type":"Move","data":{"y":40.0}}"#);

        let json =
            serde_json::to_string(&ClientMessage::Move(MoveTarget::Horizontal { x: 12.5 }))
                .unwrap();
        assert_eq!(json, r#"{"type":"Move","data":{"x":12.5}}"#);
    }

    #[test]
    fn unit_commands_have_no_data() {
        assert_eq!(
            serde_json::to_string(&ClientMessage::Restart).unwrap(),
            r#"{"type":"Restart"}"#
        );
    }

    #[test]
    fn sparse_patch_decodes_with_defaults() {
        let json = r#"{"type":"Patch","data":{"ball":{"x":90.0},"players":{"abc":{"score":2}}}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Patch(patch) = msg else {
            panic!("expected Patch");
        };
        assert_eq!(patch.ball.unwrap().x, Some(90.0));
        assert_eq!(patch.ball.unwrap().vx, None);
        assert_eq!(patch.players["abc"].score, Some(2));
        assert!(patch.game_state.is_none());
    }

    #[test]
    fn joined_without_state_uses_room_defaults() {
        let json = r#"{"type":"Joined","data":{"session_id":"s1","room_id":"r1"}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Joined { state, .. } = msg else {
            panic!("expected Joined");
        };
        assert_eq!(state.game_state, GamePhase::WaitingForPlayers);
        assert_eq!(state.state_message, "Waiting for players...");
        assert_eq!(state.countdown_time, 3);
        assert_eq!(state.winning_score, 10);
    }
}
