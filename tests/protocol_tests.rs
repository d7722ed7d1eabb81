#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Wire-format tests against literal JSON as the game server sends it.

use paddle_sync_client::protocol::{
    Ball, ClientMessage, GamePhase, MoveTarget, Player, RoomState, ServerMessage, StatePatch,
};
use paddle_sync_client::snapshot::{BallField, RoomSnapshot, StateChange};

fn parse(json: &str) -> ServerMessage {
    serde_json::from_str(json).unwrap_or_else(|e| panic!("failed to parse {json}: {e}"))
}

// ── Server → client ─────────────────────────────────────────────────

#[test]
fn joined_with_full_state() {
    let msg = parse(
        r#"{
            "type": "Joined",
            "data": {
                "session_id": "s1",
                "room_id": "r9",
                "state": {
                    "players": {
                        "s1": { "x": 0, "y": 160, "score": 2 },
                        "s2": { "x": 0, "y": 40, "score": 7 }
                    },
                    "ball": { "x": 300, "y": 200, "vx": -4, "vy": 3 },
                    "game_state": "playing",
                    "state_message": "Playing",
                    "countdown_time": 5,
                    "winning_score": 7
                }
            }
        }"#,
    );
    let ServerMessage::Joined {
        session_id,
        room_id,
        state,
    } = msg
    else {
        panic!("expected Joined");
    };
    assert_eq!(session_id, "s1");
    assert_eq!(room_id, "r9");
    assert_eq!(
        state.players["s2"],
        Player {
            x: 0.0,
            y: 40.0,
            score: 7,
        }
    );
    assert_eq!(
        state.ball,
        Ball {
            x: 300.0,
            y: 200.0,
            vx: -4.0,
            vy: 3.0,
        }
    );
    assert_eq!(state.game_state, GamePhase::Playing);
    assert_eq!(state.countdown_time, 5);
    assert_eq!(state.winning_score, 7);
}

#[test]
fn joined_without_state_uses_room_defaults() {
    let msg = parse(r#"{"type":"Joined","data":{"session_id":"s1","room_id":"r1"}}"#);
    let ServerMessage::Joined { state, .. } = msg else {
        panic!("expected Joined");
    };
    assert_eq!(state, RoomState::default());
    assert_eq!(state.state_message, "Waiting for players...");
    assert_eq!(state.game_state, GamePhase::WaitingForPlayers);
}

#[test]
fn sparse_patch_leaves_other_fields_absent() {
    let msg = parse(r#"{"type":"Patch","data":{"ball":{"x":12.5},"players":{"s2":{"score":3}}}}"#);
    let ServerMessage::Patch(patch) = msg else {
        panic!("expected Patch");
    };
    let ball = patch.ball.unwrap();
    assert_eq!(ball.x, Some(12.5));
    assert_eq!(ball.vx, None);
    assert_eq!(patch.players["s2"].score, Some(3));
    assert_eq!(patch.players["s2"].y, None);
    assert_eq!(patch.game_state, None);
}

#[test]
fn every_phase_name_round_trips() {
    for (wire, phase) in [
        ("waiting_for_players", GamePhase::WaitingForPlayers),
        ("starting", GamePhase::Starting),
        ("countdown", GamePhase::Countdown),
        ("playing", GamePhase::Playing),
        ("point_scored", GamePhase::PointScored),
        ("game_over", GamePhase::GameOver),
    ] {
        let json = format!(r#"{{"type":"Patch","data":{{"game_state":"{wire}"}}}}"#);
        let ServerMessage::Patch(patch) = parse(&json) else {
            panic!("expected Patch");
        };
        assert_eq!(patch.game_state.as_ref(), Some(&phase));
        assert_eq!(phase.as_str(), wire);
    }
}

#[test]
fn failures_and_membership() {
    assert_eq!(
        parse(r#"{"type":"JoinFailed","data":{"reason":"no rooms"}}"#),
        ServerMessage::JoinFailed {
            reason: "no rooms".into()
        }
    );
    assert_eq!(
        parse(r#"{"type":"PlayerRemoved","data":{"session_id":"s2"}}"#),
        ServerMessage::PlayerRemoved {
            session_id: "s2".into()
        }
    );
    assert_eq!(
        parse(r#"{"type":"PlayerAdded","data":{"session_id":"s2","player":{"y":160}}}"#),
        ServerMessage::PlayerAdded {
            session_id: "s2".into(),
            player: Player {
                x: 0.0,
                y: 160.0,
                score: 0,
            },
        }
    );
    assert_eq!(
        parse(r#"{"type":"Error","data":{"message":"bad move"}}"#),
        ServerMessage::Error {
            message: "bad move".into()
        }
    );
}

#[test]
fn unknown_message_type_is_rejected() {
    assert!(serde_json::from_str::<ServerMessage>(r#"{"type":"Teleport","data":{}}"#).is_err());
    assert!(serde_json::from_str::<ServerMessage>("[1,2,3]").is_err());
}

// ── Client → server ─────────────────────────────────────────────────

#[test]
fn outbound_commands_match_wire_names() {
    let cases = [
        (
            ClientMessage::JoinRoom {
                room_name: "pong".into(),
            },
            r#"{"type":"JoinRoom","data":{"room_name":"pong"}}"#,
        ),
        (
            ClientMessage::CreateRoom {
                room_name: "pong".into(),
            },
            r#"{"type":"CreateRoom","data":{"room_name":"pong"}}"#,
        ),
        (
            ClientMessage::Move(MoveTarget::Vertical { y: 120.0 }),
            r#"{"type":"Move","data":{"y":120.0}}"#,
        ),
        (
            ClientMessage::Move(MoveTarget::Horizontal { x: 0.0 }),
            r#"{"type":"Move","data":{"x":0.0}}"#,
        ),
        (ClientMessage::Restart, r#"{"type":"Restart"}"#),
        (ClientMessage::Join, r#"{"type":"Join"}"#),
        (ClientMessage::Leave, r#"{"type":"Leave"}"#),
    ];
    for (message, expected) in cases {
        assert_eq!(serde_json::to_string(&message).unwrap(), expected);
    }
}

// ── Wire → snapshot ─────────────────────────────────────────────────

#[test]
fn wire_patch_applies_ball_and_velocity_together() {
    let mut snapshot = RoomSnapshot::new();
    snapshot.join("s1".into(), "r1".into(), RoomState::default());

    let ServerMessage::Patch(patch) =
        parse(r#"{"type":"Patch","data":{"ball":{"x":50,"vx":-3}}}"#)
    else {
        panic!("expected Patch");
    };
    let changes = snapshot.apply_patch(patch);
    assert_eq!(
        changes,
        vec![
            StateChange::Ball {
                field: BallField::X,
                value: 50.0
            },
            StateChange::Ball {
                field: BallField::Vx,
                value: -3.0
            },
        ]
    );
    assert_eq!(snapshot.ball().unwrap().vx, -3.0);
    assert!(snapshot.apply_patch(StatePatch::default()).is_empty());
}
