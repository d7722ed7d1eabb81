//! Integration-style client tests.
//!
//! Uses the shared `MockTransport` from `tests/common` to script a match and
//! checks what `PongClient` reports, sends and exposes on its snapshot.

mod common;

use std::time::Duration;

use tokio_test::assert_ok;

use paddle_sync_client::inference::Outcome;
use paddle_sync_client::input::Direction;
use paddle_sync_client::perspective::Edge;
use paddle_sync_client::protocol::{GamePhase, MoveTarget};
use paddle_sync_client::render::{
    compose_frame, Color, DrawCommand, FrameOutcome, SkipReason, Surface,
};
use paddle_sync_client::snapshot::{PlayerField, StateChange};
use paddle_sync_client::{
    ClientConfig, ClientVariant, Cue, InputEvent, Intent, Overlay, PongClient, PongClientError,
    PongEvent,
};

use common::{
    ball_json, drain, join_failed_json, joined_json, paddle_json, phase_json, player,
    player_added_json, sent_types, status_json, until_disconnected, MockTransport, Scripted,
};

const QUIET: Duration = Duration::from_millis(100);

#[allow(clippy::type_complexity)]
fn start_client(
    incoming: Vec<Scripted>,
    config: ClientConfig,
) -> (
    PongClient,
    tokio::sync::mpsc::Receiver<PongEvent>,
    std::sync::Arc<std::sync::Mutex<Vec<String>>>,
) {
    let (transport, sent, _closed) = MockTransport::new(incoming);
    let (client, events) = PongClient::start(transport, config);
    (client, events, sent)
}

fn cues(events: &[PongEvent]) -> Vec<Cue> {
    events
        .iter()
        .filter_map(|e| match e {
            PongEvent::Cue(cue) => Some(*cue),
            _ => None,
        })
        .collect()
}

fn overlays(events: &[PongEvent]) -> Vec<Overlay> {
    events
        .iter()
        .filter_map(|e| match e {
            PongEvent::OverlayChanged(overlay) => Some(overlay.clone()),
            _ => None,
        })
        .collect()
}

fn two_players() -> Vec<(&'static str, paddle_sync_client::protocol::Player)> {
    vec![("A", player(0.0, 100.0, 0)), ("B", player(0.0, 200.0, 0))]
}

// ════════════════════════════════════════════════════════════════════
// Matchmaking
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_is_accepted_without_create() {
    let (mut client, mut events, sent) =
        start_client(vec![joined_json("A", &two_players())], ClientConfig::new("pong"));
    let seen = drain(&mut events, QUIET).await;

    assert_eq!(seen[0], PongEvent::Connected);
    assert_eq!(seen[1], PongEvent::Status("Connecting...".into()));
    assert_eq!(seen[2], PongEvent::Status("Connected!".into()));
    assert!(seen.contains(&PongEvent::State(StateChange::SessionAssigned {
        session_id: "A".into(),
        room_id: "room-1".into(),
    })));
    assert_eq!(sent_types(&sent), vec!["JoinRoom"]);
    assert_eq!(client.session_id().as_deref(), Some("A"));
    client.shutdown().await;
}

#[tokio::test]
async fn rejected_join_creates_room_once() {
    let (mut client, mut events, sent) = start_client(
        vec![join_failed_json("no such room"), joined_json("A", &[])],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;

    assert_eq!(sent_types(&sent), vec!["JoinRoom", "CreateRoom"]);
    assert!(seen.contains(&PongEvent::Status("Connected!".into())));
    assert!(!seen
        .iter()
        .any(|e| matches!(e, PongEvent::MatchmakingFailed { .. })));
    client.shutdown().await;
}

#[tokio::test]
async fn rejected_create_stops_without_retry() {
    let (client, mut events, sent) = start_client(
        vec![join_failed_json("no such room"), join_failed_json("at capacity")],
        ClientConfig::new("pong"),
    );
    let seen = until_disconnected(&mut events).await;

    assert!(seen.contains(&PongEvent::Status("Error: at capacity".into())));
    assert!(seen.contains(&PongEvent::MatchmakingFailed {
        reason: "at capacity".into()
    }));
    assert_eq!(sent_types(&sent), vec!["JoinRoom", "CreateRoom"]);
    assert!(!client.is_connected());
    assert!(matches!(
        client.restart(),
        Err(PongClientError::NotConnected)
    ));
}

// ════════════════════════════════════════════════════════════════════
// Phases, cues and overlay
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn waiting_starting_playing_hides_overlay_and_starts_once() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            phase_json(GamePhase::Starting, "Game starting..."),
            phase_json(GamePhase::Playing, "Playing"),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;

    assert_eq!(cues(&seen), vec![Cue::GameStart]);
    assert_eq!(
        overlays(&seen),
        vec![
            Overlay::Message {
                text: "Waiting for players...".into(),
                subtext: None
            },
            Overlay::Message {
                text: "Game starting...".into(),
                subtext: None
            },
            Overlay::Hidden,
        ]
    );
    client.shutdown().await;
}

#[tokio::test]
async fn countdown_shows_get_ready() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            phase_json(GamePhase::Countdown, "3"),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;
    assert_eq!(
        overlays(&seen).last(),
        Some(&Overlay::Message {
            text: "3".into(),
            subtext: Some("Get ready!")
        })
    );
    assert!(cues(&seen).is_empty());
    client.shutdown().await;
}

#[tokio::test]
async fn point_scored_and_unknown_phase() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            phase_json(GamePhase::Playing, "Playing"),
            phase_json(GamePhase::PointScored, "Point!"),
            phase_json(GamePhase::Other("sudden_death".into()), "Sudden death"),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;
    assert_eq!(cues(&seen), vec![Cue::GameStart, Cue::Score]);
    assert_eq!(overlays(&seen).last(), Some(&Overlay::Hidden));
    client.shutdown().await;
}

#[tokio::test]
async fn ball_reversal_triggers_one_paddle_hit() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            ball_json(Some(100.0), Some(4.0)),
            ball_json(Some(90.0), None),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;
    assert_eq!(cues(&seen), vec![Cue::PaddleHit]);
    client.shutdown().await;
}

async fn outcome_for(local: &str, status: &str) -> Overlay {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json(local, &two_players()),
            phase_json(GamePhase::GameOver, status),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;
    assert_eq!(cues(&seen), vec![Cue::GameOver]);
    client.shutdown().await;
    overlays(&seen).last().cloned().unwrap()
}

#[tokio::test]
async fn game_over_outcome_depends_on_local_identity() {
    let status = "Player A wins!";
    assert_eq!(
        outcome_for("A", status).await,
        Overlay::GameOver {
            detail: status.into(),
            outcome: Outcome::Win
        }
    );
    assert_eq!(
        outcome_for("B", status).await,
        Overlay::GameOver {
            detail: status.into(),
            outcome: Outcome::Lose
        }
    );
}

#[tokio::test]
async fn wins_in_status_shows_banner_before_phase_changes() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("B", &two_players()),
            phase_json(GamePhase::Playing, "Playing"),
            status_json("B wins"),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;
    assert!(matches!(
        overlays(&seen).last(),
        Some(Overlay::GameOver {
            outcome: Outcome::Win,
            ..
        })
    ));
    client.shutdown().await;
}

#[tokio::test]
async fn repeated_identical_deltas_are_silent() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            paddle_json("B", 240.0),
            paddle_json("B", 240.0),
            phase_json(GamePhase::Playing, "Playing"),
            phase_json(GamePhase::Playing, "Playing"),
            player_added_json("B", player(0.0, 240.0, 0)),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;

    let paddle_moves = seen
        .iter()
        .filter(|e| {
            matches!(
                e,
                PongEvent::State(StateChange::PlayerField {
                    field: PlayerField::Y,
                    ..
                })
            )
        })
        .count();
    assert_eq!(paddle_moves, 1);
    assert_eq!(cues(&seen), vec![Cue::GameStart]);
    assert_eq!(client.context().snapshot().players().unwrap()["B"].y, 240.0);
    client.shutdown().await;
}

#[tokio::test]
async fn repeated_joined_reports_identity_once() {
    let (mut client, mut events, _) = start_client(
        vec![
            joined_json("A", &two_players()),
            joined_json("A", &two_players()),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;

    let states: Vec<&StateChange> = seen
        .iter()
        .filter_map(|e| match e {
            PongEvent::State(change) => Some(change),
            _ => None,
        })
        .collect();
    let assigned = states
        .iter()
        .filter(|c| matches!(c, StateChange::SessionAssigned { .. }))
        .count();
    let added = states
        .iter()
        .filter(|c| matches!(c, StateChange::PlayerAdded { .. }))
        .count();
    assert_eq!(assigned, 1);
    assert_eq!(added, 2);
    assert_eq!(overlays(&seen).len(), 1);
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Commands
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn moves_are_speculative_and_clamped() {
    let (mut client, mut events, sent) =
        start_client(vec![joined_json("A", &two_players())], ClientConfig::new("pong"));
    drain(&mut events, QUIET).await;

    // No server echo: both moves start from the last known y of 100.
    assert_eq!(
        client.handle_input(InputEvent::KeyDown("w".into())).unwrap(),
        Some(MoveTarget::Vertical { y: 75.0 })
    );
    assert_eq!(
        client
            .handle_input(InputEvent::ButtonClick(Direction::Decrease))
            .unwrap(),
        Some(MoveTarget::Vertical { y: 60.0 })
    );
    assert_eq!(
        client.send_intent(Intent::MoveTo(-50.0)).unwrap(),
        Some(MoveTarget::Vertical { y: 0.0 })
    );
    assert_ok!(client.restart());
    assert_ok!(client.leave());
    drain(&mut events, QUIET).await;

    let sent = sent.lock().unwrap().clone();
    assert_eq!(sent[1], r#"{"type":"Move","data":{"y":75.0}}"#);
    assert_eq!(sent[2], r#"{"type":"Move","data":{"y":60.0}}"#);
    assert_eq!(sent[3], r#"{"type":"Move","data":{"y":0.0}}"#);
    assert_eq!(&sent[sent.len() - 2..], [r#"{"type":"Restart"}"#, r#"{"type":"Leave"}"#]);
    client.shutdown().await;
}

#[tokio::test]
async fn mirrored_client_sends_x_and_sees_itself_at_the_bottom() {
    let players = vec![("A", player(100.0, 0.0, 0)), ("B", player(300.0, 0.0, 0))];
    let config = ClientConfig::new("pong").with_variant(ClientVariant::Mirrored);
    let (mut client, mut events, _) = start_client(vec![joined_json("B", &players)], config);
    drain(&mut events, QUIET).await;

    let target = client
        .handle_input(InputEvent::KeyDown("ArrowRight".into()))
        .unwrap();
    assert_eq!(target, Some(MoveTarget::Horizontal { x: 325.0 }));

    let scene = client
        .context()
        .settings()
        .perspective()
        .project(
            &client.context().snapshot(),
            &client.context().settings().geometry,
            0.0,
        )
        .unwrap();
    let local = scene.paddles.iter().find(|p| p.is_local).unwrap();
    assert_eq!(local.session_id, "B");
    assert_eq!(local.edge, Edge::Bottom);
    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Rendering against live client state
// ════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Recording(Vec<DrawCommand>);

impl Surface for Recording {
    fn draw(&mut self, command: &DrawCommand) {
        self.0.push(command.clone());
    }
}

#[tokio::test]
async fn render_loop_draws_and_sends_held_input() {
    let (mut client, mut events, sent) =
        start_client(vec![joined_json("A", &two_players())], ClientConfig::new("pong"));
    drain(&mut events, QUIET).await;

    let mut render = client.render_loop();
    client
        .handle_input(InputEvent::ButtonPress(Direction::Increase))
        .unwrap();
    let mut surface = Recording::default();
    assert_eq!(render.tick(&mut surface), FrameOutcome::Drawn);
    drain(&mut events, QUIET).await;

    let moves: Vec<String> = sent
        .lock()
        .unwrap()
        .iter()
        .filter(|m| m.contains("Move"))
        .cloned()
        .collect();
    assert_eq!(
        moves,
        vec![
            r#"{"type":"Move","data":{"y":125.0}}"#,
            r#"{"type":"Move","data":{"y":110.0}}"#,
        ]
    );
    assert!(surface
        .0
        .iter()
        .any(|c| matches!(
            c,
            DrawCommand::Fill {
                color: Color::CYAN,
                ..
            }
        )));
    client.shutdown().await;
}

#[tokio::test]
async fn frame_is_skipped_after_disconnect() {
    let (client, mut events, _) = start_client(
        vec![joined_json("A", &two_players()), None],
        ClientConfig::new("pong"),
    );
    until_disconnected(&mut events).await;

    assert!(!client.context().is_active());
    assert!(compose_frame(&client.context().snapshot(), client.context().settings()).is_none());
}

#[tokio::test]
async fn deltas_before_joined_leave_nothing_to_draw() {
    let (mut client, mut events, _) = start_client(
        vec![
            phase_json(GamePhase::Playing, "Playing"),
            player_added_json("B", player(0.0, 200.0, 0)),
            ball_json(Some(120.0), Some(4.0)),
        ],
        ClientConfig::new("pong"),
    );
    let seen = drain(&mut events, QUIET).await;

    assert!(!seen.iter().any(|e| matches!(e, PongEvent::State(_))));
    assert!(client.context().snapshot().state().is_none());
    let mut surface = Recording::default();
    assert_eq!(
        client.render_loop().tick(&mut surface),
        FrameOutcome::Skipped(SkipReason::NoState)
    );
    assert!(surface.0.is_empty());
    client.shutdown().await;
}
