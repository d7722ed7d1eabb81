//! Events the server never sends explicitly, inferred from state deltas.
//!
//! Two heuristics live here:
//!
//! - **Paddle contact**: the server does not announce bounces. A bounce is
//!   inferred when a new ball `x` sample moved against the current `vx`.
//!   This is best-effort over a sampled signal: it can miss contacts and it
//!   can double-fire. Use it for sound cues only, never for game logic.
//! - **Phase transitions**: each phase change maps to at most one [`Cue`],
//!   and the overlay shown over the table is derived from phase plus status.

use crate::protocol::GamePhase;
use crate::snapshot::{BallField, RoomSnapshot, StateChange};

/// Discrete audio trigger points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    PaddleHit,
    Score,
    GameStart,
    GameOver,
}

/// Result of a finished match from the local player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Win => "You Win",
            Self::Lose => "You Lose",
        }
    }
}

/// What is drawn over the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Hidden,
    /// Waiting, starting, countdown or point-scored message.
    Message {
        text: String,
        subtext: Option<&'static str>,
    },
    /// End-of-match banner with a restart affordance.
    GameOver { detail: String, outcome: Outcome },
}

impl Overlay {
    pub const GAME_OVER_HEADLINE: &'static str = "Game Over!";
    pub const RESTART_LABEL: &'static str = "Play Again";
    pub const COUNTDOWN_SUBTEXT: &'static str = "Get ready!";

    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    /// Derive the overlay from phase, status text and local identity.
    ///
    /// The server reports the winner only inside the status text, so the
    /// outcome is a substring test on the local session id. This couples the
    /// client to the server's wording; keep it in sync with the server.
    pub fn derive(phase: &GamePhase, status: &str, session_id: Option<&str>) -> Self {
        if *phase == GamePhase::GameOver || status.contains("wins") {
            let outcome = match session_id {
                Some(id) if !id.is_empty() && status.contains(id) => Outcome::Win,
                _ => Outcome::Lose,
            };
            return Self::GameOver {
                detail: status.to_owned(),
                outcome,
            };
        }

        match phase {
            GamePhase::Playing | GamePhase::Other(_) => Self::Hidden,
            GamePhase::Countdown => Self::Message {
                text: status.to_owned(),
                subtext: Some(Self::COUNTDOWN_SUBTEXT),
            },
            _ => Self::Message {
                text: status.to_owned(),
                subtext: None,
            },
        }
    }

    /// Overlay for the current snapshot; hidden when there is no state yet.
    pub fn for_snapshot(snapshot: &RoomSnapshot) -> Self {
        match (snapshot.phase(), snapshot.status_message()) {
            (Some(phase), Some(status)) => Self::derive(phase, status, snapshot.session_id()),
            _ => Self::Hidden,
        }
    }
}

/// Classify one ball-x sample.
///
/// Contact iff the ball moved right while `vx` is negative, or moved left
/// while `vx` is positive.
pub fn is_paddle_contact(previous_x: f64, new_x: f64, vx: f64) -> bool {
    (previous_x < new_x && vx < 0.0) || (previous_x > new_x && vx > 0.0)
}

/// The cue a phase transition triggers, if any.
pub fn phase_cue(phase: &GamePhase) -> Option<Cue> {
    match phase {
        GamePhase::Playing => Some(Cue::GameStart),
        GamePhase::GameOver => Some(Cue::GameOver),
        GamePhase::PointScored => Some(Cue::Score),
        _ => None,
    }
}

/// Tracks the last observed ball `x`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactDetector {
    previous_x: f64,
}

impl ContactDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_x(&self) -> f64 {
        self.previous_x
    }

    /// Feed one ball-x change; returns `true` on an inferred contact.
    pub fn observe(&mut self, new_x: f64, vx: f64) -> bool {
        let contact = is_paddle_contact(self.previous_x, new_x, vx);
        self.previous_x = new_x;
        contact
    }
}

/// Output of [`EventInference::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inferred {
    Cue(Cue),
    Overlay(Overlay),
}

/// Runs both heuristics over the changes produced by one applied delta.
#[derive(Debug, Clone, Default)]
pub struct EventInference {
    contact: ContactDetector,
    overlay: Option<Overlay>,
}

impl EventInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect `changes` against the already-updated `snapshot`.
    pub fn observe(&mut self, changes: &[StateChange], snapshot: &RoomSnapshot) -> Vec<Inferred> {
        let mut inferred = Vec::new();
        let vx = snapshot.ball().map_or(0.0, |b| b.vx);
        let mut overlay_inputs_changed = false;

        for change in changes {
            match change {
                StateChange::Ball {
                    field: BallField::X,
                    value,
                } => {
                    if self.contact.observe(*value, vx) {
                        tracing::debug!(x = value, vx, "inferred paddle contact");
                        inferred.push(Inferred::Cue(Cue::PaddleHit));
                    }
                }
                StateChange::Phase { previous, current } => {
                    tracing::debug!(%previous, %current, "game phase changed");
                    if let Some(cue) = phase_cue(current) {
                        inferred.push(Inferred::Cue(cue));
                    }
                    overlay_inputs_changed = true;
                }
                StateChange::StatusMessage(_) | StateChange::SessionAssigned { .. } => {
                    overlay_inputs_changed = true;
                }
                _ => {}
            }
        }

        if overlay_inputs_changed || self.overlay.is_none() {
            let overlay = Overlay::for_snapshot(snapshot);
            if self.overlay.as_ref() != Some(&overlay) {
                self.overlay = Some(overlay.clone());
                inferred.push(Inferred::Overlay(overlay));
            }
        }
        inferred
    }

    /// Last overlay emitted, if any.
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
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
    use crate::protocol::{BallPatch, Player, RoomState, StatePatch};

    fn snapshot_for(session: &str) -> RoomSnapshot {
        let mut state = RoomState::default();
        state.players.insert(session.into(), Player::default());
        let mut snapshot = RoomSnapshot::new();
        snapshot.join(session.into(), "room".into(), state);
        snapshot
    }

    fn cues(inferred: &[Inferred]) -> Vec<Cue> {
        inferred
            .iter()
            .filter_map(|i| match i {
                Inferred::Cue(c) => Some(*c),
                Inferred::Overlay(_) => None,
            })
            .collect()
    }

    #[test]
    fn contact_formula_matches_direction_reversal() {
        assert!(is_paddle_contact(100.0, 90.0, 3.0));
        assert!(is_paddle_contact(90.0, 100.0, -3.0));
        assert!(!is_paddle_contact(90.0, 100.0, 3.0));
        assert!(!is_paddle_contact(100.0, 90.0, -3.0));
        assert!(!is_paddle_contact(100.0, 100.0, 3.0));
        assert!(!is_paddle_contact(100.0, 90.0, 0.0));
    }

    #[test]
    fn contact_detector_is_a_pure_function_of_the_sequence() {
        let samples = [(10.0, 2.0), (20.0, 2.0), (15.0, 2.0), (5.0, -2.0), (9.0, -2.0)];
        let run = || {
            let mut detector = ContactDetector::new();
            samples
                .iter()
                .map(|(x, vx)| detector.observe(*x, *vx))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), vec![false, false, true, false, true]);
        assert_eq!(run(), run());
    }

    #[test]
    fn ball_moving_left_with_positive_velocity_fires_paddle_hit() {
        let mut snapshot = snapshot_for("me");
        let mut inference = EventInference::new();
        let changes = snapshot.apply_patch(StatePatch {
            ball: Some(BallPatch {
                x: Some(100.0),
                vx: Some(4.0),
                ..BallPatch::default()
            }),
            ..StatePatch::default()
        });
        assert!(cues(&inference.observe(&changes, &snapshot)).is_empty());

        let changes = snapshot.apply_patch(StatePatch {
            ball: Some(BallPatch {
                x: Some(90.0),
                ..BallPatch::default()
            }),
            ..StatePatch::default()
        });
        assert_eq!(cues(&inference.observe(&changes, &snapshot)), vec![Cue::PaddleHit]);
    }

    #[test]
    fn start_cue_fires_once_and_overlay_hides_at_playing() {
        let mut snapshot = snapshot_for("me");
        let mut inference = EventInference::new();
        let first = inference.observe(&[], &snapshot);
        assert!(matches!(first.as_slice(), [Inferred::Overlay(Overlay::Message { .. })]));

        let changes = snapshot.apply_patch(StatePatch {
            game_state: Some(GamePhase::Starting),
            ..StatePatch::default()
        });
        assert!(cues(&inference.observe(&changes, &snapshot)).is_empty());
        assert!(inference.overlay().unwrap().is_visible());

        let playing = StatePatch {
            game_state: Some(GamePhase::Playing),
            ..StatePatch::default()
        };
        let changes = snapshot.apply_patch(playing.clone());
        let inferred = inference.observe(&changes, &snapshot);
        assert_eq!(cues(&inferred), vec![Cue::GameStart]);
        assert!(inferred.contains(&Inferred::Overlay(Overlay::Hidden)));

        let changes = snapshot.apply_patch(playing);
        assert!(inference.observe(&changes, &snapshot).is_empty());
    }

    #[test]
    fn countdown_overlay_carries_get_ready() {
        let overlay = Overlay::derive(&GamePhase::Countdown, "3", Some("me"));
        assert_eq!(
            overlay,
            Overlay::Message {
                text: "3".into(),
                subtext: Some("Get ready!"),
            }
        );
    }

    #[test]
    fn game_over_outcome_follows_session_substring() {
        let win = Overlay::derive(&GamePhase::GameOver, "Player me-42 wins!", Some("me-42"));
        assert!(matches!(
            win,
            Overlay::GameOver {
                outcome: Outcome::Win,
                ..
            }
        ));
        assert_eq!(Outcome::Win.label(), "You Win");

        let lose = Overlay::derive(&GamePhase::GameOver, "Player other wins!", Some("me-42"));
        assert!(matches!(
            lose,
            Overlay::GameOver {
                outcome: Outcome::Lose,
                ..
            }
        ));
        assert_eq!(Outcome::Lose.label(), "You Lose");
    }

    #[test]
    fn wins_text_shows_banner_even_before_phase_flips() {
        let overlay = Overlay::derive(&GamePhase::Playing, "abc wins", Some("abc"));
        assert!(matches!(
            overlay,
            Overlay::GameOver {
                outcome: Outcome::Win,
                ..
            }
        ));
    }

    #[test]
    fn unknown_phase_hides_overlay_without_cue() {
        let phase = GamePhase::Other("overtime".into());
        assert_eq!(Overlay::derive(&phase, "???", Some("me")), Overlay::Hidden);
        assert_eq!(phase_cue(&phase), None);
    }

    #[test]
    fn point_scored_and_game_over_cues() {
        assert_eq!(phase_cue(&GamePhase::PointScored), Some(Cue::Score));
        assert_eq!(phase_cue(&GamePhase::GameOver), Some(Cue::GameOver));
        assert_eq!(phase_cue(&GamePhase::Countdown), None);
    }
}
