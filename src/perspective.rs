//! Canonical → local visual frame, plus latency masking for the ball.
//!
//! The server simulates in one orientation-free frame. Each client seats the
//! two participants by sorted session id, then optionally inverts the axis
//! perpendicular to the paddles so the local paddle always lands on the
//! anchor edge nearest the controls. The paddles' own travel axis is never
//! inverted, so input directions and drag positions need no remapping.

use crate::protocol::{Ball, GamePhase, Player};
use crate::snapshot::RoomSnapshot;

/// Table and sprite dimensions in canonical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableGeometry {
    pub width: f64,
    pub height: f64,
    /// Paddle size along its travel axis.
    pub paddle_length: f64,
    /// Paddle size across its travel axis.
    pub paddle_thickness: f64,
    pub ball_radius: f64,
}

impl Default for TableGeometry {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            paddle_length: 80.0,
            paddle_thickness: 10.0,
            ball_radius: 5.0,
        }
    }
}

/// Which way the paddles face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Paddles on the left and right edges, moving along `y`.
    #[default]
    Horizontal,
    /// Paddles on the bottom and top edges, moving along `x`.
    Vertical,
}

impl Orientation {
    /// Length of the axis a paddle travels along.
    pub fn travel_extent(self, geometry: &TableGeometry) -> f64 {
        match self {
            Self::Horizontal => geometry.height,
            Self::Vertical => geometry.width,
        }
    }

    /// Highest coordinate a paddle may occupy: `travel_extent - paddle_length`.
    pub fn max_paddle_position(self, geometry: &TableGeometry) -> f64 {
        (self.travel_extent(geometry) - geometry.paddle_length).max(0.0)
    }

    /// A player's coordinate along the travel axis.
    pub fn paddle_position(self, player: &Player) -> f64 {
        match self {
            Self::Horizontal => player.y,
            Self::Vertical => player.x,
        }
    }

    fn canonical_edge(self, slot: Slot) -> Edge {
        match (self, slot) {
            (Self::Horizontal, Slot::First) => Edge::Left,
            (Self::Horizontal, Slot::Second) => Edge::Right,
            (Self::Vertical, Slot::First) => Edge::Bottom,
            (Self::Vertical, Slot::Second) => Edge::Top,
        }
    }
}

/// A table edge as seen on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

/// Seat index by sorted session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            _ => None,
        }
    }
}

/// One seated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat<'a> {
    pub session_id: &'a str,
    pub slot: Slot,
    pub edge: Edge,
    pub is_local: bool,
}

/// Per-variant perspective parameters: paddle orientation and whether the
/// local paddle is pinned to the anchor edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Perspective {
    pub orientation: Orientation,
    pub anchor_local: bool,
}

impl Perspective {
    pub fn new(orientation: Orientation, anchor_local: bool) -> Self {
        Self {
            orientation,
            anchor_local,
        }
    }

    /// Edge the local paddle is drawn on when anchoring is enabled.
    pub fn anchor_edge(&self) -> Edge {
        self.orientation.canonical_edge(Slot::First)
    }

    /// Build the frame transform for a local player seated in `local_slot`.
    pub fn frame(&self, local_slot: Option<Slot>) -> FrameTransform {
        FrameTransform {
            orientation: self.orientation,
            inverted: self.anchor_local && local_slot == Some(Slot::Second),
        }
    }

    /// Seat the first two ids of `sorted_ids` and compute the frame.
    ///
    /// Only the slice order and `local_id` matter, so the result is identical
    /// for identical inputs across snapshots.
    pub fn seat<'a>(
        &self,
        sorted_ids: &[&'a str],
        local_id: Option<&str>,
    ) -> (FrameTransform, Vec<Seat<'a>>) {
        let local_slot = sorted_ids
            .iter()
            .take(2)
            .position(|id| Some(*id) == local_id)
            .and_then(Slot::from_index);
        let frame = self.frame(local_slot);

        let seats = sorted_ids
            .iter()
            .enumerate()
            .filter_map(|(index, id)| {
                let slot = Slot::from_index(index)?;
                Some(Seat {
                    session_id: *id,
                    slot,
                    edge: frame.edge_for(slot),
                    is_local: Some(*id) == local_id,
                })
            })
            .collect();
        (frame, seats)
    }

    /// Project the whole snapshot. `None` when there is no state yet.
    ///
    /// The ball is extrapolated by `extrapolation_factor` of its velocity
    /// while the phase is `playing`; the snapshot is never modified.
    pub fn project(
        &self,
        snapshot: &RoomSnapshot,
        geometry: &TableGeometry,
        extrapolation_factor: f64,
    ) -> Option<SceneView> {
        let state = snapshot.state()?;
        let ids = snapshot.sorted_player_ids();
        let (frame, seats) = self.seat(&ids, snapshot.session_id());

        let paddles = seats
            .iter()
            .filter_map(|seat| {
                let player = state.players.get(seat.session_id)?;
                Some(PaddleView {
                    session_id: seat.session_id.to_owned(),
                    edge: seat.edge,
                    is_local: seat.is_local,
                    rect: paddle_rect(
                        seat.edge,
                        self.orientation.paddle_position(player),
                        geometry,
                    ),
                })
            })
            .collect();

        let ball = extrapolate(
            frame.map_ball(&state.ball, geometry),
            &state.game_state,
            extrapolation_factor,
        );
        Some(SceneView {
            frame,
            paddles,
            ball,
            ball_radius: geometry.ball_radius,
        })
    }
}

/// Canonical → display mapping for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTransform {
    pub orientation: Orientation,
    /// Whether the axis perpendicular to the paddles is flipped.
    pub inverted: bool,
}

impl FrameTransform {
    /// Display edge of a seat.
    pub fn edge_for(&self, slot: Slot) -> Edge {
        let edge = self.orientation.canonical_edge(slot);
        if self.inverted {
            edge.opposite()
        } else {
            edge
        }
    }

    /// Map a canonical ball into the display frame, without extrapolation.
    pub fn map_ball(&self, ball: &Ball, geometry: &TableGeometry) -> Ball {
        if !self.inverted {
            return *ball;
        }
        match self.orientation {
            Orientation::Horizontal => Ball {
                x: geometry.width - ball.x,
                vx: -ball.vx,
                ..*ball
            },
            Orientation::Vertical => Ball {
                y: geometry.height - ball.y,
                vy: -ball.vy,
                ..*ball
            },
        }
    }
}

/// Shift a displayed ball along its velocity while `playing`.
pub fn extrapolate(ball: Ball, phase: &GamePhase, factor: f64) -> Ball {
    if *phase != GamePhase::Playing {
        return ball;
    }
    Ball {
        x: ball.x + ball.vx * factor,
        y: ball.y + ball.vy * factor,
        ..ball
    }
}

/// Axis-aligned rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Paddle rectangle for `edge`, at `position` along the travel axis.
///
/// Paddles sit one thickness in from their edge.
pub fn paddle_rect(edge: Edge, position: f64, geometry: &TableGeometry) -> Rect {
    let t = geometry.paddle_thickness;
    let len = geometry.paddle_length;
    match edge {
        Edge::Left => Rect {
            x: t * 2.0,
            y: position,
            width: t,
            height: len,
        },
        Edge::Right => Rect {
            x: geometry.width - t * 3.0,
            y: position,
            width: t,
            height: len,
        },
        Edge::Top => Rect {
            x: position,
            y: t * 2.0,
            width: len,
            height: t,
        },
        Edge::Bottom => Rect {
            x: position,
            y: geometry.height - t * 3.0,
            width: len,
            height: t,
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaddleView {
    pub session_id: String,
    pub edge: Edge,
    pub is_local: bool,
    pub rect: Rect,
}

/// Everything the render loop needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneView {
    pub frame: FrameTransform,
    pub paddles: Vec<PaddleView>,
    /// Display-space ball, possibly mirrored and extrapolated.
    pub ball: Ball,
    pub ball_radius: f64,
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
    use crate::protocol::{RoomState, StatePatch};

    const MIRRORED: Perspective = Perspective {
        orientation: Orientation::Vertical,
        anchor_local: true,
    };

    fn two_player_snapshot(local: &str) -> RoomSnapshot {
        let mut state = RoomState::default();
        state.players.insert(
            "A".into(),
            Player {
                x: 100.0,
                y: 0.0,
                score: 0,
            },
        );
        state.players.insert(
            "B".into(),
            Player {
                x: 300.0,
                y: 0.0,
                score: 0,
            },
        );
        state.ball = Ball {
            x: 250.0,
            y: 120.0,
            vx: 3.0,
            vy: 5.0,
        };
        let mut snapshot = RoomSnapshot::new();
        snapshot.join(local.into(), "room".into(), state);
        snapshot
    }

    #[test]
    fn seating_is_deterministic() {
        let perspective = Perspective::new(Orientation::Horizontal, false);
        let first = perspective.seat(&["x1", "x2"], Some("x2"));
        for _ in 0..5 {
            assert_eq!(perspective.seat(&["x1", "x2"], Some("x2")), first);
        }
        assert_eq!(first.1[0].edge, Edge::Left);
        assert_eq!(first.1[1].edge, Edge::Right);
        assert!(first.1[1].is_local);
    }

    #[test]
    fn mirrored_second_player_sees_self_at_bottom() {
        let snapshot = two_player_snapshot("B");
        let scene = MIRRORED
            .project(&snapshot, &TableGeometry::default(), 0.0)
            .unwrap();
        let a = scene.paddles.iter().find(|p| p.session_id == "A").unwrap();
        let b = scene.paddles.iter().find(|p| p.session_id == "B").unwrap();
        assert_eq!(a.edge, Edge::Top);
        assert_eq!(b.edge, Edge::Bottom);
        assert!(b.is_local && !a.is_local);
        assert!(scene.frame.inverted);
        assert_eq!(scene.ball.y, 400.0 - 120.0);
        assert_eq!(scene.ball.vy, -5.0);
        assert_eq!(scene.ball.x, 250.0);
    }

    #[test]
    fn mirrored_first_player_keeps_canonical_frame() {
        let snapshot = two_player_snapshot("A");
        let scene = MIRRORED
            .project(&snapshot, &TableGeometry::default(), 0.0)
            .unwrap();
        assert!(!scene.frame.inverted);
        assert_eq!(scene.paddles[0].edge, Edge::Bottom);
        assert_eq!(scene.ball.y, 120.0);
    }

    #[test]
    fn mirror_invariant_holds_for_any_ball_height() {
        let geometry = TableGeometry::default();
        let frame = MIRRORED.frame(Some(Slot::Second));
        for y in [0.0, 1.5, 200.0, 399.0, 400.0] {
            let ball = Ball {
                x: 10.0,
                y,
                vx: 0.0,
                vy: 1.0,
            };
            assert_eq!(frame.map_ball(&ball, &geometry).y + y, geometry.height);
        }
    }

    #[test]
    fn classic_layout_ignores_local_identity() {
        let perspective = Perspective::new(Orientation::Horizontal, false);
        let (frame, seats) = perspective.seat(&["a", "b"], Some("b"));
        assert!(!frame.inverted);
        assert_eq!(seats[0].edge, Edge::Left);
        assert_eq!(seats[1].edge, Edge::Right);
    }

    #[test]
    fn extra_participants_are_not_seated() {
        let perspective = Perspective::new(Orientation::Horizontal, true);
        let (_, seats) = perspective.seat(&["a", "b", "c"], Some("c"));
        assert_eq!(seats.len(), 2);
        assert!(seats.iter().all(|s| !s.is_local));
    }

    #[test]
    fn extrapolation_applies_only_while_playing() {
        let mut snapshot = two_player_snapshot("A");
        let geometry = TableGeometry::default();
        let perspective = Perspective::new(Orientation::Horizontal, false);

        let idle = perspective.project(&snapshot, &geometry, 0.1).unwrap();
        assert_eq!(idle.ball.x, 250.0);

        snapshot.apply_patch(StatePatch {
            game_state: Some(GamePhase::Playing),
            ..StatePatch::default()
        });
        let live = perspective.project(&snapshot, &geometry, 0.1).unwrap();
        assert!((live.ball.x - 250.3).abs() < 1e-9);
        assert!((live.ball.y - 120.5).abs() < 1e-9);
        assert_eq!(snapshot.ball().unwrap().x, 250.0);
    }

    #[test]
    fn paddle_rects_sit_inside_their_edge() {
        let g = TableGeometry::default();
        assert_eq!(
            paddle_rect(Edge::Left, 50.0, &g),
            Rect {
                x: 20.0,
                y: 50.0,
                width: 10.0,
                height: 80.0,
            }
        );
        assert_eq!(paddle_rect(Edge::Right, 50.0, &g).x, 570.0);
        assert_eq!(paddle_rect(Edge::Bottom, 50.0, &g).y, 370.0);
        assert_eq!(paddle_rect(Edge::Top, 50.0, &g).width, 80.0);
    }

    #[test]
    fn project_without_state_is_none() {
        let perspective = Perspective::default();
        assert!(perspective
            .project(&RoomSnapshot::new(), &TableGeometry::default(), 0.1)
            .is_none());
    }
}
