//! Speculative paddle commands.
//!
//! Every intent is resolved against the last known local paddle position,
//! clamped to the table, and sent without waiting for the server. The next
//! authoritative patch corrects whatever the server did not accept.

use crate::error::Result;
use crate::input::Intent;
use crate::perspective::{Orientation, TableGeometry};
use crate::protocol::{ClientMessage, MoveTarget};
use crate::snapshot::RoomSnapshot;

/// Anything that can queue a [`ClientMessage`] for the server.
pub trait CommandSink {
    /// Queue `message` without waiting for an acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`](crate::PongClientError::NotConnected)
    /// once the connection is gone.
    fn send_command(&self, message: ClientMessage) -> Result<()>;
}

/// Clamp a paddle coordinate to `[0, travel_extent - paddle_length]`.
pub fn clamp_paddle(position: f64, orientation: Orientation, geometry: &TableGeometry) -> f64 {
    position.clamp(0.0, orientation.max_paddle_position(geometry))
}

/// Turns intents into clamped `Move` commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementController {
    orientation: Orientation,
    geometry: TableGeometry,
}

impl MovementController {
    pub fn new(orientation: Orientation, geometry: TableGeometry) -> Self {
        Self {
            orientation,
            geometry,
        }
    }

    /// Where `intent` puts a paddle currently at `current`.
    ///
    /// Non-finite requests resolve to `None`.
    pub fn resolve(&self, intent: Intent, current: f64) -> Option<f64> {
        let requested = match intent {
            Intent::MoveBy(delta) => current + delta,
            Intent::MoveTo(position) => position,
        };
        requested
            .is_finite()
            .then(|| clamp_paddle(requested, self.orientation, &self.geometry))
    }

    /// The command for `intent`, or `None` while the local paddle is absent.
    pub fn target(&self, intent: Intent, snapshot: &RoomSnapshot) -> Option<MoveTarget> {
        let player = snapshot.local_player()?;
        let position = self.resolve(intent, self.orientation.paddle_position(player))?;
        Some(match self.orientation {
            Orientation::Horizontal => MoveTarget::Vertical { y: position },
            Orientation::Vertical => MoveTarget::Horizontal { x: position },
        })
    }

    /// Resolve and send. Suppressed (returns `Ok(None)`) while the local
    /// paddle is absent.
    ///
    /// # Errors
    ///
    /// Propagates the sink's error when the connection is gone.
    pub fn send(
        &self,
        intent: Intent,
        snapshot: &RoomSnapshot,
        sink: &impl CommandSink,
    ) -> Result<Option<MoveTarget>> {
        let Some(target) = self.target(intent, snapshot) else {
            tracing::trace!(?intent, "no local paddle yet, move suppressed");
            return Ok(None);
        };
        sink.send_command(ClientMessage::Move(target))?;
        Ok(Some(target))
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
    use crate::protocol::{Player, RoomState};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<ClientMessage>>);

    impl CommandSink for Recorder {
        fn send_command(&self, message: ClientMessage) -> Result<()> {
            self.0.borrow_mut().push(message);
            Ok(())
        }
    }

    fn snapshot_with_local_at(x: f64, y: f64) -> RoomSnapshot {
        let mut state = RoomState::default();
        state.players.insert("me".into(), Player { x, y, score: 0 });
        let mut snapshot = RoomSnapshot::new();
        snapshot.join("me".into(), "room".into(), state);
        snapshot
    }

    #[test]
    fn clamp_keeps_every_request_on_the_table() {
        let geometry = TableGeometry::default();
        for requested in [-1e9, -25.0, 0.0, 160.0, 320.0, 321.0, 1e9] {
            let sent = clamp_paddle(requested, Orientation::Horizontal, &geometry);
            assert!((0.0..=320.0).contains(&sent), "{requested} -> {sent}");
        }
        assert_eq!(clamp_paddle(700.0, Orientation::Vertical, &geometry), 520.0);
    }

    #[test]
    fn move_by_from_last_known_position() {
        let controller = MovementController::new(Orientation::Horizontal, TableGeometry::default());
        let snapshot = snapshot_with_local_at(0.0, 300.0);
        let sink = Recorder::default();

        let sent = controller.send(Intent::MoveBy(25.0), &snapshot, &sink).unwrap();
        assert_eq!(sent, Some(MoveTarget::Vertical { y: 320.0 }));

        controller.send(Intent::MoveBy(-25.0), &snapshot, &sink).unwrap();
        assert_eq!(
            sink.0.borrow().as_slice(),
            &[
                ClientMessage::Move(MoveTarget::Vertical { y: 320.0 }),
                ClientMessage::Move(MoveTarget::Vertical { y: 275.0 }),
            ]
        );
    }

    #[test]
    fn vertical_variant_sends_x() {
        let controller = MovementController::new(Orientation::Vertical, TableGeometry::default());
        let snapshot = snapshot_with_local_at(10.0, 0.0);
        let target = controller.target(Intent::MoveBy(-40.0), &snapshot);
        assert_eq!(target, Some(MoveTarget::Horizontal { x: 0.0 }));
    }

    #[test]
    fn missing_local_player_suppresses_send() {
        let controller = MovementController::new(Orientation::Horizontal, TableGeometry::default());
        let sink = Recorder::default();
        let sent = controller
            .send(Intent::MoveTo(50.0), &RoomSnapshot::new(), &sink)
            .unwrap();
        assert_eq!(sent, None);
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn non_finite_intent_is_dropped() {
        let controller = MovementController::new(Orientation::Horizontal, TableGeometry::default());
        assert_eq!(controller.resolve(Intent::MoveTo(f64::NAN), 10.0), None);
        assert_eq!(controller.resolve(Intent::MoveBy(f64::INFINITY), 10.0), None);
    }
}
