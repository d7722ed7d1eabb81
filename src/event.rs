//! Events emitted by [`PongClient`](crate::PongClient) on its event channel.

use crate::inference::{Cue, Overlay};
use crate::snapshot::StateChange;

/// Everything the client reports to the application.
///
/// State notifications arrive in the same batch as the delta that caused
/// them, after the shared snapshot has already been updated.
#[derive(Debug, Clone, PartialEq)]
pub enum PongEvent {
    /// The transport loop is running and matchmaking has started.
    Connected,
    /// Human-readable connection status (`"Connecting..."`, `"Connected!"`,
    /// `"Error: ..."`).
    Status(String),
    /// Join and create were both rejected. Terminal: no retry follows.
    MatchmakingFailed { reason: String },
    /// A field of the mirrored state changed.
    State(StateChange),
    /// An inferred audio trigger point.
    Cue(Cue),
    /// The overlay drawn over the table changed.
    OverlayChanged(Overlay),
    /// The server reported an error.
    ServerError { message: String },
    /// The connection ended. Always the last event.
    Disconnected { reason: Option<String> },
}
