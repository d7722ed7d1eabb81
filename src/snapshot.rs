//! Live mirror of authoritative room state.
//!
//! [`RoomSnapshot`] is the only place inbound deltas are written. Applying a
//! message returns the list of [`StateChange`]s it caused; a field that is
//! re-sent with its current value produces nothing, so identical repeated
//! deltas never re-fire notifications.

use std::collections::BTreeMap;

use crate::protocol::{
    Ball, BallPatch, GamePhase, Player, PlayerPatch, RoomId, RoomState, SessionId, StatePatch,
};

/// Ball field named by a [`StateChange::Ball`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BallField {
    X,
    Y,
    Vx,
    Vy,
}

/// Player field named by a [`StateChange::PlayerField`] notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerField {
    X,
    Y,
    Score,
}

/// One observable change to the snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// The local session identity was assigned.
    SessionAssigned {
        session_id: SessionId,
        room_id: RoomId,
    },
    PlayerAdded {
        session_id: SessionId,
        player: Player,
    },
    PlayerRemoved { session_id: SessionId },
    PlayerField {
        session_id: SessionId,
        field: PlayerField,
        value: f64,
    },
    Ball { field: BallField, value: f64 },
    Phase {
        previous: GamePhase,
        current: GamePhase,
    },
    StatusMessage(String),
    CountdownTime(u32),
    WinningScore(u32),
}

/// The most recently received state, readable synchronously.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomSnapshot {
    session_id: Option<SessionId>,
    room_id: Option<RoomId>,
    state: Option<RoomState>,
}

impl RoomSnapshot {
    /// An empty snapshot: no session, no state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The local session id, once the server has assigned one.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Authoritative state, or `None` before the first `Joined`.
    pub fn state(&self) -> Option<&RoomState> {
        self.state.as_ref()
    }

    pub fn players(&self) -> Option<&BTreeMap<SessionId, Player>> {
        self.state.as_ref().map(|s| &s.players)
    }

    pub fn ball(&self) -> Option<&Ball> {
        self.state.as_ref().map(|s| &s.ball)
    }

    pub fn phase(&self) -> Option<&GamePhase> {
        self.state.as_ref().map(|s| &s.game_state)
    }

    pub fn status_message(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.state_message.as_str())
    }

    /// The local participant, if both the session and its entry exist.
    pub fn local_player(&self) -> Option<&Player> {
        let id = self.session_id.as_ref()?;
        self.state.as_ref()?.players.get(id)
    }

    /// Player ids in stable sorted order.
    pub fn sorted_player_ids(&self) -> Vec<&str> {
        self.players()
            .map(|players| players.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Drop everything; used on disconnect.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Install the full state delivered with a `Joined` message.
    ///
    /// Every field of `state` that differs from the previous snapshot (or from
    /// room defaults when there was none) is reported. The identity is only
    /// reported when it is new.
    pub fn join(
        &mut self,
        session_id: SessionId,
        room_id: RoomId,
        state: RoomState,
    ) -> Vec<StateChange> {
        let mut changes = Vec::new();
        let known = self.session_id.as_ref() == Some(&session_id)
            && self.room_id.as_ref() == Some(&room_id);
        if !known {
            changes.push(StateChange::SessionAssigned {
                session_id: session_id.clone(),
                room_id: room_id.clone(),
            });
        }
        self.session_id = Some(session_id);
        self.room_id = Some(room_id);

        let current = self.state.get_or_insert_with(RoomState::default);

        let stale: Vec<SessionId> = current
            .players
            .keys()
            .filter(|id| !state.players.contains_key(*id))
            .cloned()
            .collect();
        for session_id in stale {
            current.players.remove(&session_id);
            changes.push(StateChange::PlayerRemoved { session_id });
        }
        for (session_id, player) in &state.players {
            if current.players.contains_key(session_id) {
                apply_player_patch(
                    current,
                    session_id,
                    &PlayerPatch {
                        x: Some(player.x),
                        y: Some(player.y),
                        score: Some(player.score),
                    },
                    &mut changes,
                );
            } else {
                current.players.insert(session_id.clone(), *player);
                changes.push(StateChange::PlayerAdded {
                    session_id: session_id.clone(),
                    player: *player,
                });
            }
        }

        let full = StatePatch {
            players: BTreeMap::new(),
            ball: Some(BallPatch {
                x: Some(state.ball.x),
                y: Some(state.ball.y),
                vx: Some(state.ball.vx),
                vy: Some(state.ball.vy),
            }),
            game_state: Some(state.game_state),
            state_message: Some(state.state_message),
            countdown_time: Some(state.countdown_time),
            winning_score: Some(state.winning_score),
        };
        apply_scalars(current, full, &mut changes);
        changes
    }

    /// Mirror a server-announced join. Re-announcing a present player with
    /// identical fields is a no-op, and so is any announcement before
    /// `Joined`.
    pub fn add_player(&mut self, session_id: SessionId, player: Player) -> Vec<StateChange> {
        let mut changes = Vec::new();
        let Some(state) = self.state.as_mut() else {
            tracing::debug!(
                session_id = session_id.as_str(),
                "ignoring player announced before join"
            );
            return changes;
        };
        if state.players.contains_key(&session_id) {
            let patch = PlayerPatch {
                x: Some(player.x),
                y: Some(player.y),
                score: Some(player.score),
            };
            apply_player_patch(state, &session_id, &patch, &mut changes);
        } else {
            state.players.insert(session_id.clone(), player);
            changes.push(StateChange::PlayerAdded { session_id, player });
        }
        changes
    }

    /// Mirror a server-announced leave.
    pub fn remove_player(&mut self, session_id: &str) -> Vec<StateChange> {
        match self.state.as_mut().and_then(|s| s.players.remove(session_id)) {
            Some(_) => vec![StateChange::PlayerRemoved {
                session_id: session_id.to_owned(),
            }],
            None => Vec::new(),
        }
    }

    /// Apply an incremental delta.
    ///
    /// The whole patch is written before the change list is returned, so
    /// listeners observe a consistent snapshot (e.g. the new `vx` alongside a
    /// new `x`). Patches arriving before `Joined` are dropped.
    pub fn apply_patch(&mut self, patch: StatePatch) -> Vec<StateChange> {
        let mut changes = Vec::new();
        let Some(state) = self.state.as_mut() else {
            tracing::debug!("ignoring patch received before join");
            return changes;
        };
        for (session_id, player_patch) in &patch.players {
            apply_player_patch(state, session_id, player_patch, &mut changes);
        }
        apply_scalars(state, patch, &mut changes);
        changes
    }
}

/// Patches for players the snapshot does not know are ignored; the client
/// never creates participants on its own.
fn apply_player_patch(
    state: &mut RoomState,
    session_id: &str,
    patch: &PlayerPatch,
    changes: &mut Vec<StateChange>,
) {
    let Some(player) = state.players.get_mut(session_id) else {
        tracing::debug!(session_id, "ignoring patch for unknown player");
        return;
    };

    let mut emit = |field: PlayerField, value: f64| {
        changes.push(StateChange::PlayerField {
            session_id: session_id.to_owned(),
            field,
            value,
        });
    };

    if let Some(x) = patch.x.filter(|x| *x != player.x) {
        player.x = x;
        emit(PlayerField::X, x);
    }
    if let Some(y) = patch.y.filter(|y| *y != player.y) {
        player.y = y;
        emit(PlayerField::Y, y);
    }
    if let Some(score) = patch.score.filter(|s| *s != player.score) {
        player.score = score;
        emit(PlayerField::Score, f64::from(score));
    }
}

fn apply_scalars(state: &mut RoomState, patch: StatePatch, changes: &mut Vec<StateChange>) {
    if let Some(ball) = patch.ball {
        let fields = [
            (BallField::X, ball.x, &mut state.ball.x),
            (BallField::Y, ball.y, &mut state.ball.y),
            (BallField::Vx, ball.vx, &mut state.ball.vx),
            (BallField::Vy, ball.vy, &mut state.ball.vy),
        ];
        for (field, incoming, slot) in fields {
            if let Some(value) = incoming.filter(|v| *v != *slot) {
                *slot = value;
                changes.push(StateChange::Ball { field, value });
            }
        }
    }

    if let Some(phase) = patch.game_state.filter(|p| *p != state.game_state) {
        let previous = std::mem::replace(&mut state.game_state, phase.clone());
        changes.push(StateChange::Phase {
            previous,
            current: phase,
        });
    }
    if let Some(message) = patch.state_message.filter(|m| *m != state.state_message) {
        state.state_message.clone_from(&message);
        changes.push(StateChange::StatusMessage(message));
    }
    if let Some(seconds) = patch.countdown_time.filter(|c| *c != state.countdown_time) {
        state.countdown_time = seconds;
        changes.push(StateChange::CountdownTime(seconds));
    }
    if let Some(score) = patch.winning_score.filter(|w| *w != state.winning_score) {
        state.winning_score = score;
        changes.push(StateChange::WinningScore(score));
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

    fn joined(snapshot: &mut RoomSnapshot) {
        let mut state = RoomState::default();
        state.players.insert("a".into(), Player::default());
        snapshot.join("a".into(), "room".into(), state);
    }

    #[test]
    fn empty_snapshot_has_no_state() {
        let snapshot = RoomSnapshot::new();
        assert!(snapshot.state().is_none());
        assert!(snapshot.local_player().is_none());
        assert!(snapshot.sorted_player_ids().is_empty());
    }

    #[test]
    fn join_reports_session_and_players() {
        let mut snapshot = RoomSnapshot::new();
        let mut state = RoomState::default();
        state.players.insert("b".into(), Player::default());
        state.players.insert("a".into(), Player::default());
        let changes = snapshot.join("b".into(), "room".into(), state);

        assert!(matches!(
            &changes[0],
            StateChange::SessionAssigned { session_id, .. } if session_id == "b"
        ));
        let added = changes
            .iter()
            .filter(|c| matches!(c, StateChange::PlayerAdded { .. }))
            .count();
        assert_eq!(added, 2);
        assert_eq!(snapshot.sorted_player_ids(), vec!["a", "b"]);
        assert!(snapshot.local_player().is_some());
    }

    #[test]
    fn identical_patch_does_not_refire() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);

        let patch = StatePatch {
            ball: Some(BallPatch {
                x: Some(120.0),
                vx: Some(4.0),
                ..BallPatch::default()
            }),
            game_state: Some(GamePhase::Playing),
            state_message: Some("Go!".into()),
            ..StatePatch::default()
        };
        let first = snapshot.apply_patch(patch.clone());
        assert_eq!(first.len(), 4);

        let second = snapshot.apply_patch(patch);
        assert!(second.is_empty());
    }

    #[test]
    fn identical_join_does_not_refire() {
        let mut snapshot = RoomSnapshot::new();
        let mut state = RoomState::default();
        state.players.insert("a".into(), Player::default());

        let first = snapshot.join("a".into(), "room".into(), state.clone());
        assert!(first.contains(&StateChange::SessionAssigned {
            session_id: "a".into(),
            room_id: "room".into(),
        }));

        let second = snapshot.join("a".into(), "room".into(), state);
        assert!(second.is_empty(), "unexpected changes: {second:?}");
    }

    #[test]
    fn deltas_before_join_are_dropped() {
        let mut snapshot = RoomSnapshot::new();
        let patch = StatePatch {
            game_state: Some(GamePhase::Playing),
            ..StatePatch::default()
        };
        assert!(snapshot.apply_patch(patch).is_empty());
        assert!(snapshot.add_player("b".into(), Player::default()).is_empty());
        assert!(snapshot.state().is_none());
        assert_eq!(snapshot, RoomSnapshot::new());
    }

    #[test]
    fn phase_change_carries_previous_value() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        let changes = snapshot.apply_patch(StatePatch {
            game_state: Some(GamePhase::Countdown),
            ..StatePatch::default()
        });
        assert_eq!(
            changes,
            vec![StateChange::Phase {
                previous: GamePhase::WaitingForPlayers,
                current: GamePhase::Countdown,
            }]
        );
    }

    #[test]
    fn patch_for_unknown_player_is_ignored() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        let mut players = BTreeMap::new();
        players.insert(
            "ghost".to_string(),
            PlayerPatch {
                score: Some(1),
                ..PlayerPatch::default()
            },
        );
        let changes = snapshot.apply_patch(StatePatch {
            players,
            ..StatePatch::default()
        });
        assert!(changes.is_empty());
        assert_eq!(snapshot.sorted_player_ids(), vec!["a"]);
    }

    #[test]
    fn score_change_is_reported_per_player() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        let mut players = BTreeMap::new();
        players.insert(
            "a".to_string(),
            PlayerPatch {
                score: Some(3),
                ..PlayerPatch::default()
            },
        );
        let changes = snapshot.apply_patch(StatePatch {
            players,
            ..StatePatch::default()
        });
        assert_eq!(
            changes,
            vec![StateChange::PlayerField {
                session_id: "a".into(),
                field: PlayerField::Score,
                value: 3.0,
            }]
        );
        assert_eq!(snapshot.local_player().unwrap().score, 3);
    }

    #[test]
    fn remove_unknown_player_is_silent() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        assert!(snapshot.remove_player("nobody").is_empty());
        assert_eq!(snapshot.remove_player("a").len(), 1);
        assert!(snapshot.local_player().is_none());
    }

    #[test]
    fn rejoin_drops_players_missing_from_new_state() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        let changes = snapshot.join("z".into(), "room2".into(), RoomState::default());
        assert!(changes.contains(&StateChange::PlayerRemoved {
            session_id: "a".into()
        }));
        assert_eq!(snapshot.session_id(), Some("z"));
    }

    #[test]
    fn clear_forgets_session() {
        let mut snapshot = RoomSnapshot::new();
        joined(&mut snapshot);
        snapshot.clear();
        assert_eq!(snapshot, RoomSnapshot::new());
    }
}
