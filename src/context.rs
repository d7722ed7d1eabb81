//! Shared per-connection state.
//!
//! A [`GameContext`] is created when the client starts and deactivated when
//! the connection ends. The transport loop is the only writer of the
//! snapshot; input callbacks write the input state; the render loop reads
//! both and stops once the context is no longer active.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::input::{InputEvent, InputState, Intent};
use crate::settings::GameSettings;
use crate::snapshot::RoomSnapshot;

#[derive(Debug)]
struct Inner {
    settings: GameSettings,
    snapshot: RwLock<RoomSnapshot>,
    input: Mutex<InputState>,
    active: AtomicBool,
}

/// Cheaply cloneable handle to the state of one connection.
#[derive(Debug, Clone)]
pub struct GameContext {
    inner: Arc<Inner>,
}

impl GameContext {
    pub fn new(settings: GameSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                snapshot: RwLock::new(RoomSnapshot::new()),
                input: Mutex::new(InputState::new()),
                active: AtomicBool::new(true),
            }),
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.inner.settings
    }

    /// Read access to the latest snapshot. Hold the guard briefly: the
    /// transport loop blocks on it while applying deltas.
    pub fn snapshot(&self) -> RwLockReadGuard<'_, RoomSnapshot> {
        self.inner.snapshot.read()
    }

    /// Run `f` against the snapshot under the write lock.
    pub(crate) fn update_snapshot<R>(&self, f: impl FnOnce(&mut RoomSnapshot) -> R) -> R {
        f(&mut self.inner.snapshot.write())
    }

    /// The local session id, once assigned.
    pub fn session_id(&self) -> Option<String> {
        self.snapshot().session_id().map(str::to_owned)
    }

    /// Record an input event; returns the intent it triggers immediately.
    pub fn handle_input(&self, event: InputEvent) -> Option<Intent> {
        self.inner.input.lock().handle(event, &self.inner.settings)
    }

    /// The per-frame intent for held input, if any.
    pub fn continuous_intent(&self) -> Option<Intent> {
        self.inner.input.lock().continuous_intent(&self.inner.settings)
    }

    /// Whether the owning connection is still live.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// End this context: clears the snapshot and held input, and stops
    /// every render loop bound to it at its next tick.
    pub fn deactivate(&self) {
        if self.inner.active.swap(false, Ordering::AcqRel) {
            tracing::debug!("game context deactivated");
        }
        self.inner.snapshot.write().clear();
        self.inner.input.lock().release_all();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::input::Direction;
    use crate::protocol::RoomState;

    #[test]
    fn clones_share_state() {
        let context = GameContext::new(GameSettings::default());
        let other = context.clone();
        context.update_snapshot(|s| s.join("me".into(), "room".into(), RoomState::default()));
        assert_eq!(other.session_id().as_deref(), Some("me"));
    }

    #[test]
    fn deactivate_clears_state_and_input() {
        let context = GameContext::new(GameSettings::default());
        context.update_snapshot(|s| s.join("me".into(), "room".into(), RoomState::default()));
        context.handle_input(InputEvent::ButtonPress(Direction::Increase));
        assert!(context.continuous_intent().is_some());

        context.deactivate();
        assert!(!context.is_active());
        assert!(context.snapshot().state().is_none());
        assert!(context.continuous_intent().is_none());
    }
}
