//! Input normalization.
//!
//! Keyboard, on-screen buttons, joystick and touch-drag all reduce to one
//! [`Intent`]: move the local paddle by a delta, or toward a position, along
//! its travel axis. Discrete events produce an intent immediately; held
//! buttons, an active joystick or an active drag produce one every frame
//! through [`InputState::continuous_intent`].

use crate::perspective::Orientation;
use crate::settings::GameSettings;

/// Direction along the paddle's travel axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Up for left/right paddles, left for top/bottom paddles.
    Decrease,
    /// Down for left/right paddles, right for top/bottom paddles.
    Increase,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Self::Decrease => -1.0,
            Self::Increase => 1.0,
        }
    }

    /// Map a key name (`"ArrowUp"`, `"w"`, ...) to a direction for `orientation`.
    ///
    /// Keys for the other orientation's axis are ignored.
    pub fn from_key(key: &str, orientation: Orientation) -> Option<Self> {
        match (orientation, key) {
            (Orientation::Horizontal, "ArrowUp" | "w" | "W") => Some(Self::Decrease),
            (Orientation::Horizontal, "ArrowDown" | "s" | "S") => Some(Self::Increase),
            (Orientation::Vertical, "ArrowLeft" | "a" | "A") => Some(Self::Decrease),
            (Orientation::Vertical, "ArrowRight" | "d" | "D") => Some(Self::Increase),
            _ => None,
        }
    }
}

/// Raw input from any device.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key went down; `key` uses DOM `KeyboardEvent.key` names.
    KeyDown(String),
    ButtonPress(Direction),
    ButtonRelease(Direction),
    /// A discrete click, for webviews that drop press/release.
    ButtonClick(Direction),
    /// Joystick deflection, each component in `[-1, 1]`, `y` pointing up.
    JoystickMove { x: f64, y: f64 },
    JoystickEnd,
    /// Touch position along the travel axis, in table units.
    Drag(f64),
    DragEnd,
}

/// A normalized movement request for the local paddle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    MoveBy(f64),
    MoveTo(f64),
}

/// Held-input state shared between input callbacks and the render loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    decrease_held: bool,
    increase_held: bool,
    joystick: Option<(f64, f64)>,
    drag_target: Option<f64>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` and return the intent it triggers right away, if any.
    pub fn handle(&mut self, event: InputEvent, settings: &GameSettings) -> Option<Intent> {
        match event {
            InputEvent::KeyDown(key) => Direction::from_key(&key, settings.orientation())
                .map(|dir| Intent::MoveBy(dir.sign() * settings.key_step)),
            InputEvent::ButtonPress(dir) => {
                self.set_held(dir, true);
                Some(Intent::MoveBy(dir.sign() * settings.key_step))
            }
            InputEvent::ButtonRelease(dir) => {
                self.set_held(dir, false);
                None
            }
            InputEvent::ButtonClick(dir) => Some(Intent::MoveBy(dir.sign() * settings.click_step)),
            InputEvent::JoystickMove { x, y } => {
                self.joystick = Some((x, y));
                None
            }
            InputEvent::JoystickEnd => {
                self.joystick = None;
                None
            }
            InputEvent::Drag(position) => {
                self.drag_target = Some(position);
                None
            }
            InputEvent::DragEnd => {
                self.drag_target = None;
                None
            }
        }
    }

    /// Intent to send this frame, if any input is being held.
    ///
    /// Drag wins over joystick, joystick over buttons. With both buttons
    /// held, `Increase` wins.
    pub fn continuous_intent(&self, settings: &GameSettings) -> Option<Intent> {
        if let Some(target) = self.drag_target {
            return Some(Intent::MoveTo(target - settings.geometry.paddle_length / 2.0));
        }
        if let Some((x, y)) = self.joystick {
            let deflection = match settings.orientation() {
                Orientation::Horizontal => -y,
                Orientation::Vertical => x,
            };
            let delta = deflection * settings.joystick_step * settings.joystick_sensitivity;
            return Some(Intent::MoveBy(delta));
        }
        if self.increase_held {
            return Some(Intent::MoveBy(settings.hold_step));
        }
        if self.decrease_held {
            return Some(Intent::MoveBy(-settings.hold_step));
        }
        None
    }

    pub fn is_active(&self) -> bool {
        self.decrease_held
            || self.increase_held
            || self.joystick.is_some()
            || self.drag_target.is_some()
    }

    /// Forget all held input, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    fn set_held(&mut self, dir: Direction, held: bool) {
        match dir {
            Direction::Decrease => self.decrease_held = held,
            Direction::Increase => self.increase_held = held,
        }
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
    use crate::settings::ClientVariant;

    fn classic() -> GameSettings {
        GameSettings::new(ClientVariant::Classic)
    }

    #[test]
    fn arrow_and_wasd_keys_map_per_orientation() {
        let mut input = InputState::new();
        let settings = classic();
        assert_eq!(
            input.handle(InputEvent::KeyDown("ArrowUp".into()), &settings),
            Some(Intent::MoveBy(-25.0))
        );
        assert_eq!(
            input.handle(InputEvent::KeyDown("S".into()), &settings),
            Some(Intent::MoveBy(25.0))
        );
        assert_eq!(input.handle(InputEvent::KeyDown("d".into()), &settings), None);

        let mirrored = GameSettings::new(ClientVariant::Mirrored);
        assert_eq!(
            input.handle(InputEvent::KeyDown("d".into()), &mirrored),
            Some(Intent::MoveBy(25.0))
        );
    }

    #[test]
    fn keys_do_not_latch_state() {
        let mut input = InputState::new();
        input.handle(InputEvent::KeyDown("w".into()), &classic());
        assert!(!input.is_active());
    }

    #[test]
    fn held_button_moves_every_frame_until_released() {
        let settings = classic();
        let mut input = InputState::new();
        let edge = input.handle(InputEvent::ButtonPress(Direction::Increase), &settings);
        assert_eq!(edge, Some(Intent::MoveBy(25.0)));
        for _ in 0..3 {
            assert_eq!(input.continuous_intent(&settings), Some(Intent::MoveBy(10.0)));
        }
        input.handle(InputEvent::ButtonRelease(Direction::Increase), &settings);
        assert_eq!(input.continuous_intent(&settings), None);
    }

    #[test]
    fn click_uses_larger_step() {
        let mut input = InputState::new();
        assert_eq!(
            input.handle(InputEvent::ButtonClick(Direction::Decrease), &classic()),
            Some(Intent::MoveBy(-40.0))
        );
    }

    #[test]
    fn joystick_up_moves_paddle_up() {
        let settings = classic().with_joystick_sensitivity(2.0);
        let mut input = InputState::new();
        input.handle(InputEvent::JoystickMove { x: 0.0, y: 0.5 }, &settings);
        assert_eq!(input.continuous_intent(&settings), Some(Intent::MoveBy(-10.0)));
        input.handle(InputEvent::JoystickEnd, &settings);
        assert!(!input.is_active());
    }

    #[test]
    fn drag_centers_paddle_on_finger_and_wins_over_buttons() {
        let settings = classic();
        let mut input = InputState::new();
        input.handle(InputEvent::ButtonPress(Direction::Decrease), &settings);
        input.handle(InputEvent::Drag(200.0), &settings);
        assert_eq!(input.continuous_intent(&settings), Some(Intent::MoveTo(160.0)));
        input.handle(InputEvent::DragEnd, &settings);
        assert_eq!(input.continuous_intent(&settings), Some(Intent::MoveBy(-10.0)));
        input.release_all();
        assert_eq!(input, InputState::new());
    }
}
