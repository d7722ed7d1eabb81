//! Gameplay tuning shared by input handling, prediction and rendering.

use std::time::Duration;

use crate::perspective::{Orientation, Perspective, TableGeometry};

const DEFAULT_KEY_STEP: f64 = 25.0;
const DEFAULT_CLICK_STEP: f64 = 40.0;
const DEFAULT_HOLD_STEP: f64 = 10.0;
const DEFAULT_JOYSTICK_STEP: f64 = 10.0;
const DEFAULT_EXTRAPOLATION_FACTOR: f64 = 0.1;
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// The three client flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClientVariant {
    /// Left/right paddles in sorted-id order. The horizontal variants keep
    /// sorted-order placement rather than anchoring the local paddle.
    #[default]
    Classic,
    /// Bottom/top paddles; the local player is always at the bottom.
    Mirrored,
    /// Like `Classic`, but readiness is signalled with a `join` command.
    Lobby,
}

impl ClientVariant {
    pub fn perspective(self) -> Perspective {
        match self {
            Self::Classic | Self::Lobby => Perspective::new(Orientation::Horizontal, false),
            Self::Mirrored => Perspective::new(Orientation::Vertical, true),
        }
    }

    /// Whether this variant sends `join` to mark the player ready.
    pub fn uses_ready_signal(self) -> bool {
        matches!(self, Self::Lobby)
    }
}

/// Gameplay tuning.
///
/// # Example
///
/// ```
/// use paddle_sync_client::settings::{ClientVariant, GameSettings};
///
/// let settings = GameSettings::new(ClientVariant::Mirrored).with_extrapolation_factor(0.2);
/// assert_eq!(settings.key_step, 25.0);
/// assert!(settings.perspective().anchor_local);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    pub variant: ClientVariant,
    pub geometry: TableGeometry,
    /// Paddle step for a key press or a button press edge.
    pub key_step: f64,
    /// Paddle step for a discrete button click.
    pub click_step: f64,
    /// Paddle step per frame while a button is held.
    pub hold_step: f64,
    /// Paddle step per frame at full joystick deflection, before sensitivity.
    pub joystick_step: f64,
    pub joystick_sensitivity: f64,
    /// Fraction of the ball velocity added to its displayed position while playing.
    pub extrapolation_factor: f64,
    /// Render loop period.
    pub frame_interval: Duration,
}

impl GameSettings {
    pub fn new(variant: ClientVariant) -> Self {
        Self {
            variant,
            geometry: TableGeometry::default(),
            key_step: DEFAULT_KEY_STEP,
            click_step: DEFAULT_CLICK_STEP,
            hold_step: DEFAULT_HOLD_STEP,
            joystick_step: DEFAULT_JOYSTICK_STEP,
            joystick_sensitivity: 1.0,
            extrapolation_factor: DEFAULT_EXTRAPOLATION_FACTOR,
            frame_interval: DEFAULT_FRAME_INTERVAL,
        }
    }

    pub fn perspective(&self) -> Perspective {
        self.variant.perspective()
    }

    pub fn orientation(&self) -> Orientation {
        self.perspective().orientation
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: TableGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    #[must_use]
    pub fn with_extrapolation_factor(mut self, factor: f64) -> Self {
        self.extrapolation_factor = factor;
        self
    }

    #[must_use]
    pub fn with_joystick_sensitivity(mut self, sensitivity: f64) -> Self {
        self.joystick_sensitivity = sensitivity;
        self
    }

    /// Set the render loop period. Zero is raised to one millisecond.
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval.max(Duration::from_millis(1));
        self
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new(ClientVariant::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mirrored_anchors_the_local_paddle() {
        assert!(!ClientVariant::Classic.perspective().anchor_local);
        assert!(!ClientVariant::Lobby.perspective().anchor_local);
        let mirrored = ClientVariant::Mirrored.perspective();
        assert!(mirrored.anchor_local);
        assert_eq!(mirrored.orientation, Orientation::Vertical);
    }
}
