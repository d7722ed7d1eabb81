//! Frame-scheduled drawing pass.
//!
//! The loop ticks on a fixed interval, independent of network arrival rate.
//! Each tick first sends a movement command for held input, then draws the
//! latest snapshot onto a [`Surface`]. Missing state or an unavailable
//! surface skips the draw for that tick; the loop keeps going until its
//! [`GameContext`] is deactivated.

use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::command::{CommandSink, MovementController};
use crate::context::GameContext;
use crate::inference::Overlay;
use crate::perspective::{Edge, Orientation, Rect, SceneView};
use crate::settings::GameSettings;
use crate::snapshot::RoomSnapshot;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BACKGROUND: Self = Self::rgb(0x11, 0x11, 0x11);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const CYAN: Self = Self::rgb(0x00, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Horizontal text anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// One primitive for a [`Surface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Fill { rect: Rect, color: Color },
    DashedLine {
        from: (f64, f64),
        to: (f64, f64),
        dash: f64,
        color: Color,
    },
    Circle {
        center: (f64, f64),
        radius: f64,
        color: Color,
    },
    Text {
        position: (f64, f64),
        text: String,
        align: TextAlign,
        size: f64,
        color: Color,
    },
}

/// A drawing target such as a canvas.
pub trait Surface {
    /// `false` while the target is not mounted or has no context yet.
    fn is_ready(&self) -> bool {
        true
    }

    fn draw(&mut self, command: &DrawCommand);
}

/// Why a tick drew nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SurfaceUnavailable,
    NoState,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    Skipped(SkipReason),
}

/// Build the draw list for `snapshot`, or `None` when there is no state.
///
/// Order: background, centerline, paddles, ball, scoreboard, overlay.
pub fn compose_frame(snapshot: &RoomSnapshot, settings: &GameSettings) -> Option<Vec<DrawCommand>> {
    let perspective = settings.perspective();
    let scene = perspective.project(snapshot, &settings.geometry, settings.extrapolation_factor)?;
    let g = &settings.geometry;

    let mut commands = vec![DrawCommand::Fill {
        rect: Rect {
            x: 0.0,
            y: 0.0,
            width: g.width,
            height: g.height,
        },
        color: Color::BACKGROUND,
    }];

    let (from, to) = match perspective.orientation {
        Orientation::Horizontal => ((g.width / 2.0, 0.0), (g.width / 2.0, g.height)),
        Orientation::Vertical => ((0.0, g.height / 2.0), (g.width, g.height / 2.0)),
    };
    commands.push(DrawCommand::DashedLine {
        from,
        to,
        dash: 5.0,
        color: Color::WHITE,
    });

    for paddle in &scene.paddles {
        commands.push(DrawCommand::Fill {
            rect: paddle.rect,
            color: if paddle.is_local { Color::CYAN } else { Color::WHITE },
        });
    }

    commands.push(DrawCommand::Circle {
        center: (scene.ball.x, scene.ball.y),
        radius: scene.ball_radius,
        color: Color::WHITE,
    });

    push_scoreboard(&mut commands, &scene, snapshot, settings);
    push_overlay(&mut commands, &Overlay::for_snapshot(snapshot), settings);
    Some(commands)
}

fn push_scoreboard(
    commands: &mut Vec<DrawCommand>,
    scene: &SceneView,
    snapshot: &RoomSnapshot,
    settings: &GameSettings,
) {
    let g = &settings.geometry;
    let Some(players) = snapshot.players() else {
        return;
    };
    for (index, paddle) in scene.paddles.iter().enumerate() {
        let score = players.get(&paddle.session_id).map_or(0, |p| p.score);
        let you = if paddle.is_local { " (You)" } else { "" };
        let position = match paddle.edge {
            Edge::Left => (g.width * 0.25, 24.0),
            Edge::Right => (g.width * 0.75, 24.0),
            Edge::Top => (g.width / 2.0, g.height * 0.25),
            Edge::Bottom => (g.width / 2.0, g.height * 0.75),
        };
        commands.push(DrawCommand::Text {
            position,
            text: format!("Player {}{you}: {score}", index + 1),
            align: TextAlign::Center,
            size: 16.0,
            color: if paddle.is_local { Color::CYAN } else { Color::WHITE },
        });
    }
}

fn push_overlay(commands: &mut Vec<DrawCommand>, overlay: &Overlay, settings: &GameSettings) {
    let center = (settings.geometry.width / 2.0, settings.geometry.height / 2.0);
    let mut line = |offset: f64, text: &str, size: f64, color: Color| {
        commands.push(DrawCommand::Text {
            position: (center.0, center.1 + offset),
            text: text.to_owned(),
            align: TextAlign::Center,
            size,
            color,
        });
    };

    match overlay {
        Overlay::Hidden => {}
        Overlay::Message { text, subtext } => {
            line(0.0, text.as_str(), 24.0, Color::WHITE);
            if let Some(subtext) = *subtext {
                line(28.0, subtext, 16.0, Color::WHITE);
            }
        }
        Overlay::GameOver { detail, outcome } => {
            line(-40.0, Overlay::GAME_OVER_HEADLINE, 32.0, Color::WHITE);
            line(-8.0, outcome.label(), 24.0, Color::CYAN);
            line(20.0, detail.as_str(), 16.0, Color::WHITE);
            line(52.0, Overlay::RESTART_LABEL, 18.0, Color::CYAN);
        }
    }
}

/// Per-frame driver bound to one [`GameContext`].
#[derive(Debug)]
pub struct RenderLoop<S> {
    context: GameContext,
    sink: S,
    movement: MovementController,
}

impl<S: CommandSink> RenderLoop<S> {
    pub fn new(context: GameContext, sink: S) -> Self {
        let settings = context.settings();
        let movement = MovementController::new(settings.orientation(), settings.geometry);
        Self {
            context,
            sink,
            movement,
        }
    }

    /// One `drawing` pass. Never fails; problems only skip the draw.
    pub fn tick(&mut self, surface: &mut impl Surface) -> FrameOutcome {
        let snapshot = self.context.snapshot();

        if let Some(intent) = self.context.continuous_intent() {
            if let Err(e) = self.movement.send(intent, &snapshot, &self.sink) {
                debug!("held-input move not sent: {e}");
            }
        }

        if !surface.is_ready() {
            trace!("surface not ready, skipping frame");
            return FrameOutcome::Skipped(SkipReason::SurfaceUnavailable);
        }
        let Some(commands) = compose_frame(&snapshot, self.context.settings()) else {
            trace!("no state yet, skipping frame");
            return FrameOutcome::Skipped(SkipReason::NoState);
        };
        drop(snapshot);

        for command in &commands {
            surface.draw(command);
        }
        FrameOutcome::Drawn
    }

    /// Tick every `frame_interval` until the context is deactivated.
    pub async fn run(mut self, mut surface: impl Surface) {
        let mut interval = tokio::time::interval(self.context.settings().frame_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("render loop started");

        while self.context.is_active() {
            interval.tick().await;
            if !self.context.is_active() {
                break;
            }
            self.tick(&mut surface);
        }

        debug!("render loop stopped");
    }
}

impl<S> RenderLoop<S>
where
    S: CommandSink + Send + 'static,
{
    /// Run on a background task.
    pub fn spawn(self, surface: impl Surface + Send + 'static) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(surface))
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
    use crate::error::{PongClientError, Result};
    use crate::input::{Direction, InputEvent};
    use crate::protocol::{ClientMessage, GamePhase, MoveTarget, Player, RoomState};
    use crate::settings::ClientVariant;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<ClientMessage>>>);

    impl CommandSink for Recorder {
        fn send_command(&self, message: ClientMessage) -> Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct Offline;

    impl CommandSink for Offline {
        fn send_command(&self, _message: ClientMessage) -> Result<()> {
            Err(PongClientError::NotConnected)
        }
    }

    #[derive(Default)]
    struct Canvas {
        ready: bool,
        drawn: Vec<DrawCommand>,
    }

    impl Surface for Canvas {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn draw(&mut self, command: &DrawCommand) {
            self.drawn.push(command.clone());
        }
    }

    fn ready_canvas() -> Canvas {
        Canvas {
            ready: true,
            drawn: Vec::new(),
        }
    }

    fn joined_context(variant: ClientVariant, phase: GamePhase) -> GameContext {
        let context = GameContext::new(GameSettings::new(variant));
        let mut state = RoomState::default();
        state.players.insert(
            "A".into(),
            Player {
                x: 40.0,
                y: 100.0,
                score: 2,
            },
        );
        state.players.insert(
            "B".into(),
            Player {
                x: 60.0,
                y: 200.0,
                score: 5,
            },
        );
        state.game_state = phase;
        context.update_snapshot(|s| s.join("B".into(), "room".into(), state));
        context
    }

    fn texts(commands: &[DrawCommand]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn draw_order_is_background_line_paddles_ball_text() {
        let context = joined_context(ClientVariant::Classic, GamePhase::Playing);
        let commands = compose_frame(&context.snapshot(), context.settings()).unwrap();

        assert!(matches!(
            commands[0],
            DrawCommand::Fill {
                color: Color::BACKGROUND,
                ..
            }
        ));
        assert!(matches!(commands[1], DrawCommand::DashedLine { .. }));
        assert!(matches!(
            commands[2],
            DrawCommand::Fill {
                color: Color::WHITE,
                ..
            }
        ));
        assert!(matches!(
            commands[3],
            DrawCommand::Fill {
                color: Color::CYAN,
                ..
            }
        ));
        assert!(matches!(commands[4], DrawCommand::Circle { .. }));
        assert_eq!(texts(&commands), vec!["Player 1: 2", "Player 2 (You): 5"]);
    }

    #[test]
    fn game_over_banner_shows_outcome_and_restart() {
        let context = joined_context(ClientVariant::Classic, GamePhase::GameOver);
        context.update_snapshot(|s| {
            s.apply_patch(crate::protocol::StatePatch {
                state_message: Some("Player B wins!".into()),
                ..Default::default()
            })
        });
        let commands = compose_frame(&context.snapshot(), context.settings()).unwrap();
        let texts = texts(&commands);
        assert!(texts.contains(&"Game Over!".to_string()));
        assert!(texts.contains(&"You Win".to_string()));
        assert!(texts.contains(&"Play Again".to_string()));
    }

    #[test]
    fn mirrored_local_paddle_is_drawn_at_bottom() {
        let context = joined_context(ClientVariant::Mirrored, GamePhase::Playing);
        let commands = compose_frame(&context.snapshot(), context.settings()).unwrap();
        let local = commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Fill {
                    rect,
                    color: Color::CYAN,
                } => Some(*rect),
                _ => None,
            })
            .unwrap();
        assert_eq!(local.y, 400.0 - 30.0);
        assert_eq!(local.x, 60.0);
    }

    #[test]
    fn tick_skips_without_state_or_surface() {
        let context = GameContext::new(GameSettings::default());
        let mut render = RenderLoop::new(context.clone(), Recorder::default());
        assert_eq!(
            render.tick(&mut ready_canvas()),
            FrameOutcome::Skipped(SkipReason::NoState)
        );

        let context = joined_context(ClientVariant::Classic, GamePhase::Playing);
        let mut render = RenderLoop::new(context, Recorder::default());
        let mut canvas = Canvas::default();
        assert_eq!(
            render.tick(&mut canvas),
            FrameOutcome::Skipped(SkipReason::SurfaceUnavailable)
        );
        assert!(canvas.drawn.is_empty());
    }

    #[test]
    fn held_button_sends_move_every_tick_even_without_surface() {
        let context = joined_context(ClientVariant::Classic, GamePhase::Playing);
        let sink = Recorder::default();
        let mut render = RenderLoop::new(context.clone(), sink.clone());
        context.handle_input(InputEvent::ButtonPress(Direction::Decrease));

        render.tick(&mut Canvas::default());
        render.tick(&mut ready_canvas());

        let sent = sink.0.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                ClientMessage::Move(MoveTarget::Vertical { y: 190.0 }),
                ClientMessage::Move(MoveTarget::Vertical { y: 190.0 }),
            ]
        );
    }

    #[test]
    fn send_failure_does_not_stop_drawing() {
        let context = joined_context(ClientVariant::Classic, GamePhase::Playing);
        context.handle_input(InputEvent::Drag(10.0));
        let mut render = RenderLoop::new(context, Offline);
        assert_eq!(render.tick(&mut ready_canvas()), FrameOutcome::Drawn);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_after_deactivate() {
        let context = joined_context(ClientVariant::Classic, GamePhase::Playing);
        let handle = RenderLoop::new(context.clone(), Recorder::default()).spawn(ready_canvas());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        context.deactivate();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("render loop should stop")
            .unwrap();
    }
}
