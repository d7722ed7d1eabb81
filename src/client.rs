//! Async client for a two-player paddle match.
//!
//! [`PongClient`] is a thin handle that talks to a background transport loop
//! over an unbounded MPSC channel. The loop owns matchmaking, applies every
//! server delta to the shared [`GameContext`], and reports what changed on a
//! bounded channel of [`PongEvent`]s returned from [`PongClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:2567").await?;
//! let config = ClientConfig::new("pong").with_variant(ClientVariant::Mirrored);
//! let (client, mut events) = PongClient::start(transport, config);
//! client.render_loop().spawn(my_canvas);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         PongEvent::Cue(cue) => play(cue.tone()),
//!         PongEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::CueSink;
use crate::command::{CommandSink, MovementController};
use crate::context::GameContext;
use crate::error::{PongClientError, Result};
use crate::event::PongEvent;
use crate::inference::{EventInference, Inferred};
use crate::input::{InputEvent, Intent};
use crate::protocol::{ClientMessage, MoveTarget, ServerMessage};
use crate::render::RenderLoop;
use crate::settings::{ClientVariant, GameSettings};
use crate::snapshot::StateChange;
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`PongClient`] connection.
///
/// # Example
///
/// ```
/// use paddle_sync_client::client::ClientConfig;
/// use paddle_sync_client::settings::ClientVariant;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("pong")
///     .with_variant(ClientVariant::Lobby)
///     .with_event_channel_capacity(0)
///     .with_shutdown_timeout(Duration::from_millis(250));
/// assert_eq!(config.room_name, "pong");
/// assert_eq!(config.event_channel_capacity, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Room type to join, or to create when joining fails.
    pub room_name: String,
    pub settings: GameSettings,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped with a warning so
    /// the transport loop never blocks. `Disconnected` is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`PongClient::shutdown`] waits before aborting the loop.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ClientConfig {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            settings: GameSettings::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Switch variant, keeping the rest of the settings.
    #[must_use]
    pub fn with_variant(mut self, variant: ClientVariant) -> Self {
        self.settings.variant = variant;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// A zero timeout aborts the transport loop immediately on shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Command handle ──────────────────────────────────────────────────

/// Cloneable sender half of the command channel.
///
/// Used by [`PongClient`] itself and by every [`RenderLoop`] it hands out.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
}

impl CommandHandle {
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl CommandSink for CommandHandle {
    fn send_command(&self, message: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(PongClientError::NotConnected);
        }
        self.cmd_tx
            .send(message)
            .map_err(|_| PongClientError::NotConnected)
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client handle.
///
/// Movement and control methods queue a [`ClientMessage`] and return as soon
/// as it is queued; nothing waits for the server.
pub struct PongClient {
    commands: CommandHandle,
    context: GameContext,
    movement: MovementController,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl PongClient {
    /// Start the transport loop and return a handle plus event receiver.
    ///
    /// The first outgoing message is always `join_room` for
    /// [`ClientConfig::room_name`].
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: ClientConfig,
    ) -> (Self, mpsc::Receiver<PongEvent>) {
        Self::spawn(transport, config, None)
    }

    /// Like [`start`](Self::start), also playing every inferred cue on `sink`.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start_with_audio(
        transport: impl Transport,
        config: ClientConfig,
        sink: impl CueSink + 'static,
    ) -> (Self, mpsc::Receiver<PongEvent>) {
        Self::spawn(transport, config, Some(Box::new(sink) as Box<dyn CueSink>))
    }

    fn spawn(
        transport: impl Transport,
        config: ClientConfig,
        cues: Option<Box<dyn CueSink>>,
    ) -> (Self, mpsc::Receiver<PongEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<PongEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let connected = Arc::new(AtomicBool::new(true));
        let context = GameContext::new(config.settings.clone());
        let movement = MovementController::new(
            config.settings.orientation(),
            config.settings.geometry,
        );

        let session = LoopSession {
            room_name: config.room_name,
            ready_signal: config.settings.variant.uses_ready_signal(),
            matchmaking: Matchmaking::Joining,
            inference: EventInference::new(),
            cues,
            context: context.clone(),
            connected: Arc::clone(&connected),
            event_tx,
        };
        let task = tokio::spawn(transport_loop(transport, cmd_rx, session, shutdown_rx));

        let client = Self {
            commands: CommandHandle { cmd_tx, connected },
            context,
            movement,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Feed one input event. Discrete events send a move right away; held
    /// input is picked up by the render loop every frame.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`] if the transport has closed.
    pub fn handle_input(&self, event: InputEvent) -> Result<Option<MoveTarget>> {
        match self.context.handle_input(event) {
            Some(intent) => self.send_intent(intent),
            None => Ok(None),
        }
    }

    /// Resolve `intent` against the current snapshot and send it.
    ///
    /// Returns `Ok(None)` while the local paddle is not in the snapshot yet.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`] if the transport has closed.
    pub fn send_intent(&self, intent: Intent) -> Result<Option<MoveTarget>> {
        let snapshot = self.context.snapshot();
        self.movement.send(intent, &snapshot, &self.commands)
    }

    /// Ask the server for a new game after game over.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`] if the transport has closed.
    pub fn restart(&self) -> Result<()> {
        self.commands.send_command(ClientMessage::Restart)
    }

    /// Mark the local player ready. Sent automatically after joining in the
    /// lobby variant.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`] if the transport has closed.
    pub fn ready(&self) -> Result<()> {
        self.commands.send_command(ClientMessage::Join)
    }

    /// Leave the room. The server is expected to close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`PongClientError::NotConnected`] if the transport has closed.
    pub fn leave(&self) -> Result<()> {
        self.commands.send_command(ClientMessage::Leave)
    }

    /// Shut down the client, closing the transport and stopping the loop.
    ///
    /// The context is deactivated, so bound render loops stop as well.
    pub async fn shutdown(&mut self) {
        debug!("PongClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("transport loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("transport loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("transport loop aborted: {join_err}");
                    }
                }
            }
        }

        self.commands.connected.store(false, Ordering::Release);
        self.context.deactivate();
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn command_handle(&self) -> CommandHandle {
        self.commands.clone()
    }

    /// A render loop bound to this client's context and command channel.
    pub fn render_loop(&self) -> RenderLoop<CommandHandle> {
        RenderLoop::new(self.context.clone(), self.command_handle())
    }

    /// The local session id once the server has accepted the join.
    pub fn session_id(&self) -> Option<String> {
        self.context.session_id()
    }

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.commands.is_connected()
    }
}

impl std::fmt::Debug for PongClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PongClient")
            .field("connected", &self.is_connected())
            .field("session_id", &self.session_id())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for PongClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close here; abort instead.
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.context.deactivate();
    }
}

// ── Transport loop ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matchmaking {
    Joining,
    Creating,
    Joined,
}

/// Everything the loop owns besides the transport and channels it selects on.
struct LoopSession {
    room_name: String,
    ready_signal: bool,
    matchmaking: Matchmaking,
    inference: EventInference,
    cues: Option<Box<dyn CueSink>>,
    context: GameContext,
    connected: Arc<AtomicBool>,
    event_tx: mpsc::Sender<PongEvent>,
}

/// What the loop does after handling one server message.
enum Next {
    Continue,
    Send(ClientMessage),
    Stop(String),
}

/// Background loop multiplexing commands, shutdown and inbound deltas.
///
/// Exits when the command channel closes, on shutdown, when the transport
/// closes or fails, or when matchmaking fails.
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    mut session: LoopSession,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    debug!("transport loop started");

    emit_event(&session.event_tx, PongEvent::Connected).await;
    emit_event(&session.event_tx, PongEvent::Status("Connecting...".into())).await;

    // Sent before the first `recv` so a `JoinFailed` can never overtake it.
    let join = ClientMessage::JoinRoom {
        room_name: session.room_name.clone(),
    };
    if let Err(e) = send_message(&mut transport, &join).await {
        error!("transport send error: {e}");
        emit_disconnected(&mut session, Some(e.to_string())).await;
        return;
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        if let Err(e) = send_message(&mut transport, &msg).await {
                            error!("transport send error: {e}");
                            emit_disconnected(&mut session, Some(e.to_string())).await;
                            break;
                        }
                    }
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&mut session, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&mut session, Some("client shut down".into())).await;
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        let server_msg = match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("failed to deserialize server message: {e}; raw: {text}");
                                continue;
                            }
                        };
                        match handle_server_message(&mut session, server_msg).await {
                            Next::Continue => {}
                            Next::Send(msg) => {
                                if let Err(e) = send_message(&mut transport, &msg).await {
                                    error!("transport send error: {e}");
                                    emit_disconnected(&mut session, Some(e.to_string())).await;
                                    break;
                                }
                            }
                            Next::Stop(reason) => {
                                let _ = transport.close().await;
                                emit_disconnected(&mut session, Some(reason)).await;
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(&mut session, Some(e.to_string())).await;
                        break;
                    }
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&mut session, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

async fn send_message(transport: &mut impl Transport, msg: &ClientMessage) -> Result<()> {
    let json = serde_json::to_string(msg)?;
    debug!(message = json.as_str(), "sending client message");
    transport.send(json).await
}

/// Apply one server message to the session and decide what happens next.
async fn handle_server_message(session: &mut LoopSession, msg: ServerMessage) -> Next {
    match msg {
        ServerMessage::Joined {
            session_id,
            room_id,
            state,
        } => {
            info!(%session_id, %room_id, "joined room");
            session.matchmaking = Matchmaking::Joined;
            emit_event(&session.event_tx, PongEvent::Status("Connected!".into())).await;
            let changes = session
                .context
                .update_snapshot(|s| s.join(session_id, room_id, state));
            dispatch_changes(session, changes).await;
            if session.ready_signal {
                return Next::Send(ClientMessage::Join);
            }
            Next::Continue
        }
        ServerMessage::JoinFailed { reason } => match session.matchmaking {
            Matchmaking::Joining => {
                warn!(%reason, room = session.room_name.as_str(), "join failed, creating room");
                session.matchmaking = Matchmaking::Creating;
                Next::Send(ClientMessage::CreateRoom {
                    room_name: session.room_name.clone(),
                })
            }
            Matchmaking::Creating => {
                error!(%reason, "create failed, giving up");
                emit_event(&session.event_tx, PongEvent::Status(format!("Error: {reason}"))).await;
                let stop = PongClientError::MatchmakingFailed {
                    reason: reason.clone(),
                }
                .to_string();
                emit_event(&session.event_tx, PongEvent::MatchmakingFailed { reason }).await;
                Next::Stop(stop)
            }
            Matchmaking::Joined => {
                warn!(%reason, "unexpected join_failed after joining; ignored");
                Next::Continue
            }
        },
        ServerMessage::PlayerAdded { session_id, player } => {
            debug!(%session_id, "participant added");
            let changes = session
                .context
                .update_snapshot(|s| s.add_player(session_id, player));
            dispatch_changes(session, changes).await;
            Next::Continue
        }
        ServerMessage::PlayerRemoved { session_id } => {
            debug!(%session_id, "participant removed");
            let changes = session
                .context
                .update_snapshot(|s| s.remove_player(&session_id));
            dispatch_changes(session, changes).await;
            Next::Continue
        }
        ServerMessage::Patch(patch) => {
            let changes = session.context.update_snapshot(|s| s.apply_patch(patch));
            dispatch_changes(session, changes).await;
            Next::Continue
        }
        ServerMessage::Error { message } => {
            warn!(%message, "server reported an error");
            emit_event(&session.event_tx, PongEvent::ServerError { message }).await;
            Next::Continue
        }
    }
}

/// Emit state notifications for one applied delta, then whatever the
/// inference layer derives from it.
async fn dispatch_changes(session: &mut LoopSession, changes: Vec<StateChange>) {
    if changes.is_empty() {
        return;
    }
    let inferred = {
        let snapshot = session.context.snapshot();
        session.inference.observe(&changes, &snapshot)
    };

    for change in changes {
        emit_event(&session.event_tx, PongEvent::State(change)).await;
    }
    for item in inferred {
        match item {
            Inferred::Cue(cue) => {
                if let Some(sink) = session.cues.as_mut() {
                    sink.play(cue);
                }
                emit_event(&session.event_tx, PongEvent::Cue(cue)).await;
            }
            Inferred::Overlay(overlay) => {
                emit_event(&session.event_tx, PongEvent::OverlayChanged(overlay)).await;
            }
        }
    }
}

/// Emit an event without blocking; drops it with a warning when full.
async fn emit_event(event_tx: &mpsc::Sender<PongEvent>, event: PongEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the session disconnected, deactivate its context and deliver
/// `Disconnected`, waiting for channel space if needed.
async fn emit_disconnected(session: &mut LoopSession, reason: Option<String>) {
    session.connected.store(false, Ordering::Release);
    session.context.deactivate();
    let event = PongEvent::Disconnected { reason };
    if session.event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::inference::Cue;
    use crate::protocol::{Player, RoomState};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    type Scripted = Option<std::result::Result<String, PongClientError>>;

    struct MockTransport {
        incoming: VecDeque<Scripted>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(incoming: Vec<Scripted>) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), PongClientError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, PongClientError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), PongClientError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn server(msg: ServerMessage) -> Scripted {
        Some(Ok(serde_json::to_string(&msg).unwrap()))
    }

    fn joined(session_id: &str) -> Scripted {
        let mut state = RoomState::default();
        state.players.insert(
            session_id.into(),
            Player {
                x: 0.0,
                y: 160.0,
                score: 0,
            },
        );
        server(ServerMessage::Joined {
            session_id: session_id.into(),
            room_id: "room-1".into(),
            state,
        })
    }

    fn join_failed(reason: &str) -> Scripted {
        server(ServerMessage::JoinFailed {
            reason: reason.into(),
        })
    }

    async fn collect_until_disconnect(events: &mut mpsc::Receiver<PongEvent>) -> Vec<PongEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = matches!(event, PongEvent::Disconnected { .. });
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn join_room_is_first_message() {
        let (transport, sent, _) = MockTransport::new(vec![]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        settle().await;

        let sent = sent.lock().unwrap().clone();
        let first: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(first["type"], "JoinRoom");
        assert_eq!(first["data"]["room_name"], "pong");
        client.shutdown().await;
    }

    #[tokio::test]
    async fn connected_then_connecting_status() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let (mut client, mut events) = PongClient::start(transport, ClientConfig::new("pong"));
        assert_eq!(events.recv().await, Some(PongEvent::Connected));
        assert_eq!(
            events.recv().await,
            Some(PongEvent::Status("Connecting...".into()))
        );
        client.shutdown().await;
    }

    #[tokio::test]
    async fn join_failure_falls_back_to_create() {
        let (transport, sent, _) = MockTransport::new(vec![join_failed("no rooms"), joined("me")]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        settle().await;

        let types: Vec<String> = sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| serde_json::from_str::<serde_json::Value>(m).unwrap()["type"].to_string())
            .collect();
        assert_eq!(types, vec!["\"JoinRoom\"", "\"CreateRoom\""]);
        assert_eq!(client.session_id().as_deref(), Some("me"));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn create_failure_is_terminal() {
        let (transport, sent, closed) =
            MockTransport::new(vec![join_failed("no rooms"), join_failed("server full")]);
        let (client, mut events) = PongClient::start(transport, ClientConfig::new("pong"));

        let seen = collect_until_disconnect(&mut events).await;
        assert!(seen.contains(&PongEvent::Status("Error: server full".into())));
        assert!(seen.contains(&PongEvent::MatchmakingFailed {
            reason: "server full".into()
        }));
        assert!(matches!(
            seen.last(),
            Some(PongEvent::Disconnected { reason: Some(r) }) if r.contains("server full")
        ));
        assert!(closed.load(Ordering::Relaxed));
        assert!(!client.is_connected());
        assert!(!client.context().is_active());
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lobby_variant_signals_ready_after_join() {
        let (transport, sent, _) = MockTransport::new(vec![joined("me")]);
        let config = ClientConfig::new("pong").with_variant(ClientVariant::Lobby);
        let (mut client, _events) = PongClient::start(transport, config);
        settle().await;

        let last = sent.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last, serde_json::to_string(&ClientMessage::Join).unwrap());
        client.shutdown().await;
    }

    #[tokio::test]
    async fn key_press_sends_clamped_move() {
        let (transport, sent, _) = MockTransport::new(vec![joined("me")]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        settle().await;

        let target = client
            .handle_input(InputEvent::KeyDown("ArrowDown".into()))
            .unwrap();
        assert_eq!(target, Some(MoveTarget::Vertical { y: 185.0 }));
        let target = client.send_intent(Intent::MoveTo(1_000.0)).unwrap();
        assert_eq!(target, Some(MoveTarget::Vertical { y: 320.0 }));
        settle().await;

        let sent = sent.lock().unwrap().clone();
        assert!(sent.contains(&r#"{"type":"Move","data":{"y":185.0}}"#.to_string()));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn move_before_join_is_suppressed() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        let target = client.handle_input(InputEvent::KeyDown("w".into())).unwrap();
        assert_eq!(target, None);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        client.shutdown().await;
        assert!(matches!(client.restart(), Err(PongClientError::NotConnected)));
        assert!(!client.context().is_active());
    }

    #[tokio::test]
    async fn disconnect_clears_snapshot() {
        let (transport, _, _) = MockTransport::new(vec![joined("me"), None]);
        let (client, mut events) = PongClient::start(transport, ClientConfig::new("pong"));
        let seen = collect_until_disconnect(&mut events).await;
        assert_eq!(seen.last(), Some(&PongEvent::Disconnected { reason: None }));
        assert!(client.context().snapshot().state().is_none());
    }

    #[tokio::test]
    async fn malformed_message_is_skipped() {
        let (transport, _, _) = MockTransport::new(vec![
            Some(Ok("not json".into())),
            server(ServerMessage::Error {
                message: "boom".into(),
            }),
        ]);
        let (mut client, mut events) = PongClient::start(transport, ClientConfig::new("pong"));
        let mut saw_error = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            let boom = PongEvent::ServerError {
                message: "boom".into(),
            };
            if event == boom {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn recv_error_emits_disconnected() {
        let (transport, _, _) =
            MockTransport::new(vec![Some(Err(PongClientError::TransportReceive("reset".into())))]);
        let (_client, mut events) = PongClient::start(transport, ClientConfig::new("pong"));
        let seen = collect_until_disconnect(&mut events).await;
        assert!(matches!(
            seen.last(),
            Some(PongEvent::Disconnected { reason: Some(r) }) if r.contains("reset")
        ));
    }

    struct Tally(Arc<StdMutex<Vec<Cue>>>);

    impl CueSink for Tally {
        fn play(&mut self, cue: Cue) {
            self.0.lock().unwrap().push(cue);
        }
    }

    #[tokio::test]
    async fn cues_reach_the_audio_sink() {
        use crate::protocol::{GamePhase, StatePatch};
        let patch = server(ServerMessage::Patch(StatePatch {
            game_state: Some(GamePhase::Playing),
            ..StatePatch::default()
        }));
        let (transport, _, _) = MockTransport::new(vec![joined("me"), patch]);
        let played = Arc::new(StdMutex::new(Vec::new()));
        let (mut client, _events) = PongClient::start_with_audio(
            transport,
            ClientConfig::new("pong"),
            Tally(Arc::clone(&played)),
        );
        settle().await;
        assert_eq!(played.lock().unwrap().clone(), vec![Cue::GameStart]);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn drop_deactivates_context() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let (client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        let context = client.context().clone();
        drop(client);
        assert!(!context.is_active());
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let (mut client, _events) = PongClient::start(transport, ClientConfig::new("pong"));
        let debug = format!("{client:?}");
        assert!(debug.contains("PongClient"));
        assert!(debug.contains("connected"));
        client.shutdown().await;
    }
}
