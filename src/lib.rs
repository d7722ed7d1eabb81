//! # Paddle Sync Client
//!
//! Client-side synchronization and prediction engine for a real-time,
//! two-player paddle-and-ball game played against an authoritative server.
//!
//! The server owns physics and scoring. This crate mirrors its state,
//! derives each player's view of the table, infers the moments worth a
//! sound (paddle contact, scoring, phase changes), and sends paddle moves
//! speculatively ahead of confirmation.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] for any text channel
//! - **WebSocket built-in**: the default `transport-websocket` feature
//!   provides `WebSocketTransport`
//! - **One library, three variants**: [`ClientVariant`] selects classic,
//!   mirrored or lobby behavior
//! - **Event-driven**: receive typed [`PongEvent`]s via a channel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use paddle_sync_client::{
//!     ClientConfig, ClientVariant, PongClient, PongEvent, WebSocketTransport,
//! };
//!
//! let transport = WebSocketTransport::connect("ws://localhost:2567").await?;
//! let config = ClientConfig::new("pong").with_variant(ClientVariant::Classic);
//! let (client, mut events) = PongClient::start(transport, config);
//! let render = client.render_loop().spawn(canvas);
//!
//! while let Some(event) = events.recv().await {
//!     if let PongEvent::Disconnected { .. } = event {
//!         break;
//!     }
//! }
//! ```

pub mod audio;
pub mod client;
pub mod command;
pub mod context;
pub mod error;
pub mod event;
pub mod inference;
pub mod input;
pub mod perspective;
pub mod protocol;
pub mod render;
pub mod settings;
pub mod snapshot;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use client::{ClientConfig, CommandHandle, PongClient};
pub use error::PongClientError;
pub use event::PongEvent;
pub use inference::{Cue, Overlay};
pub use input::{InputEvent, Intent};
pub use protocol::{ClientMessage, ServerMessage};
pub use render::{DrawCommand, RenderLoop, Surface};
pub use settings::{ClientVariant, GameSettings};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
