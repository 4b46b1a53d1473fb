//! Realtime websocket transport for the chorus playback client
//!
//! Maintains exactly one live socket connection to the server for as long as
//! the client is active. The connection lifecycle is:
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed -> (debounce) -> Connecting ...
//! ```
//!
//! `Closed` is never terminal while the client is running: every close,
//! whether an error or a clean server-initiated close, leads back to
//! `Connecting`, debounced only when the previous attempt started less than
//! the configured interval ago (so a server that accepts and immediately
//! closes cannot hot-loop us). Retries continue indefinitely unless a
//! maximum attempt count is configured.
//!
//! Transport failures are contained here: they are logged and retried, never
//! surfaced to callers. The only externally observable failure mode is that
//! no session data arrives.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ReconnectTimer, WsClient, WsConfig, WsHandle};
pub use error::{WsError, WsSendError};
pub use models::{
    DeleteSessionRequest, InboundMessage, OutboundMessage, PlaybackActionPayload,
    SyncConnectionData, UpdateSessionRequest,
};
