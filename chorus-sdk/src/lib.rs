//! Chorus SDK: realtime playback-state synchronization client
//!
//! Keeps a local, observable copy of the server's playback state in sync
//! over a persistent websocket, and pushes local intent (play, pause, queue
//! edits) back to the server. The pieces:
//!
//! - **Transport** (`chorus-ws`): one persistent socket, reconnecting
//!   forever with a debounce, heartbeat pings, frames forwarded in order
//! - **Store** (`chorus-state`): canonical [`PlayerStore`] with per-field
//!   change notification
//! - **Player** (`chorus-player`): adapter from store intent to a concrete
//!   [`AudioEngine`](chorus_player::AudioEngine)
//! - **Facade** (this crate): dispatcher for inbound frames, outbound
//!   command API, REST surface, persisted connection record
//!
//! # Example
//!
//! ```no_run
//! use chorus_sdk::{Client, ClientConfig};
//!
//! # async fn run() -> chorus_sdk::Result<()> {
//! let config = ClientConfig::default()
//!     .with_ws_url("wss://music.example.com/ws")
//!     .with_api_url("https://music.example.com");
//! let client = Client::new(config)?;
//! client.start()?;
//! client.wait_ready().await;
//!
//! let mut sessions = client.store().watch_sessions();
//! while sessions.changed().await.is_ok() {
//!     println!("sessions: {:?}", *sessions.borrow());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use chorus_models::SessionUpdate;
use chorus_player::{spawn_poll_loop, EngineFactory, PlayerAdapter, PlayerConfig, PollHandle};
use chorus_state::PlayerStore;
use chorus_ws::{WsClient, WsConfig, WsHandle};

pub mod api;
mod commands;
mod dispatch;
pub mod error;
mod outbox;
pub mod persist;

pub use api::{ApiClient, ApiError, MagicTokenCredentials};
pub use error::{Result, SdkError};
pub use persist::ConnectionRecord;

// Re-export the member crates under their domain names
pub use chorus_models as models;
pub use chorus_player as player;
pub use chorus_state as state;
pub use chorus_ws as ws;

use crate::dispatch::Dispatcher;
use crate::outbox::Outbox;

/// Configuration for [`Client`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Websocket endpoint (`ws://` or `wss://`)
    pub ws_url: String,
    /// Base URL of the REST surface
    pub api_url: String,
    /// Display name this client reports for itself
    pub connection_name: String,
    /// Where to keep the persisted connection record; `None` disables
    /// persistence
    pub persistence_path: Option<PathBuf>,
    /// Transport tuning
    pub ws: WsConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".to_string(),
            api_url: "http://localhost:8000".to_string(),
            connection_name: "Chorus player".to_string(),
            persistence_path: None,
            ws: WsConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ws_url(mut self, url: &str) -> Self {
        self.ws_url = url.to_string();
        self
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.to_string();
        self
    }

    pub fn with_connection_name(mut self, name: &str) -> Self {
        self.connection_name = name.to_string();
        self
    }

    pub fn with_persistence_path(mut self, path: PathBuf) -> Self {
        self.persistence_path = Some(path);
        self
    }

    pub fn with_ws_config(mut self, ws: WsConfig) -> Self {
        self.ws = ws;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.ws_url.is_empty() {
            return Err(SdkError::Configuration(
                "Websocket URL must not be empty".to_string(),
            ));
        }
        if self.api_url.is_empty() {
            return Err(SdkError::Configuration(
                "API URL must not be empty".to_string(),
            ));
        }
        if self.connection_name.is_empty() {
            return Err(SdkError::Configuration(
                "Connection name must not be empty".to_string(),
            ));
        }
        self.ws.validate()?;
        Ok(())
    }
}

/// The client facade
///
/// Owns the store, the transport handle, the REST client, and the pending
/// optimistic-operation registry. Cheap to share behind an `Arc`; all
/// command methods take `&self`.
pub struct Client {
    pub(crate) config: ClientConfig,
    pub(crate) store: PlayerStore,
    pub(crate) api: ApiClient,
    pub(crate) outbox: Arc<Outbox>,
    pub(crate) pending: Arc<DashMap<u64, SessionUpdate>>,
    pub(crate) ready: watch::Sender<bool>,
    pub(crate) ws_handle: Mutex<Option<WsHandle>>,
    pub(crate) record: Mutex<Option<ConnectionRecord>>,
}

impl Client {
    /// Create a client; loads the persisted connection record if configured
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let record = match config.persistence_path.as_deref() {
            Some(path) => persist::load(path)?,
            None => None,
        };

        let api = ApiClient::new(&config.api_url);
        if let Some(record) = &record {
            api.set_token(record.token.clone().or_else(|| record.static_token.clone()));
        }

        Ok(Self {
            config,
            store: PlayerStore::new(),
            api,
            outbox: Arc::new(Outbox::new()),
            pending: Arc::new(DashMap::new()),
            ready: watch::channel(false).0,
            ws_handle: Mutex::new(None),
            record: Mutex::new(record),
        })
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Start the transport and the dispatch loop
    ///
    /// Connection failures after this point are contained and retried by
    /// the transport; they are never returned here.
    pub fn start(&self) -> Result<()> {
        let mut ws_handle = self.ws_handle.lock();
        if ws_handle.is_some() {
            return Err(SdkError::Configuration(
                "Client is already started".to_string(),
            ));
        }

        let (ws_client, handle) = WsClient::new(&self.config.ws_url, self.config.ws.clone())?;

        // Relay outbound frames from the buffer into the transport queue
        let (relay_tx, mut relay_rx) = mpsc::unbounded_channel();
        {
            let handle = handle.clone();
            tokio::spawn(async move {
                while let Some(message) = relay_rx.recv().await {
                    if handle.send(message).is_err() {
                        break;
                    }
                }
            });
        }
        self.outbox.attach(relay_tx);

        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(
            self.store.clone(),
            Arc::clone(&self.outbox),
            Arc::clone(&self.pending),
            self.ready.clone(),
        );
        tokio::spawn(async move {
            while let Some(message) = inbound_rx.recv().await {
                dispatcher.handle(message);
            }
            tracing::debug!("dispatch loop exited");
        });

        // Every open, including reconnects, resynchronizes the session list
        let outbox = Arc::clone(&self.outbox);
        tokio::spawn(ws_client.start(inbound_tx, move || {
            outbox.send(chorus_ws::OutboundMessage::GetSessions);
        }));

        *ws_handle = Some(handle);
        Ok(())
    }

    /// Wait until the server has assigned this client a connection id
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Whether the handshake has completed
    pub fn is_ready(&self) -> bool {
        *self.ready.subscribe().borrow()
    }

    /// Tear the transport down permanently
    pub fn shutdown(&self) {
        if let Some(handle) = self.ws_handle.lock().take() {
            handle.close();
        }
        self.outbox.detach();
        self.ready.send_replace(false);
    }

    /// Attach a local audio player driven by this client's store
    pub fn spawn_player(
        &self,
        factory: Arc<dyn EngineFactory>,
        config: PlayerConfig,
    ) -> (Arc<Mutex<PlayerAdapter>>, PollHandle) {
        let adapter = Arc::new(Mutex::new(PlayerAdapter::new(
            self.store.clone(),
            factory,
            config,
        )));
        let handle = spawn_poll_loop(Arc::clone(&adapter));
        (adapter, handle)
    }

    /// The persisted connection record, if any
    pub fn connection_record(&self) -> Option<ConnectionRecord> {
        self.record.lock().clone()
    }

    /// Replace the persisted connection record
    pub fn save_connection_record(&self, record: ConnectionRecord) -> Result<()> {
        if let Some(path) = self.config.persistence_path.as_deref() {
            persist::save(path, &record)?;
        }
        self.api
            .set_token(record.token.clone().or_else(|| record.static_token.clone()));
        *self.record.lock() = Some(record);
        Ok(())
    }

    /// Forget the persisted connection record
    pub fn clear_connection_record(&self) -> Result<()> {
        if let Some(path) = self.config.persistence_path.as_deref() {
            persist::clear(path)?;
        }
        *self.record.lock() = None;
        Ok(())
    }

    /// Check the saved connection id against the server before reusing it
    ///
    /// A dead id is scrubbed from the record so the next handshake starts
    /// clean. Returns whether the saved id is still usable.
    pub async fn restore_connection(&self) -> Result<bool> {
        let saved = self
            .record
            .lock()
            .as_ref()
            .and_then(|record| record.connection_id.clone());
        let Some(connection_id) = saved else {
            return Ok(false);
        };

        if self.api.connection_alive(&connection_id).await? {
            tracing::debug!(%connection_id, "saved connection still alive");
            Ok(true)
        } else {
            tracing::debug!(%connection_id, "saved connection rejected, clearing");
            let updated = {
                let mut guard = self.record.lock();
                if let Some(record) = guard.as_mut() {
                    record.connection_id = None;
                }
                guard.clone()
            };
            if let Some(record) = updated {
                self.save_connection_record(record)?;
            }
            Ok(false)
        }
    }

    /// Exchange a magic token for credentials and persist them
    pub async fn authenticate(&self, magic_token: &str) -> Result<bool> {
        let Some(credentials) = self.api.magic_token(magic_token).await? else {
            return Ok(false);
        };

        let record = {
            let guard = self.record.lock();
            let mut record = guard.clone().unwrap_or_else(|| ConnectionRecord {
                connection_id: None,
                name: self.config.connection_name.clone(),
                api_url: self.config.api_url.clone(),
                client_id: None,
                token: None,
                static_token: None,
            });
            record.client_id = Some(credentials.client_id);
            record.token = Some(credentials.access_token);
            record
        };
        self.save_connection_record(record)?;
        Ok(true)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("ws_url", &self.config.ws_url)
            .field("ready", &self.is_ready())
            .finish()
    }
}
