//! Wire frames exchanged over the persistent socket
//!
//! Frames are JSON text messages tagged with a `type` discriminant. Inbound
//! and outbound discriminants are disjoint closed enumerations; unknown
//! inbound types deserialize to [`InboundMessage::Unknown`] and are ignored
//! by the dispatcher, keeping the client forward compatible.

use serde::{Deserialize, Serialize};

use chorus_models::{
    ApiConnection, PlaybackAction, PlaybackSession, SessionUpdate, TrackIdent,
};

/// A frame pushed by the server
///
/// The `CONNECTION_ID` frame carries its connection id at the top level of
/// the envelope rather than in a `payload` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum InboundMessage {
    /// Handshake acknowledgment; the connection is accepted
    Connect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connection_id: Option<String>,
    },
    /// Server-assigned id for this socket connection
    ConnectionId { connection_id: String },
    /// Snapshot of all connections the server knows about
    ConnectionsData { payload: Vec<ApiConnection> },
    /// Full sessions snapshot; replaces the local list wholesale
    Sessions { payload: Vec<PlaybackSession> },
    /// Partial update to one session, merged by id
    SessionUpdated { payload: SessionUpdate },
    /// Any discriminant this SDK version does not know about
    #[serde(other)]
    Unknown,
}

/// A frame sent by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    /// Heartbeat keeping intermediary proxies from closing the socket
    Ping,
    /// Report local connection data after the id is assigned
    SyncConnectionData { payload: SyncConnectionData },
    /// Request a transport action against a session
    PlaybackAction { payload: PlaybackActionPayload },
    /// Ask for a fresh sessions snapshot
    GetSessions,
    /// Create or partially update a session
    UpdateSession { payload: UpdateSessionRequest },
    /// Delete a session by id
    DeleteSession { payload: DeleteSessionRequest },
}

/// Payload of `SYNC_CONNECTION_DATA`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConnectionData {
    pub playing: bool,
}

/// Payload of `PLAYBACK_ACTION`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackActionPayload {
    pub action: PlaybackAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
}

/// Payload of `UPDATE_SESSION`
///
/// A missing `session_id` asks the server to create a new session. The
/// playlist field carries only track identifiers, never full track objects;
/// [`UpdateSessionRequest::from`] applies that narrowing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seek: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_players: Option<Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Vec<TrackIdent>>,
}

impl From<&SessionUpdate> for UpdateSessionRequest {
    fn from(update: &SessionUpdate) -> Self {
        Self {
            session_id: Some(update.session_id),
            name: update.name.clone(),
            active: update.active,
            playing: update.playing,
            position: update.position,
            seek: update.seek,
            volume: update.volume,
            active_players: update.active_players.clone(),
            playlist: update
                .playlist
                .as_ref()
                .map(|tracks| tracks.iter().map(TrackIdent::from).collect()),
        }
    }
}

/// Payload of `DELETE_SESSION`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionRequest {
    pub session_id: u64,
}
