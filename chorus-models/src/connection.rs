//! Connections and their playback endpoints
//!
//! A `Connection` is one physical client's registration with the server. It
//! owns one or more `Player`s, the addressable playback endpoints that audio
//! zones and sessions reference by id.

use serde::{Deserialize, Serialize};

/// Kind of playback endpoint a player represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerType {
    /// The client's local audio engine
    Local,
    /// An output type this SDK version does not know about
    #[serde(other)]
    Unknown,
}

impl Default for PlayerType {
    fn default() -> Self {
        PlayerType::Local
    }
}

/// A playback endpoint belonging to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlayer {
    pub player_id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub player_type: PlayerType,
}

/// One client's registration with the server
///
/// The server reports the full set of known connections in
/// `CONNECTIONS_DATA` frames; the liveness flag and player list drive the
/// audio-zone player selection UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConnection {
    pub connection_id: String,
    pub name: String,
    #[serde(default)]
    pub alive: bool,
    #[serde(default)]
    pub players: Vec<ApiPlayer>,
}
