//! Track references exchanged with the server
//!
//! Tracks are read-only resources owned by the remote API; the realtime
//! layer only carries references to them inside session playlists. A track
//! is identified by a numeric id plus a source tag distinguishing
//! library-local tracks from remote catalog providers.

use serde::{Deserialize, Serialize};

/// Origin of a track reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackApiSource {
    /// Track in the server's local library
    Library,
    /// Tidal catalog track
    Tidal,
    /// Qobuz catalog track
    Qobuz,
}

impl Default for TrackApiSource {
    fn default() -> Self {
        TrackApiSource::Library
    }
}

/// A track as carried inside session playlists
///
/// The realtime layer never mutates these; they are snapshots of what the
/// server reported for the playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrack {
    pub track_id: u64,
    pub title: String,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_id: u64,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub artist_id: u64,
    /// Track length in seconds
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub source: TrackApiSource,
}

/// The narrowed identifier form sent on the wire
///
/// Outbound `UPDATE_SESSION` frames carry only track identifiers, not full
/// track objects. The command layer applies this narrowing before send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackIdent {
    pub id: u64,
    #[serde(default)]
    pub source: TrackApiSource,
}

impl From<&ApiTrack> for TrackIdent {
    fn from(track: &ApiTrack) -> Self {
        Self {
            id: track.track_id,
            source: track.source,
        }
    }
}
