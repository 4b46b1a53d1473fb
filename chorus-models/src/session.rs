//! Playback sessions and partial session updates
//!
//! A `PlaybackSession` is the authoritative unit of "what is playing where":
//! a playlist, a position into it, a seek offset, and the set of players the
//! session targets. Multiple sessions may exist; exactly one is "current"
//! for a given connection.
//!
//! `SessionUpdate` carries PATCH semantics: fields absent from the payload
//! leave the stored session untouched, and applying the same update twice
//! yields the same state as applying it once.

use serde::{Deserialize, Serialize};

use crate::track::ApiTrack;

/// A server-tracked playback context shared across clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    pub session_id: u64,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub playing: bool,
    /// Index into `playlist`; equal to `playlist.len()` means end-of-queue
    #[serde(default)]
    pub position: Option<usize>,
    /// Seek offset into the current track, in seconds
    #[serde(default)]
    pub seek: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    /// Player ids this session plays on
    #[serde(default)]
    pub active_players: Vec<u64>,
    #[serde(default)]
    pub playlist: Vec<ApiTrack>,
}

impl PlaybackSession {
    /// The track at the current position, if any
    pub fn current_track(&self) -> Option<&ApiTrack> {
        self.playlist.get(self.position?)
    }

    /// Shallow-merge a partial update into this session
    ///
    /// Only fields present in the update are overwritten. Idempotent:
    /// applying the same update twice leaves the session identical to
    /// applying it once.
    pub fn apply_update(&mut self, update: &SessionUpdate) {
        if let Some(name) = update.name.clone() {
            self.name = name;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(playing) = update.playing {
            self.playing = playing;
        }
        if let Some(position) = update.position {
            self.position = Some(position);
        }
        if let Some(seek) = update.seek {
            self.seek = Some(seek);
        }
        if let Some(volume) = update.volume {
            self.volume = Some(volume);
        }
        if let Some(active_players) = update.active_players.clone() {
            self.active_players = active_players;
        }
        if let Some(playlist) = update.playlist.clone() {
            self.playlist = playlist;
        }
    }
}

/// A partial update to a session, merged by id
///
/// Used both for inbound `SESSION_UPDATED` frames and for the optimistic
/// local mutation the command layer performs before the server confirms.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub session_id: u64,
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
    pub playlist: Option<Vec<ApiTrack>>,
}

impl SessionUpdate {
    /// An empty update targeting `session_id`
    pub fn new(session_id: u64) -> Self {
        Self {
            session_id,
            ..Default::default()
        }
    }

    pub fn with_playing(mut self, playing: bool) -> Self {
        self.playing = Some(playing);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_seek(mut self, seek: f64) -> Self {
        self.seek = Some(seek);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_playlist(mut self, playlist: Vec<ApiTrack>) -> Self {
        self.playlist = Some(playlist);
        self
    }
}
