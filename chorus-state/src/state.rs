//! The canonical playback state record

use chorus_models::{ApiConnection, ApiTrack, AudioZone, PlaybackSession};

/// Everything the realtime layer knows about current playback
///
/// Owned exclusively by [`PlayerStore`](crate::PlayerStore); obtained as a
/// snapshot via [`PlayerStore::snapshot`](crate::PlayerStore::snapshot) or
/// mutated inside [`PlayerStore::update`](crate::PlayerStore::update).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerState {
    /// Server-assigned id for this client's socket connection
    pub connection_id: Option<String>,
    /// All connections the server knows about, with liveness and players
    pub connections: Vec<ApiConnection>,
    /// All playback sessions the server reported
    pub sessions: Vec<PlaybackSession>,
    /// Which session this client considers current
    pub current_session_id: Option<u64>,
    /// All configured audio zones
    pub audio_zones: Vec<AudioZone>,
    /// Which zone is selected for playback, if any
    pub current_audio_zone_id: Option<u64>,
    /// The playlist the local adapter is driving
    pub playlist: Vec<ApiTrack>,
    /// Index into `playlist`; `None` when nothing is queued up locally
    pub playlist_position: Option<usize>,
    /// Derived from `playlist` and `playlist_position` by the store on
    /// every update; writes to it inside an update closure are overwritten
    pub current_track: Option<ApiTrack>,
    /// Seconds into the current track
    pub current_seek: f64,
    /// Length of the current track in seconds, 0.0 when unknown
    pub current_track_length: f64,
    /// Whether the local adapter is actively playing
    pub playing: bool,
}

impl PlayerState {
    /// Find a session by id
    pub fn session(&self, session_id: u64) -> Option<&PlaybackSession> {
        self.sessions.iter().find(|s| s.session_id == session_id)
    }

    /// The session `current_session_id` points at, if it still exists
    pub fn current_session(&self) -> Option<&PlaybackSession> {
        self.session(self.current_session_id?)
    }
}
