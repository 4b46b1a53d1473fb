//! The shared, observable store around [`PlayerState`]
//!
//! Each field is exposed as an independently observable cell backed by a
//! `tokio::sync::watch` channel. Change detection is by `PartialEq`
//! comparison of the field before and after an update closure runs: a field
//! whose value did not change never wakes its watchers.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use chorus_models::{ApiConnection, ApiTrack, AudioZone, PlaybackSession};

use crate::state::PlayerState;

/// Per-field watch publishers
///
/// One sender per observable cell. Values published here are clones taken
/// after the full update closure has run.
struct Channels {
    connection_id: watch::Sender<Option<String>>,
    connections: watch::Sender<Vec<ApiConnection>>,
    sessions: watch::Sender<Vec<PlaybackSession>>,
    current_session_id: watch::Sender<Option<u64>>,
    audio_zones: watch::Sender<Vec<AudioZone>>,
    current_audio_zone_id: watch::Sender<Option<u64>>,
    playlist: watch::Sender<Vec<ApiTrack>>,
    playlist_position: watch::Sender<Option<usize>>,
    current_track: watch::Sender<Option<ApiTrack>>,
    current_seek: watch::Sender<f64>,
    current_track_length: watch::Sender<f64>,
    playing: watch::Sender<bool>,
}

impl Channels {
    fn new(initial: &PlayerState) -> Self {
        Self {
            connection_id: watch::channel(initial.connection_id.clone()).0,
            connections: watch::channel(initial.connections.clone()).0,
            sessions: watch::channel(initial.sessions.clone()).0,
            current_session_id: watch::channel(initial.current_session_id).0,
            audio_zones: watch::channel(initial.audio_zones.clone()).0,
            current_audio_zone_id: watch::channel(initial.current_audio_zone_id).0,
            playlist: watch::channel(initial.playlist.clone()).0,
            playlist_position: watch::channel(initial.playlist_position).0,
            current_track: watch::channel(initial.current_track.clone()).0,
            current_seek: watch::channel(initial.current_seek).0,
            current_track_length: watch::channel(initial.current_track_length).0,
            playing: watch::channel(initial.playing).0,
        }
    }
}

struct Inner {
    state: RwLock<PlayerState>,
    channels: Channels,
}

/// Shared handle to the playback state store
///
/// Cheap to clone; all clones share the same state. Constructed once per
/// process by the client facade and passed by reference to the dispatcher,
/// the command layer, and the audio adapter.
#[derive(Clone)]
pub struct PlayerStore {
    inner: Arc<Inner>,
}

impl PlayerStore {
    /// Create an empty store
    pub fn new() -> Self {
        let initial = PlayerState::default();
        let channels = Channels::new(&initial);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(initial),
                channels,
            }),
        }
    }

    /// Apply a mutation atomically and notify watchers of changed fields
    ///
    /// The closure runs under the state write lock; watchers are notified
    /// after it returns, so no observer can see a half-applied composite.
    /// `current_track` is re-derived from the playlist and position after
    /// the closure runs.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut PlayerState),
    {
        let mut state = self.inner.state.write();
        let old = state.clone();
        f(&mut state);

        state.current_track = state
            .playlist_position
            .and_then(|pos| state.playlist.get(pos).cloned());

        let ch = &self.inner.channels;
        macro_rules! publish_changed {
            ($($field:ident),* $(,)?) => {
                $(
                    if old.$field != state.$field {
                        tracing::trace!(field = stringify!($field), "store field changed");
                        ch.$field.send_replace(state.$field.clone());
                    }
                )*
            };
        }
        publish_changed!(
            connection_id,
            connections,
            sessions,
            current_session_id,
            audio_zones,
            current_audio_zone_id,
            playlist,
            playlist_position,
            current_track,
            current_seek,
            current_track_length,
            playing,
        );
    }

    /// Clone the full state record
    pub fn snapshot(&self) -> PlayerState {
        self.inner.state.read().clone()
    }

    // ------------------------------------------------------------------
    // Field getters
    // ------------------------------------------------------------------

    pub fn connection_id(&self) -> Option<String> {
        self.inner.state.read().connection_id.clone()
    }

    pub fn connections(&self) -> Vec<ApiConnection> {
        self.inner.state.read().connections.clone()
    }

    pub fn sessions(&self) -> Vec<PlaybackSession> {
        self.inner.state.read().sessions.clone()
    }

    pub fn current_session_id(&self) -> Option<u64> {
        self.inner.state.read().current_session_id
    }

    /// The current session record, if the pointer resolves
    pub fn current_session(&self) -> Option<PlaybackSession> {
        self.inner.state.read().current_session().cloned()
    }

    pub fn audio_zones(&self) -> Vec<AudioZone> {
        self.inner.state.read().audio_zones.clone()
    }

    pub fn current_audio_zone_id(&self) -> Option<u64> {
        self.inner.state.read().current_audio_zone_id
    }

    pub fn playlist(&self) -> Vec<ApiTrack> {
        self.inner.state.read().playlist.clone()
    }

    pub fn playlist_position(&self) -> Option<usize> {
        self.inner.state.read().playlist_position
    }

    pub fn current_track(&self) -> Option<ApiTrack> {
        self.inner.state.read().current_track.clone()
    }

    pub fn current_seek(&self) -> f64 {
        self.inner.state.read().current_seek
    }

    pub fn current_track_length(&self) -> f64 {
        self.inner.state.read().current_track_length
    }

    pub fn playing(&self) -> bool {
        self.inner.state.read().playing
    }

    // ------------------------------------------------------------------
    // Field watchers
    // ------------------------------------------------------------------

    pub fn watch_connection_id(&self) -> watch::Receiver<Option<String>> {
        self.inner.channels.connection_id.subscribe()
    }

    pub fn watch_connections(&self) -> watch::Receiver<Vec<ApiConnection>> {
        self.inner.channels.connections.subscribe()
    }

    pub fn watch_sessions(&self) -> watch::Receiver<Vec<PlaybackSession>> {
        self.inner.channels.sessions.subscribe()
    }

    pub fn watch_current_session_id(&self) -> watch::Receiver<Option<u64>> {
        self.inner.channels.current_session_id.subscribe()
    }

    pub fn watch_audio_zones(&self) -> watch::Receiver<Vec<AudioZone>> {
        self.inner.channels.audio_zones.subscribe()
    }

    pub fn watch_current_audio_zone_id(&self) -> watch::Receiver<Option<u64>> {
        self.inner.channels.current_audio_zone_id.subscribe()
    }

    pub fn watch_playlist(&self) -> watch::Receiver<Vec<ApiTrack>> {
        self.inner.channels.playlist.subscribe()
    }

    pub fn watch_playlist_position(&self) -> watch::Receiver<Option<usize>> {
        self.inner.channels.playlist_position.subscribe()
    }

    pub fn watch_current_track(&self) -> watch::Receiver<Option<ApiTrack>> {
        self.inner.channels.current_track.subscribe()
    }

    pub fn watch_current_seek(&self) -> watch::Receiver<f64> {
        self.inner.channels.current_seek.subscribe()
    }

    pub fn watch_current_track_length(&self) -> watch::Receiver<f64> {
        self.inner.channels.current_track_length.subscribe()
    }

    pub fn watch_playing(&self) -> watch::Receiver<bool> {
        self.inner.channels.playing.subscribe()
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("PlayerStore")
            .field("sessions", &state.sessions.len())
            .field("current_session_id", &state.current_session_id)
            .field("playing", &state.playing)
            .finish()
    }
}
