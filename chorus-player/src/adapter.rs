//! Playback adapter state machine
//!
//! Owns the current engine instance (singly-owned, swapped whole on track
//! change) and keeps the store's seek/playing/track cells in line with what
//! the engine actually does.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use chorus_state::PlayerStore;

use crate::engine::{AudioEngine, EngineError, EngineFactory};

/// Where the adapter is in the playback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Nothing loaded
    Stopped,
    /// Track source resolving; play/seek intent buffered
    Loading,
    /// Engine producing sound
    Playing,
    /// Engine loaded, output suspended
    Paused,
    /// Natural end observed, transition pending
    Ended,
}

/// Configuration for the playback adapter
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// How often the engine position is sampled while playing.
    /// Default: 200 ms
    pub position_poll_interval: Duration,

    /// Past this many seconds into a track, "previous" restarts the track
    /// instead of moving back a playlist entry. Default: 5 seconds
    pub previous_restart_threshold: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position_poll_interval: Duration::from_millis(200),
            previous_restart_threshold: 5.0,
        }
    }
}

impl PlayerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval = interval;
        self
    }

    pub fn with_previous_restart_threshold(mut self, seconds: f64) -> Self {
        self.previous_restart_threshold = seconds;
        self
    }
}

/// Bridges playlist intent in the store to a concrete audio engine
pub struct PlayerAdapter {
    store: PlayerStore,
    factory: Arc<dyn EngineFactory>,
    config: PlayerConfig,
    engine: Option<Box<dyn AudioEngine>>,
    state: AdapterState,
    /// Seek requested while the engine was still loading
    pending_seek: Option<f64>,
    /// Whether playback should begin once loading completes
    intent_playing: bool,
    /// Last whole-second position written to the store
    last_reported_seek: Option<i64>,
}

impl PlayerAdapter {
    pub fn new(store: PlayerStore, factory: Arc<dyn EngineFactory>, config: PlayerConfig) -> Self {
        Self {
            store,
            factory,
            config,
            engine: None,
            state: AdapterState::Stopped,
            pending_seek: None,
            intent_playing: false,
            last_reported_seek: None,
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Replace the local playlist and stop any current playback
    pub fn set_playlist(&mut self, tracks: Vec<chorus_models::ApiTrack>, position: Option<usize>) {
        self.drop_engine();
        self.state = AdapterState::Stopped;
        self.pending_seek = None;
        self.intent_playing = false;
        self.last_reported_seek = None;
        self.store.update(|s| {
            s.playlist = tracks;
            s.playlist_position = position;
            s.current_seek = 0.0;
            s.current_track_length = 0.0;
            s.playing = false;
        });
    }

    /// Begin or resume playback
    ///
    /// The engine for the current track is created here on first play, not
    /// when the playlist is set.
    pub fn play(&mut self) -> Result<(), EngineError> {
        match self.state {
            AdapterState::Playing => Ok(()),
            AdapterState::Paused => {
                self.intent_playing = true;
                if let Some(engine) = self.engine.as_mut() {
                    engine.play()?;
                    self.state = AdapterState::Playing;
                    self.store.update(|s| s.playing = true);
                } else {
                    // Paused with no engine only happens after a failed
                    // load; retry from the current position
                    self.start_current_track()?;
                }
                Ok(())
            }
            AdapterState::Loading => {
                self.intent_playing = true;
                Ok(())
            }
            AdapterState::Stopped | AdapterState::Ended => self.start_current_track(),
        }
    }

    /// Pause playback, keeping the loaded track and position
    pub fn pause(&mut self) {
        self.intent_playing = false;
        if let Some(engine) = self.engine.as_mut() {
            engine.pause();
        }
        // A load in progress continues; finish_loading settles into Paused
        if self.state == AdapterState::Playing {
            self.state = AdapterState::Paused;
        }
        self.store.update(|s| s.playing = false);
    }

    /// Stop playback and clear the current track and seek
    pub fn stop(&mut self) {
        self.drop_engine();
        self.state = AdapterState::Stopped;
        self.pending_seek = None;
        self.intent_playing = false;
        self.last_reported_seek = None;
        self.store.update(|s| {
            s.playing = false;
            s.playlist_position = None;
            s.current_seek = 0.0;
            s.current_track_length = 0.0;
        });
    }

    /// Jump to an absolute position in the current track
    ///
    /// If the engine is still loading, the seek is buffered and applied
    /// once loading completes rather than dropped.
    pub fn seek(&mut self, seconds: f64) {
        let length = self.store.current_track_length();
        let seconds = if length > 0.0 {
            seconds.clamp(0.0, length)
        } else {
            seconds.max(0.0)
        };

        match self.engine.as_mut() {
            Some(engine) if engine.ready() => {
                engine.seek(seconds);
                self.last_reported_seek = Some(seconds.round() as i64);
                self.store.update(|s| s.current_seek = seconds);
            }
            _ => {
                tracing::debug!(seconds, "buffering seek until load completes");
                self.pending_seek = Some(seconds);
                self.store.update(|s| s.current_seek = seconds);
            }
        }
    }

    /// Advance to the next playlist entry, if one exists
    pub fn next_track(&mut self) -> Result<(), EngineError> {
        let position = self.store.playlist_position().unwrap_or(0);
        if position + 1 < self.store.playlist().len() {
            self.load_track(position + 1)
        } else {
            tracing::debug!("no next track");
            Ok(())
        }
    }

    /// Go back one entry, or restart the current track
    ///
    /// More than `previous_restart_threshold` seconds into a track,
    /// "previous" restarts the track; within the threshold it moves the
    /// position back one entry.
    pub fn previous_track(&mut self) -> Result<(), EngineError> {
        if self.store.current_seek() > self.config.previous_restart_threshold {
            tracing::debug!("restarting current track");
            self.seek(0.0);
            Ok(())
        } else {
            let position = self.store.playlist_position().unwrap_or(0);
            self.load_track(position.saturating_sub(1))
        }
    }

    /// Drive pending loads, end-of-track handling, and position sampling
    ///
    /// Called on the position-poll interval by [`spawn_poll_loop`]; tests
    /// call it directly.
    pub fn tick(&mut self) {
        match self.state {
            AdapterState::Loading => {
                if self.engine.as_ref().is_some_and(|e| e.ready()) {
                    self.finish_loading();
                }
            }
            AdapterState::Playing => {
                if self.engine.as_ref().is_some_and(|e| e.ended()) {
                    self.state = AdapterState::Ended;
                    self.handle_track_end();
                } else {
                    self.sample_position();
                }
            }
            AdapterState::Stopped | AdapterState::Paused | AdapterState::Ended => {}
        }
    }

    /// Start playing whatever the playlist position points at
    fn start_current_track(&mut self) -> Result<(), EngineError> {
        let playlist = self.store.playlist();
        if playlist.is_empty() {
            tracing::debug!("play requested with empty playlist");
            return Ok(());
        }
        let position = self
            .store
            .playlist_position()
            .filter(|p| *p < playlist.len())
            .unwrap_or(0);
        self.intent_playing = true;
        self.load_track(position)
    }

    /// Swap in a fresh engine for the playlist entry at `position`
    ///
    /// The previous engine is stopped and dropped first so its callbacks
    /// can never fire into the new track.
    fn load_track(&mut self, position: usize) -> Result<(), EngineError> {
        let Some(track) = self.store.playlist().get(position).cloned() else {
            return Err(EngineError::Load(format!(
                "no playlist entry at position {position}"
            )));
        };

        self.drop_engine();
        tracing::debug!(track_id = track.track_id, position, "loading track");

        self.engine = Some(self.factory.create(&track));
        self.state = AdapterState::Loading;
        self.last_reported_seek = Some(0);
        self.store.update(|s| {
            s.playlist_position = Some(position);
            s.current_seek = 0.0;
            s.current_track_length = track.duration;
        });

        // Engines with an already-resolved source start without waiting
        // for the next poll tick
        if self.engine.as_ref().is_some_and(|e| e.ready()) {
            self.finish_loading();
        }
        Ok(())
    }

    /// Complete a load: apply the buffered seek, settle play/pause intent
    fn finish_loading(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if let Some(duration) = engine.duration() {
            self.store.update(|s| s.current_track_length = duration);
        }

        if let Some(seconds) = self.pending_seek.take() {
            tracing::debug!(seconds, "applying buffered seek");
            engine.seek(seconds);
            self.last_reported_seek = Some(seconds.round() as i64);
            self.store.update(|s| s.current_seek = seconds);
        }

        if self.intent_playing {
            match engine.play() {
                Ok(()) => {
                    self.state = AdapterState::Playing;
                    self.store.update(|s| s.playing = true);
                }
                Err(e) => {
                    tracing::error!("engine failed to start: {e}");
                    self.state = AdapterState::Paused;
                    self.store.update(|s| s.playing = false);
                }
            }
        } else {
            self.state = AdapterState::Paused;
        }
    }

    /// Natural end: advance to the next entry or stop at end of playlist
    fn handle_track_end(&mut self) {
        let position = self.store.playlist_position().unwrap_or(0);
        if position + 1 < self.store.playlist().len() {
            tracing::debug!(position, "track ended, advancing");
            self.intent_playing = true;
            if let Err(e) = self.load_track(position + 1) {
                tracing::error!("failed to load next track: {e}");
                self.stop();
            }
        } else {
            tracing::debug!("playlist exhausted");
            self.stop();
        }
    }

    /// Sample the engine position, writing only whole-second changes
    fn sample_position(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let position = engine.position();
        let rounded = position.round() as i64;
        if self.last_reported_seek != Some(rounded) {
            self.last_reported_seek = Some(rounded);
            self.store.update(|s| s.current_seek = position);
        }
    }

    fn drop_engine(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }
    }
}

impl std::fmt::Debug for PlayerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerAdapter")
            .field("state", &self.state)
            .field("pending_seek", &self.pending_seek)
            .field("intent_playing", &self.intent_playing)
            .finish()
    }
}

/// Handle to the spawned position-poll loop
///
/// Dropping the handle does not stop the loop; call [`stop`](Self::stop)
/// explicitly so timers never leak across track changes or reconnects.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
}

impl PollHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the interval loop that drives [`PlayerAdapter::tick`]
pub fn spawn_poll_loop(adapter: Arc<Mutex<PlayerAdapter>>) -> PollHandle {
    let interval = adapter.lock().config.position_poll_interval;
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => adapter.lock().tick(),
            }
        }
        tracing::debug!("position poll loop stopped");
    });

    PollHandle { cancel }
}
