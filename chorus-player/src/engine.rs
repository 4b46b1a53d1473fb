//! The seam to the concrete sound engine
//!
//! A new engine instance is created per track and replaced, never reused,
//! on track change. Loading is asynchronous on the engine's side; the
//! adapter polls [`AudioEngine::ready`] and holds back play/seek until the
//! source is resolved.

use chorus_models::ApiTrack;

/// Errors reported by a concrete engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The track's audio source could not be resolved or decoded
    #[error("Failed to load track: {0}")]
    Load(String),

    /// The output device rejected playback
    #[error("Output error: {0}")]
    Output(String),
}

/// One loaded track's playback engine
///
/// Implementations wrap whatever actually produces sound (a browser audio
/// element, a native output stream). All methods are non-blocking; loading
/// progress is observed via [`ready`](Self::ready).
pub trait AudioEngine: Send {
    /// Whether the audio source has finished loading
    fn ready(&self) -> bool;

    /// Begin or resume playback
    fn play(&mut self) -> Result<(), EngineError>;

    /// Pause playback, keeping the position
    fn pause(&mut self);

    /// Jump to an absolute position in seconds
    fn seek(&mut self, seconds: f64);

    /// Current playback position in seconds
    fn position(&self) -> f64;

    /// Track length in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Whether the loaded track reached its natural end
    fn ended(&self) -> bool;

    /// Stop playback and release the output
    fn stop(&mut self);
}

/// Creates an engine for a track
///
/// Called lazily: the first engine is created on first play, not when the
/// playlist is set.
pub trait EngineFactory: Send + Sync {
    fn create(&self, track: &ApiTrack) -> Box<dyn AudioEngine>;
}
