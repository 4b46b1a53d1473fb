//! Playback transport actions

use serde::{Deserialize, Serialize};

/// A transport action requested against the current session
///
/// Actions are sent to the server only; the local store is not mutated
/// directly. The echoed `SESSION_UPDATED` frame is the source of truth for
/// cross-client sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaybackAction {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
}
