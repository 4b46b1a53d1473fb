//! Shared data model for the chorus playback-synchronization client
//!
//! These types describe the entities the realtime layer keeps in sync with
//! the server: connections and their players, audio zones, playback sessions
//! and their playlists. They are plain serde-serializable records; ownership
//! of the canonical in-memory copies belongs to the state store in
//! `chorus-state`.

pub mod action;
pub mod connection;
pub mod session;
pub mod track;
pub mod zone;

pub use action::PlaybackAction;
pub use connection::{ApiConnection, ApiPlayer, PlayerType};
pub use session::{PlaybackSession, SessionUpdate};
pub use track::{ApiTrack, TrackApiSource, TrackIdent};
pub use zone::AudioZone;
