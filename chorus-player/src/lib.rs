//! Local audio engine adapter
//!
//! Bridges the state store's playlist/position intent to an actual
//! sound-producing engine and reports real engine events back into the
//! store. The engine itself sits behind the [`AudioEngine`] trait; this
//! crate contains no codec or output-device code.
//!
//! State machine:
//!
//! ```text
//! Stopped -> Loading -> Playing <-> Paused
//!                          |
//!                        Ended -> Loading (next track)
//!                          |
//!                        Stopped (no next track)
//! ```
//!
//! The adapter is driven by [`PlayerAdapter::tick`], called on a fixed
//! interval by [`spawn_poll_loop`]. Each tick finishes pending loads,
//! applies buffered seeks, samples the engine position, and handles natural
//! end-of-track.

pub mod adapter;
pub mod engine;

pub use adapter::{spawn_poll_loop, AdapterState, PlayerAdapter, PlayerConfig, PollHandle};
pub use engine::{AudioEngine, EngineError, EngineFactory};
