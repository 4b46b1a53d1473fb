//! Reactive playback state store
//!
//! Single source of truth for everything the UI renders about playback:
//! the session list, the current session pointer, audio zones, the active
//! playlist, seek position, and the connection roster. Three writers mutate
//! it concurrently (the inbound message dispatcher, the outbound command
//! layer's optimistic updates, and the local audio adapter), and any number
//! of observers watch exactly the fields they care about.
//!
//! # Consistency model
//!
//! Mutations go through [`PlayerStore::update`], which applies a closure to
//! the whole state record under a write lock and only then publishes the
//! fields that actually changed. Observers therefore never see a partially
//! applied composite (e.g. a new position with the old track). Conflicting
//! writes from different sources resolve by temporal order: last writer
//! wins, with no precedence rules between sources.
//!
//! # Example
//!
//! ```rust,ignore
//! use chorus_state::PlayerStore;
//!
//! let store = PlayerStore::new();
//! let mut playing = store.watch_playing();
//!
//! store.update(|state| state.playing = true);
//!
//! playing.changed().await?;
//! assert!(*playing.borrow());
//! ```

pub mod state;
pub mod store;

pub use state::PlayerState;
pub use store::PlayerStore;
