//! Inbound frame dispatcher
//!
//! Single consumer of the transport's inbound channel. Every handler runs
//! to completion, mutating the store through one atomic `update` call,
//! before the next frame is examined, so observers never see interleaved
//! partial applications of two frames.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use chorus_models::{ApiConnection, PlaybackSession, SessionUpdate};
use chorus_state::PlayerStore;
use chorus_ws::{InboundMessage, OutboundMessage, SyncConnectionData};

use crate::outbox::Outbox;

pub(crate) struct Dispatcher {
    store: PlayerStore,
    outbox: Arc<Outbox>,
    pending: Arc<DashMap<u64, SessionUpdate>>,
    ready: watch::Sender<bool>,
}

impl Dispatcher {
    pub(crate) fn new(
        store: PlayerStore,
        outbox: Arc<Outbox>,
        pending: Arc<DashMap<u64, SessionUpdate>>,
        ready: watch::Sender<bool>,
    ) -> Self {
        Self {
            store,
            outbox,
            pending,
            ready,
        }
    }

    pub(crate) fn handle(&self, message: InboundMessage) {
        match message {
            InboundMessage::Connect { connection_id } => {
                tracing::debug!(?connection_id, "server acknowledged connect");
            }
            InboundMessage::ConnectionId { connection_id } => {
                self.on_connection_id(connection_id);
            }
            InboundMessage::ConnectionsData { payload } => {
                self.on_connections_data(payload);
            }
            InboundMessage::Sessions { payload } => {
                self.on_sessions(payload);
            }
            InboundMessage::SessionUpdated { payload } => {
                self.on_session_updated(payload);
            }
            // The transport already drops these; kept for completeness
            InboundMessage::Unknown => {}
        }
    }

    /// Store the assigned id and immediately report local connection data
    fn on_connection_id(&self, connection_id: String) {
        tracing::debug!(%connection_id, "connection id assigned");
        let playing = self.store.playing();
        self.store
            .update(|s| s.connection_id = Some(connection_id));
        self.outbox.send(OutboundMessage::SyncConnectionData {
            payload: SyncConnectionData { playing },
        });
        self.ready.send_replace(true);
    }

    fn on_connections_data(&self, connections: Vec<ApiConnection>) {
        tracing::debug!(count = connections.len(), "connections snapshot");
        self.store.update(|s| s.connections = connections);
    }

    /// Replace the session list wholesale and re-point the current session
    ///
    /// The pointer keeps its session if the new list still contains it,
    /// otherwise falls back to the first session, or to none.
    fn on_sessions(&self, sessions: Vec<PlaybackSession>) {
        tracing::debug!(count = sessions.len(), "sessions snapshot");
        self.store.update(|s| {
            let current = s
                .current_session_id
                .filter(|id| sessions.iter().any(|session| session.session_id == *id))
                .or_else(|| sessions.first().map(|session| session.session_id));
            s.sessions = sessions;
            s.current_session_id = current;
        });
    }

    /// Shallow-merge a partial update into the matching session
    fn on_session_updated(&self, update: SessionUpdate) {
        self.pending
            .remove_if(&update.session_id, |_, recorded| *recorded == update);

        self.store.update(|s| {
            match s
                .sessions
                .iter_mut()
                .find(|session| session.session_id == update.session_id)
            {
                Some(session) => {
                    tracing::trace!(session_id = update.session_id, "merging session update");
                    session.apply_update(&update);
                }
                None => {
                    tracing::warn!(
                        session_id = update.session_id,
                        "update for unknown session ignored"
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use chorus_models::{ApiTrack, TrackApiSource};

    use super::*;

    fn test_track(id: u64) -> ApiTrack {
        ApiTrack {
            track_id: id,
            title: format!("Track {id}"),
            number: 1,
            album: String::new(),
            album_id: 0,
            artist: String::new(),
            artist_id: 0,
            duration: 100.0,
            source: TrackApiSource::Library,
        }
    }

    fn test_session(session_id: u64, name: &str) -> PlaybackSession {
        PlaybackSession {
            session_id,
            name: name.to_string(),
            active: false,
            playing: false,
            position: None,
            seek: None,
            volume: None,
            active_players: vec![],
            playlist: vec![],
        }
    }

    fn dispatcher() -> (
        Dispatcher,
        PlayerStore,
        mpsc::UnboundedReceiver<OutboundMessage>,
    ) {
        let store = PlayerStore::new();
        let outbox = Arc::new(Outbox::new());
        let (tx, rx) = mpsc::unbounded_channel();
        outbox.attach(tx);
        let (ready, _) = watch::channel(false);
        let dispatcher = Dispatcher::new(store.clone(), outbox, Arc::new(DashMap::new()), ready);
        (dispatcher, store, rx)
    }

    #[test]
    fn test_connection_id_stored_and_connection_data_synced() {
        let (dispatcher, store, mut rx) = dispatcher();
        store.update(|s| s.playing = true);

        dispatcher.handle(InboundMessage::ConnectionId {
            connection_id: "conn-1".to_string(),
        });

        assert_eq!(store.connection_id(), Some("conn-1".to_string()));
        // The local playing flag goes straight back out
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::SyncConnectionData {
                payload: SyncConnectionData { playing: true }
            }
        );
    }

    #[test]
    fn test_connection_id_sets_ready() {
        let (dispatcher, _store, _rx) = dispatcher();
        let ready_rx = dispatcher.ready.subscribe();
        assert!(!*ready_rx.borrow());

        dispatcher.handle(InboundMessage::ConnectionId {
            connection_id: "conn-1".to_string(),
        });
        assert!(*ready_rx.borrow());
    }

    #[test]
    fn test_sessions_snapshot_replaces_wholesale() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| s.sessions = vec![test_session(1, "Old")]);

        dispatcher.handle(InboundMessage::Sessions {
            payload: vec![test_session(2, "New A"), test_session(3, "New B")],
        });

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| s.session_id != 1));
    }

    #[test]
    fn test_sessions_snapshot_keeps_current_pointer_when_still_present() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| {
            s.sessions = vec![test_session(1, "A"), test_session(2, "B")];
            s.current_session_id = Some(2);
        });

        dispatcher.handle(InboundMessage::Sessions {
            payload: vec![test_session(2, "B"), test_session(5, "C")],
        });

        assert_eq!(store.current_session_id(), Some(2));
    }

    #[test]
    fn test_sessions_snapshot_falls_back_to_first_when_current_vanishes() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| {
            s.sessions = vec![test_session(1, "A")];
            s.current_session_id = Some(1);
        });

        dispatcher.handle(InboundMessage::Sessions {
            payload: vec![test_session(7, "New"), test_session(8, "Other")],
        });

        assert_eq!(store.current_session_id(), Some(7));
    }

    #[test]
    fn test_empty_sessions_snapshot_clears_current_pointer() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| {
            s.sessions = vec![test_session(1, "A")];
            s.current_session_id = Some(1);
        });

        dispatcher.handle(InboundMessage::Sessions { payload: vec![] });

        assert_eq!(store.current_session_id(), None);
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn test_session_updated_merges_only_present_fields() {
        let (dispatcher, store, _rx) = dispatcher();
        let mut session = test_session(4, "Den");
        session.playlist = vec![test_track(1)];
        session.position = Some(0);
        store.update(|s| {
            s.sessions = vec![test_session(3, "Other"), session];
            s.current_session_id = Some(3);
        });

        dispatcher.handle(InboundMessage::SessionUpdated {
            payload: SessionUpdate::new(4).with_playing(true).with_seek(12.5),
        });

        let sessions = store.sessions();
        let merged = sessions.iter().find(|s| s.session_id == 4).unwrap();
        assert!(merged.playing);
        assert_eq!(merged.seek, Some(12.5));
        // Untouched fields survive the merge
        assert_eq!(merged.position, Some(0));
        assert_eq!(merged.playlist.len(), 1);
        // Other sessions and the current pointer are untouched
        let other = sessions.iter().find(|s| s.session_id == 3).unwrap();
        assert!(!other.playing);
        assert_eq!(store.current_session_id(), Some(3));
    }

    #[test]
    fn test_session_updated_for_unknown_session_is_ignored() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| s.sessions = vec![test_session(1, "A")]);

        dispatcher.handle(InboundMessage::SessionUpdated {
            payload: SessionUpdate::new(99).with_playing(true),
        });

        assert_eq!(store.sessions().len(), 1);
        assert!(!store.sessions()[0].playing);
    }

    #[test]
    fn test_matching_echo_clears_pending_operation() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| s.sessions = vec![test_session(1, "A")]);

        let update = SessionUpdate::new(1).with_playing(true);
        dispatcher.pending.insert(1, update.clone());

        dispatcher.handle(InboundMessage::SessionUpdated {
            payload: update.clone(),
        });
        assert!(dispatcher.pending.is_empty());
    }

    #[test]
    fn test_non_matching_echo_keeps_pending_operation() {
        let (dispatcher, store, _rx) = dispatcher();
        store.update(|s| s.sessions = vec![test_session(1, "A")]);

        dispatcher
            .pending
            .insert(1, SessionUpdate::new(1).with_playing(true));

        // Another client's update to the same session
        dispatcher.handle(InboundMessage::SessionUpdated {
            payload: SessionUpdate::new(1).with_seek(3.0),
        });
        assert_eq!(dispatcher.pending.len(), 1);
    }

    #[test]
    fn test_connections_data_replaces_list() {
        let (dispatcher, store, _rx) = dispatcher();

        dispatcher.handle(InboundMessage::ConnectionsData {
            payload: vec![ApiConnection {
                connection_id: "c-1".to_string(),
                name: "Desk".to_string(),
                alive: true,
                players: vec![],
            }],
        });

        assert_eq!(store.connections().len(), 1);
        assert_eq!(store.connections()[0].connection_id, "c-1");
    }
}
