//! Outbound command API
//!
//! Session commands apply their effect to the local store first, then send
//! the frame; the server's echoed `SESSION_UPDATED` re-applies the same
//! merge, which is idempotent. There is no rollback if the server never
//! confirms: the next full `SESSIONS` snapshot reconciles any drift.
//!
//! Audio zones go over REST instead of the socket; zone membership updates
//! always carry the complete desired player list.

use chorus_models::{ApiTrack, AudioZone, PlaybackAction, SessionUpdate, TrackIdent};
use chorus_ws::{
    DeleteSessionRequest, OutboundMessage, PlaybackActionPayload, SyncConnectionData,
    UpdateSessionRequest,
};

use crate::{Client, Result};

impl Client {
    /// Ask the server to create a new session
    ///
    /// Creation is an `UPDATE_SESSION` without a session id; the server
    /// assigns one and announces the session in the next snapshot.
    /// `active_players` is the set of player ids the session should target.
    pub fn create_session(&self, name: &str, playlist: &[ApiTrack], active_players: &[u64]) {
        self.outbox.send(OutboundMessage::UpdateSession {
            payload: UpdateSessionRequest {
                session_id: None,
                name: Some(name.to_string()),
                playlist: Some(playlist.iter().map(TrackIdent::from).collect()),
                active_players: Some(active_players.to_vec()),
                ..Default::default()
            },
        });
    }

    /// Apply a partial session update locally, then send it
    ///
    /// The update is recorded in the pending registry until the server's
    /// echo clears it. On the wire the playlist is narrowed to track
    /// identifiers.
    pub fn update_session(&self, update: SessionUpdate) {
        self.store.update(|s| {
            if let Some(session) = s
                .sessions
                .iter_mut()
                .find(|session| session.session_id == update.session_id)
            {
                session.apply_update(&update);
            }
        });
        self.pending.insert(update.session_id, update.clone());
        self.outbox.send(OutboundMessage::UpdateSession {
            payload: UpdateSessionRequest::from(&update),
        });
    }

    /// Remove a session locally and ask the server to delete it
    ///
    /// If the deleted session was current, the pointer falls back to the
    /// first remaining session, or to none.
    pub fn delete_session(&self, session_id: u64) {
        self.pending.remove(&session_id);
        self.store.update(|s| {
            s.sessions.retain(|session| session.session_id != session_id);
            if s.current_session_id == Some(session_id) {
                s.current_session_id = s.sessions.first().map(|session| session.session_id);
            }
        });
        self.outbox.send(OutboundMessage::DeleteSession {
            payload: DeleteSessionRequest { session_id },
        });
    }

    /// Make a session current and mark it active on the server
    pub fn activate_session(&self, session_id: u64) {
        self.store.update(|s| s.current_session_id = Some(session_id));
        self.update_session(SessionUpdate::new(session_id).with_active(true));
    }

    /// Request a transport action against the current session
    ///
    /// Send-only: the local store changes when the resulting
    /// `SESSION_UPDATED` arrives, not before.
    pub fn playback_action(&self, action: PlaybackAction) {
        self.outbox.send(OutboundMessage::PlaybackAction {
            payload: PlaybackActionPayload {
                action,
                session_id: self.store.current_session_id(),
            },
        });
    }

    /// Remove one playlist entry, keeping the position pointed at the same
    /// track when an earlier entry disappears
    pub fn remove_track_from_playlist(&self, session_id: u64, index: usize) {
        let Some(session) = self
            .store
            .sessions()
            .into_iter()
            .find(|session| session.session_id == session_id)
        else {
            tracing::warn!(session_id, "cannot edit playlist of unknown session");
            return;
        };
        if index >= session.playlist.len() {
            tracing::warn!(session_id, index, "playlist index out of range");
            return;
        }

        let mut playlist = session.playlist;
        playlist.remove(index);

        let mut update = SessionUpdate::new(session_id).with_playlist(playlist);
        if let Some(position) = session.position {
            if index < position {
                update = update.with_position(position - 1);
            }
        }
        self.update_session(update);
    }

    /// Report local connection data (currently the playing flag)
    pub fn sync_connection_data(&self) {
        self.outbox.send(OutboundMessage::SyncConnectionData {
            payload: SyncConnectionData {
                playing: self.store.playing(),
            },
        });
    }

    /// Ask for a fresh sessions snapshot
    pub fn request_sessions(&self) {
        self.outbox.send(OutboundMessage::GetSessions);
    }

    // ------------------------------------------------------------------
    // Audio zones (REST)
    // ------------------------------------------------------------------

    /// Refresh the zone list from the server
    pub async fn fetch_audio_zones(&self) -> Result<()> {
        let zones = self.api.list_audio_zones().await?;
        self.store.update(|s| {
            let current = s
                .current_audio_zone_id
                .filter(|id| zones.iter().any(|zone| zone.id == *id))
                .or_else(|| zones.first().map(|zone| zone.id));
            s.audio_zones = zones;
            s.current_audio_zone_id = current;
        });
        Ok(())
    }

    pub async fn create_audio_zone(&self, name: &str, players: &[u64]) -> Result<AudioZone> {
        let zone = self.api.create_audio_zone(name, players).await?;
        self.store.update(|s| {
            s.audio_zones.push(zone.clone());
            if s.current_audio_zone_id.is_none() {
                s.current_audio_zone_id = Some(zone.id);
            }
        });
        Ok(zone)
    }

    /// Replace a zone's name and player list wholesale
    pub async fn update_audio_zone(&self, zone: AudioZone) -> Result<AudioZone> {
        let updated = self.api.update_audio_zone(&zone).await?;
        self.store.update(|s| {
            if let Some(existing) = s.audio_zones.iter_mut().find(|z| z.id == updated.id) {
                *existing = updated.clone();
            }
        });
        Ok(updated)
    }

    /// Delete a zone; a deleted current zone falls back to the next
    /// available zone, or to none
    pub async fn delete_audio_zone(&self, zone_id: u64) -> Result<()> {
        self.api.delete_audio_zone(zone_id).await?;
        self.store.update(|s| {
            s.audio_zones.retain(|zone| zone.id != zone_id);
            if s.current_audio_zone_id == Some(zone_id) {
                s.current_audio_zone_id = s.audio_zones.first().map(|zone| zone.id);
            }
        });
        Ok(())
    }

    /// Point playback at a zone (or none) locally
    pub fn select_audio_zone(&self, zone_id: Option<u64>) {
        self.store.update(|s| s.current_audio_zone_id = zone_id);
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio::sync::mpsc;

    use chorus_models::{PlaybackSession, TrackApiSource};

    use crate::ClientConfig;

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
            duration: 240.0,
            source: TrackApiSource::Qobuz,
        }
    }

    fn test_session(session_id: u64) -> PlaybackSession {
        PlaybackSession {
            session_id,
            name: format!("Session {session_id}"),
            active: false,
            playing: false,
            position: None,
            seek: None,
            volume: None,
            active_players: vec![],
            playlist: vec![],
        }
    }

    fn client() -> (Client, mpsc::UnboundedReceiver<OutboundMessage>) {
        let client = Client::new(ClientConfig::default()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        client.outbox.attach(tx);
        (client, rx)
    }

    #[test]
    fn test_create_session_sends_update_without_id() {
        let (client, mut rx) = client();
        client.create_session("Kitchen", &[test_track(1), test_track(2)], &[7, 9]);

        match rx.try_recv().unwrap() {
            OutboundMessage::UpdateSession { payload } => {
                assert_eq!(payload.session_id, None);
                assert_eq!(payload.name.as_deref(), Some("Kitchen"));
                let playlist = payload.playlist.unwrap();
                assert_eq!(playlist.len(), 2);
                assert_eq!(playlist[0].id, 1);
                assert_eq!(playlist[0].source, TrackApiSource::Qobuz);
                assert_eq!(payload.active_players, Some(vec![7, 9]));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_update_session_applies_locally_before_send() {
        let (client, mut rx) = client();
        client
            .store
            .update(|s| s.sessions = vec![test_session(1)]);

        client.update_session(SessionUpdate::new(1).with_playing(true).with_seek(30.0));

        // Local state reflects the update immediately
        let session = &client.store.sessions()[0];
        assert!(session.playing);
        assert_eq!(session.seek, Some(30.0));
        // The operation is pending until the server echoes it
        assert!(client.pending.contains_key(&1));
        // The frame carries the same fields
        match rx.try_recv().unwrap() {
            OutboundMessage::UpdateSession { payload } => {
                assert_eq!(payload.session_id, Some(1));
                assert_eq!(payload.playing, Some(true));
                assert_eq!(payload.seek, Some(30.0));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[rstest]
    #[case::current_falls_back_to_first_remaining(2, Some(1))]
    #[case::other_session_keeps_pointer(1, Some(2))]
    fn test_delete_session_pointer_fallback(
        #[case] deleted: u64,
        #[case] expected_current: Option<u64>,
    ) {
        let (client, mut rx) = client();
        client.store.update(|s| {
            s.sessions = vec![test_session(1), test_session(2)];
            s.current_session_id = Some(2);
        });

        client.delete_session(deleted);

        assert_eq!(client.store.current_session_id(), expected_current);
        assert_eq!(client.store.sessions().len(), 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::DeleteSession {
                payload: DeleteSessionRequest {
                    session_id: deleted
                }
            }
        );
    }

    #[test]
    fn test_delete_last_session_clears_pointer() {
        let (client, _rx) = client();
        client.store.update(|s| {
            s.sessions = vec![test_session(1)];
            s.current_session_id = Some(1);
        });

        client.delete_session(1);

        assert_eq!(client.store.current_session_id(), None);
        assert!(client.store.sessions().is_empty());
    }

    #[rstest]
    #[case::removal_before_position_shifts_it(0, Some(2), Some(1))]
    #[case::removal_at_position_keeps_it(2, Some(2), None)]
    #[case::removal_after_position_keeps_it(3, Some(2), None)]
    fn test_remove_track_position_arithmetic(
        #[case] index: usize,
        #[case] position: Option<usize>,
        #[case] expected_position_in_update: Option<usize>,
    ) {
        let (client, mut rx) = client();
        let mut session = test_session(1);
        session.playlist = vec![
            test_track(10),
            test_track(11),
            test_track(12),
            test_track(13),
        ];
        session.position = position;
        client.store.update(|s| s.sessions = vec![session]);

        client.remove_track_from_playlist(1, index);

        match rx.try_recv().unwrap() {
            OutboundMessage::UpdateSession { payload } => {
                assert_eq!(payload.playlist.unwrap().len(), 3);
                assert_eq!(payload.position, expected_position_in_update);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_remove_track_keeps_same_current_track() {
        let (client, _rx) = client();
        let mut session = test_session(1);
        session.playlist = vec![test_track(10), test_track(11), test_track(12)];
        session.position = Some(2);
        client.store.update(|s| s.sessions = vec![session]);

        client.remove_track_from_playlist(1, 0);

        let session = &client.store.sessions()[0];
        assert_eq!(session.position, Some(1));
        assert_eq!(
            session.current_track().map(|t| t.track_id),
            Some(12),
            "removing an earlier entry must not change which track is current"
        );
    }

    #[test]
    fn test_remove_track_out_of_range_sends_nothing() {
        let (client, mut rx) = client();
        let mut session = test_session(1);
        session.playlist = vec![test_track(10)];
        client.store.update(|s| s.sessions = vec![session]);

        client.remove_track_from_playlist(1, 5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_playback_action_targets_current_session() {
        let (client, mut rx) = client();
        client.store.update(|s| {
            s.sessions = vec![test_session(4)];
            s.current_session_id = Some(4);
        });

        client.playback_action(PlaybackAction::NextTrack);

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::PlaybackAction {
                payload: PlaybackActionPayload {
                    action: PlaybackAction::NextTrack,
                    session_id: Some(4),
                }
            }
        );
        // Send-only: no local mutation
        assert!(!client.store.sessions()[0].playing);
    }

    #[test]
    fn test_activate_session_sets_pointer_and_sends_active_flag() {
        let (client, mut rx) = client();
        client
            .store
            .update(|s| s.sessions = vec![test_session(1), test_session(2)]);

        client.activate_session(2);

        assert_eq!(client.store.current_session_id(), Some(2));
        match rx.try_recv().unwrap() {
            OutboundMessage::UpdateSession { payload } => {
                assert_eq!(payload.session_id, Some(2));
                assert_eq!(payload.active, Some(true));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_commands_before_start_buffer_and_flush_on_attach() {
        let client = Client::new(ClientConfig::default()).unwrap();
        client.sync_connection_data();
        client.request_sessions();

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.outbox.attach(tx);

        assert!(matches!(
            rx.try_recv().unwrap(),
            OutboundMessage::SyncConnectionData { .. }
        ));
        assert!(matches!(rx.try_recv().unwrap(), OutboundMessage::GetSessions));
    }

    #[test]
    fn test_select_audio_zone() {
        let (client, _rx) = client();
        client.select_audio_zone(Some(3));
        assert_eq!(client.store.current_audio_zone_id(), Some(3));
        client.select_audio_zone(None);
        assert_eq!(client.store.current_audio_zone_id(), None);
    }
}
