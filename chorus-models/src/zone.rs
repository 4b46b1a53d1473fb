//! Audio zones: named groupings of players that play in sync

use serde::{Deserialize, Serialize};

use crate::connection::ApiPlayer;

/// A named, user-creatable grouping of players that play in sync
///
/// Zone membership changes are full-replacement updates: the complete
/// desired player-id list is sent, never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioZone {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub players: Vec<ApiPlayer>,
}

impl AudioZone {
    /// Ids of the players in this zone, in zone order
    pub fn player_ids(&self) -> Vec<u64> {
        self.players.iter().map(|p| p.player_id).collect()
    }
}
