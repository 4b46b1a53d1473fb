//! Persisted connection record
//!
//! The client keeps one JSON file describing the server it talks to and the
//! identity it last used: connection id, display name, API URL, and tokens.
//! The record is loaded on startup and replaced wholesale whenever the
//! server rejects the stored identity.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One saved server connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    /// Last server-assigned connection id, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Display name this client reports for itself
    pub name: String,
    /// Base URL of the REST surface
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_token: Option<String>,
}

/// Load the record, if one was saved
///
/// A missing file is not an error. A file that no longer parses is treated
/// as absent so a stale format can never wedge startup.
pub fn load(path: &Path) -> io::Result<Option<ConnectionRecord>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    match serde_json::from_str(&contents) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!("discarding unreadable connection record: {e}");
            Ok(None)
        }
    }
}

/// Replace the saved record
pub fn save(path: &Path, record: &ConnectionRecord) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record).map_err(io::Error::other)?;
    fs::write(path, json)
}

/// Delete the saved record; absent is fine
pub fn clear(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
