//! REST client for the server surfaces the realtime layer consumes
//!
//! Audio zones are managed over REST, not the socket; zone updates are
//! full replacements of the player list. Authentication uses a one-shot
//! magic token exchanged for client credentials.

use serde::{Deserialize, Serialize};

use chorus_models::AudioZone;

/// Errors from the REST surface
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be completed
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}")]
    Status { status: reqwest::StatusCode },
}

/// Credentials returned by a magic-token exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicTokenCredentials {
    pub client_id: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioZoneBody<'a> {
    name: &'a str,
    players: &'a [u64],
}

/// Client for the server's REST endpoints
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: parking_lot::RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: parking_lot::RwLock::new(None),
        }
    }

    /// Set the bearer token used for subsequent requests
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = self.token.read().as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Exchange a one-shot magic token for client credentials
    ///
    /// Returns `None` when the token is unknown or already consumed.
    pub async fn magic_token(&self, token: &str) -> Result<Option<MagicTokenCredentials>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/auth/magic-token")
            .query(&[("magicToken", token)])
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::UNAUTHORIZED => Ok(None),
            status => Err(ApiError::Status { status }),
        }
    }

    /// Whether the server still considers a connection id live
    pub async fn connection_alive(&self, connection_id: &str) -> Result<bool, ApiError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/connections/{connection_id}/alive"),
            )
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            status => Err(ApiError::Status { status }),
        }
    }

    pub async fn list_audio_zones(&self) -> Result<Vec<AudioZone>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/audio-zones")
            .send()
            .await?;
        Self::check(response.status())?;
        Ok(response.json().await?)
    }

    pub async fn create_audio_zone(
        &self,
        name: &str,
        players: &[u64],
    ) -> Result<AudioZone, ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/audio-zones")
            .json(&AudioZoneBody { name, players })
            .send()
            .await?;
        Self::check(response.status())?;
        Ok(response.json().await?)
    }

    /// Replace a zone's name and player list wholesale
    pub async fn update_audio_zone(&self, zone: &AudioZone) -> Result<AudioZone, ApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/audio-zones/{}", zone.id))
            .json(&AudioZoneBody {
                name: &zone.name,
                players: &zone.player_ids(),
            })
            .send()
            .await?;
        Self::check(response.status())?;
        Ok(response.json().await?)
    }

    pub async fn delete_audio_zone(&self, zone_id: u64) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/audio-zones/{zone_id}"))
            .send()
            .await?;
        Self::check(response.status())
    }

    fn check(status: reqwest::StatusCode) -> Result<(), ApiError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status { status })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let api = ApiClient::new("http://localhost:8000/");
        assert_eq!(api.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_magic_token_credentials_parse() {
        let credentials: MagicTokenCredentials =
            serde_json::from_str(r#"{"clientId": "c1", "accessToken": "t1"}"#).unwrap();
        assert_eq!(credentials.client_id, "c1");
        assert_eq!(credentials.access_token, "t1");
    }
}
