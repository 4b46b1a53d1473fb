//! Error types for the client facade

use crate::api::ApiError;
use chorus_ws::WsError;

/// Errors surfaced by the client facade
///
/// Transport-level connection failures never appear here: the websocket
/// client contains them and retries on its own.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The websocket client could not be constructed
    #[error(transparent)]
    Transport(#[from] WsError),

    /// A REST call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Reading or writing the persisted connection record failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SdkError>;
