//! Error types for the chorus-ws crate

/// Errors constructing or driving the websocket client
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// The server URL could not be parsed
    #[error("Invalid websocket URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The URL scheme is not ws or wss
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error sending an outbound frame through a [`WsHandle`](crate::WsHandle)
///
/// Only occurs after the client has been torn down; frames sent while the
/// socket is between reconnect attempts are queued and flushed on reopen.
#[derive(Debug, thiserror::Error)]
#[error("Websocket client is closed")]
pub struct WsSendError;
