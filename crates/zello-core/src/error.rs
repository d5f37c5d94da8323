//! Error handling for the Zello leg.

use thiserror::Error;

/// Result type alias for Zello session operations.
pub type Result<T> = std::result::Result<T, ZelloError>;

/// Errors that can occur on the Zello WebSocket leg.
#[derive(Error, Debug)]
pub enum ZelloError {
    /// WebSocket transport failure.
    #[error("websocket error: {0}")]
    Network(String),

    /// The session is not connected.
    #[error("not connected")]
    NotConnected,

    /// Malformed control message or audio frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Codec header did not decode to the expected shape.
    #[error("invalid codec header: {0}")]
    InvalidHeader(String),

    /// Logon was rejected or never acknowledged.
    #[error("logon failed: {0}")]
    LogonFailed(String),

    /// An empty issuer or key was passed to the JWT signer.
    #[error("empty jwt input")]
    EmptyInput,

    /// The PEM block did not decode to an RSA private key.
    #[error("pem parse failed: {0}")]
    PemParse(String),

    /// JWT signing failed.
    #[error("jwt sign failed: {0}")]
    JwtSign(String),

    /// All reconnect attempts were exhausted; the sticky flag is set.
    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,

    /// Timed out waiting for a server response.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// Alias file could not be read or parsed.
    #[error("alias file error: {0}")]
    AliasFile(String),

    /// Audio codec failure.
    #[error(transparent)]
    Codec(#[from] zellolink_codec_core::CodecError),

    /// JSON serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ZelloError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Network(err.to_string())
    }
}
