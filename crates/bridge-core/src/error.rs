//! Error handling for the call bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while bridging a call.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Audio codec failure on either leg.
    #[error(transparent)]
    Codec(#[from] zellolink_codec_core::CodecError),

    /// Radio-leg framing failure.
    #[error(transparent)]
    Dfsi(#[from] zellolink_dfsi_core::DfsiError),

    /// Zello-leg failure.
    #[error(transparent)]
    Zello(#[from] zellolink_zello_core::ZelloError),

    /// Invariant violation inside the bridge.
    #[error("internal error: {0}")]
    Internal(String),
}
