//! Zello WebSocket session for the ZelloLink gateway.
//!
//! The Zello leg speaks a JSON control plane and binary Opus audio frames
//! over one long-lived WebSocket. This crate owns that socket end to end:
//! logon with a developer token or a freshly minted RS256 JWT, the stream
//! start/stop handshake, inbound audio decode down to 8 kHz PCM, outbound
//! PCM encode up to 60 ms Opus packets, keep-alive pings, and a bounded
//! reconnect driver that survives server closes without losing call
//! state.
//!
//! The session is the only reader of its socket. Everything it learns is
//! handed to the bridge as [`SessionEvent`]s on a channel; everything the
//! bridge sends goes through the session's serialized sink.

pub mod alias;
pub mod codec_header;
pub mod error;
pub mod jwt;
pub mod keepalive;
pub mod message;
pub mod session;

pub use alias::AliasMap;
pub use codec_header::CodecAttributes;
pub use error::{Result, ZelloError};
pub use jwt::create_jwt;
pub use keepalive::{KeepAlive, KeepAliveEvent};
pub use message::{decode_audio_frame, encode_audio_frame, parse_page_command, ServerMessage};
pub use session::{SessionEvent, SessionState, ZelloSession, ZelloSessionConfig};

/// Default Zello WebSocket endpoint.
pub const ZELLO_DEFAULT_URL: &str = "wss://zello.io/ws";
