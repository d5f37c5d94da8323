//! Interface to the externally provided FNE transport.
//!
//! The gateway never opens the UDP socket itself; the host wires in an
//! implementation of [`FnePeer`] and forwards the transport's receive
//! callbacks as [`PeerEvent`]s. Payloads handed to the peer are already
//! framed by this crate.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Fields delivered with every P25 message from the FNE master.
#[derive(Debug, Clone)]
pub struct P25Data {
    pub peer_id: u32,
    pub src_id: u32,
    pub dst_id: u32,
    pub call_type: u8,
    pub duid: u8,
    pub frame_type: u8,
    pub stream_id: u32,
    pub data: Bytes,
}

/// Events raised by the FNE transport.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The peer completed its login handshake with the master.
    Connected { peer_id: u32 },
    /// A P25 message arrived from the master.
    P25Data(P25Data),
}

/// Sub-interface of the FNE transport consumed by the bridge.
#[async_trait]
pub trait FnePeer: Send + Sync {
    /// Send a framed P25 payload to the master.
    async fn send_master(&self, payload: Bytes, pkt_seq: u16, stream_id: u32) -> Result<()>;

    /// Send a TSBK to the master.
    async fn send_tsbk(&self, payload: Bytes, stream_id: u32) -> Result<()>;

    /// Current packet sequence counter; `reset` restarts it for a new
    /// stream.
    fn pkt_seq(&self, reset: bool) -> u16;
}
