//! Minimal FNE peer transport over UDP.
//!
//! Framed voice payloads travel to the master inside a small envelope:
//!
//! ```text
//! 0      function (protocol)
//! 1      sub-function (P25)
//! 2..6   peer id, big-endian
//! 6..10  stream id, big-endian
//! 10..12 packet sequence, big-endian
//! 12..   P25 message payload
//! ```
//!
//! Inbound datagrams use the same envelope; the P25 message header inside
//! the payload supplies the call addressing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use zellolink_dfsi_core::ldu::header_ids;
use zellolink_dfsi_core::{DfsiError, FnePeer, P25Data, PeerEvent};

/// Envelope function: protocol data.
pub const NET_FUNC_PROTOCOL: u8 = 0x20;
/// Envelope sub-function: DMR.
pub const NET_PROTOCOL_SUBFUNC_DMR: u8 = 0x07;
/// Envelope sub-function: P25.
pub const NET_PROTOCOL_SUBFUNC_P25: u8 = 0x08;
/// Envelope sub-function: trunking control.
pub const NET_PROTOCOL_SUBFUNC_TSBK: u8 = 0x09;

/// Envelope header length.
const ENVELOPE_LEN: usize = 12;

/// Largest accepted datagram.
const MAX_DATAGRAM: usize = 1500;

/// FNE peer speaking the UDP envelope toward one master.
pub struct UdpFnePeer {
    socket: Arc<UdpSocket>,
    master: SocketAddr,
    peer_id: u32,
    /// Sub-function stamped on voice payloads (P25 or DMR).
    voice_subfunc: u8,
    pkt_seq: AtomicU16,
}

impl UdpFnePeer {
    /// Bind a local socket and start the receive task. Voice payloads go
    /// out under `voice_subfunc`; events from the master arrive on the
    /// returned channel.
    pub async fn connect(
        master: SocketAddr,
        peer_id: u32,
        voice_subfunc: u8,
    ) -> anyhow::Result<(Arc<Self>, mpsc::UnboundedReceiver<PeerEvent>)> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        info!(%master, peer_id, local = %socket.local_addr()?, "fne peer socket bound");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let peer = Arc::new(Self {
            socket: Arc::clone(&socket),
            master,
            peer_id,
            voice_subfunc,
            pkt_seq: AtomicU16::new(0),
        });

        tokio::spawn(Self::receive_loop(socket, master, events_tx.clone()));
        let _ = events_tx.send(PeerEvent::Connected { peer_id });
        Ok((peer, events_rx))
    }

    async fn receive_loop(
        socket: Arc<UdpSocket>,
        master: SocketAddr,
        events_tx: mpsc::UnboundedSender<PeerEvent>,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(ok) => ok,
                Err(e) => {
                    warn!(error = %e, "fne receive failed");
                    break;
                }
            };
            if from != master {
                debug!(%from, "ignoring datagram from unknown sender");
                continue;
            }
            match parse_envelope(&buf[..len]) {
                Some(data) => {
                    if events_tx.send(PeerEvent::P25Data(data)).is_err() {
                        break;
                    }
                }
                None => debug!(len, "ignoring malformed fne datagram"),
            }
        }
    }

    fn envelope(&self, subfunc: u8, payload: &[u8], pkt_seq: u16, stream_id: u32) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(ENVELOPE_LEN + payload.len());
        buf.put_u8(NET_FUNC_PROTOCOL);
        buf.put_u8(subfunc);
        buf.put_u32(self.peer_id);
        buf.put_u32(stream_id);
        buf.put_u16(pkt_seq);
        buf.put_slice(payload);
        buf.to_vec()
    }

    async fn send(&self, datagram: Vec<u8>) -> Result<(), DfsiError> {
        self.socket
            .send_to(&datagram, self.master)
            .await
            .map_err(|e| DfsiError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl FnePeer for UdpFnePeer {
    async fn send_master(
        &self,
        payload: Bytes,
        pkt_seq: u16,
        stream_id: u32,
    ) -> Result<(), DfsiError> {
        self.send(self.envelope(self.voice_subfunc, &payload, pkt_seq, stream_id))
            .await
    }

    async fn send_tsbk(&self, payload: Bytes, stream_id: u32) -> Result<(), DfsiError> {
        let seq = self.pkt_seq(false);
        self.send(self.envelope(NET_PROTOCOL_SUBFUNC_TSBK, &payload, seq, stream_id))
            .await
    }

    fn pkt_seq(&self, reset: bool) -> u16 {
        if reset {
            self.pkt_seq.store(0, Ordering::SeqCst);
        }
        self.pkt_seq.fetch_add(1, Ordering::SeqCst)
    }
}

/// Parse an inbound envelope into a P25 data event.
fn parse_envelope(datagram: &[u8]) -> Option<P25Data> {
    if datagram.len() <= ENVELOPE_LEN || datagram[0] != NET_FUNC_PROTOCOL {
        return None;
    }
    let subfunc = datagram[1];
    if subfunc != NET_PROTOCOL_SUBFUNC_P25
        && subfunc != NET_PROTOCOL_SUBFUNC_DMR
        && subfunc != NET_PROTOCOL_SUBFUNC_TSBK
    {
        return None;
    }
    let peer_id = u32::from_be_bytes([datagram[2], datagram[3], datagram[4], datagram[5]]);
    let stream_id = u32::from_be_bytes([datagram[6], datagram[7], datagram[8], datagram[9]]);
    let payload = &datagram[ENVELOPE_LEN..];

    let duid = if subfunc == NET_PROTOCOL_SUBFUNC_TSBK {
        zellolink_dfsi_core::P25_DUID_TSDU
    } else {
        payload[0]
    };
    // DMR control frames are shorter than a P25 message header, so their
    // addressing is read through the DMR header layout.
    let (dst_id, src_id) = if subfunc == NET_PROTOCOL_SUBFUNC_DMR {
        zellolink_dfsi_core::dmr::call_info(payload)
            .map(|info| (info.dst_id, info.src_id))
            .unwrap_or((0, 0))
    } else {
        header_ids(payload).unwrap_or((0, 0))
    };

    Some(P25Data {
        peer_id,
        src_id,
        dst_id,
        call_type: payload.get(1).copied().unwrap_or(0),
        duid,
        frame_type: 0,
        stream_id,
        data: Bytes::copy_from_slice(payload),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zellolink_dfsi_core::ldu::{pack_tdu, LinkControl};
    use zellolink_dfsi_core::{VoiceSuperFrame, P25_DUID_LDU1, P25_DUID_TDU};

    #[tokio::test]
    async fn test_send_master_wraps_payload() {
        let master = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let master_addr = master.local_addr().unwrap();

        let (peer, _events) =
            UdpFnePeer::connect(master_addr, 42, NET_PROTOCOL_SUBFUNC_P25).await.unwrap();
        let payload = pack_tdu(1, 2, 42, false);
        peer.send_master(Bytes::from(payload.clone()), 7, 1000).await.unwrap();

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = master.recv_from(&mut buf).await.unwrap();
        let datagram = &buf[..len];

        assert_eq!(datagram[0], NET_FUNC_PROTOCOL);
        assert_eq!(datagram[1], NET_PROTOCOL_SUBFUNC_P25);
        assert_eq!(&datagram[2..6], &42u32.to_be_bytes());
        assert_eq!(&datagram[6..10], &1000u32.to_be_bytes());
        assert_eq!(&datagram[10..12], &7u16.to_be_bytes());
        assert_eq!(&datagram[ENVELOPE_LEN..], payload.as_slice());
    }

    #[tokio::test]
    async fn test_inbound_ldu_becomes_event() {
        let master = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let master_addr = master.local_addr().unwrap();

        let (peer, mut events) =
            UdpFnePeer::connect(master_addr, 42, NET_PROTOCOL_SUBFUNC_P25).await.unwrap();
        assert!(matches!(events.recv().await, Some(PeerEvent::Connected { peer_id: 42 })));

        // Learn the peer's local address by receiving one datagram.
        peer.send_master(Bytes::from(pack_tdu(1, 2, 42, false)), 0, 1).await.unwrap();
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (_, peer_addr) = master.recv_from(&mut buf).await.unwrap();

        let lc = LinkControl::group_voice(1234567, 9000);
        let ldu1 = VoiceSuperFrame::new().pack_ldu1(&lc, 900);
        let mut datagram = vec![NET_FUNC_PROTOCOL, NET_PROTOCOL_SUBFUNC_P25];
        datagram.extend_from_slice(&900u32.to_be_bytes());
        datagram.extend_from_slice(&5555u32.to_be_bytes());
        datagram.extend_from_slice(&3u16.to_be_bytes());
        datagram.extend_from_slice(&ldu1);
        master.send_to(&datagram, peer_addr).await.unwrap();

        let event = events.recv().await.unwrap();
        match event {
            PeerEvent::P25Data(data) => {
                assert_eq!(data.duid, P25_DUID_LDU1);
                assert_eq!(data.peer_id, 900);
                assert_eq!(data.stream_id, 5555);
                assert_eq!(data.src_id, 1234567);
                assert_eq!(data.dst_id, 9000);
                assert_eq!(data.data.as_ref(), ldu1.as_slice());
            }
            other => panic!("expected p25 data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pkt_seq_reset() {
        let master = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (peer, _events) =
            UdpFnePeer::connect(master.local_addr().unwrap(), 1, NET_PROTOCOL_SUBFUNC_P25)
                .await
                .unwrap();

        assert_eq!(peer.pkt_seq(true), 0);
        assert_eq!(peer.pkt_seq(false), 1);
        assert_eq!(peer.pkt_seq(false), 2);
        assert_eq!(peer.pkt_seq(true), 0);
    }

    #[test]
    fn test_parse_envelope_rejects_garbage() {
        assert!(parse_envelope(&[]).is_none());
        assert!(parse_envelope(&[0xff; 32]).is_none());
        assert!(parse_envelope(&[NET_FUNC_PROTOCOL, 0x55, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]).is_none());
    }

    #[test]
    fn test_parse_envelope_dmr_burst() {
        use zellolink_dfsi_core::dmr::{DmrCallInfo, DmrSuperFrame, DMR_DT_VOICE, DMR_SLOT2};

        let burst = DmrSuperFrame::new().pack_voice(&DmrCallInfo {
            frame_type: DMR_DT_VOICE,
            slot: DMR_SLOT2,
            dst_id: 9000,
            src_id: 1234567,
            peer_id: 5,
            burst: 3,
            flags: 0,
        });
        let mut datagram = vec![NET_FUNC_PROTOCOL, NET_PROTOCOL_SUBFUNC_DMR];
        datagram.extend_from_slice(&5u32.to_be_bytes());
        datagram.extend_from_slice(&777u32.to_be_bytes());
        datagram.extend_from_slice(&1u16.to_be_bytes());
        datagram.extend_from_slice(&burst);

        let data = parse_envelope(&datagram).unwrap();
        assert_eq!(data.duid, DMR_DT_VOICE);
        // The TDMA slot rides in the call type field.
        assert_eq!(data.call_type, DMR_SLOT2);
        assert_eq!(data.dst_id, 9000);
        assert_eq!(data.src_id, 1234567);
        assert_eq!(data.stream_id, 777);
    }

    #[test]
    fn test_parse_envelope_tdu() {
        let tdu = pack_tdu(10, 20, 1, true);
        let mut datagram = vec![NET_FUNC_PROTOCOL, NET_PROTOCOL_SUBFUNC_P25];
        datagram.extend_from_slice(&1u32.to_be_bytes());
        datagram.extend_from_slice(&2u32.to_be_bytes());
        datagram.extend_from_slice(&0u16.to_be_bytes());
        datagram.extend_from_slice(&tdu);

        let data = parse_envelope(&datagram).unwrap();
        assert_eq!(data.duid, P25_DUID_TDU);
        assert_eq!(data.dst_id, 20);
        assert_eq!(data.src_id, 10);
    }
}
