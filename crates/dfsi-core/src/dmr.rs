//! DMR voice burst pack and unpack.
//!
//! The DMR leg mirrors the LDU layout at burst granularity: a 20-byte
//! message header followed by a data segment of three marked sub-frames,
//! each carrying one 11-byte AMBE codeword:
//!
//! ```text
//! header  FT, slot, dst(3 BE), src(3 BE), peer(4 BE), burst, flags,
//!         reserved(5), length
//! data    [FT1, AMBE, pad] [FT2, AMBE, pad] [FT3, AMBE, pad]
//! ```
//!
//! Six bursts make one superframe; the burst index wraps 0..5. Voice LC
//! headers and terminators are header-only frames sharing the same
//! layout, with call flags carrying the grant-demand and privacy bits.

use bytes::{BufMut, BytesMut};

use crate::error::{DfsiError, Result};

/// TDMA slot numbers.
pub const DMR_SLOT1: u8 = 1;
pub const DMR_SLOT2: u8 = 2;

/// Frame type: voice LC header opening a call.
pub const DMR_DT_VOICE_HEADER: u8 = 0x41;
/// Frame type: voice burst with three AMBE codewords.
pub const DMR_DT_VOICE: u8 = 0x43;
/// Frame type: terminator with LC closing a call.
pub const DMR_DT_TERMINATOR: u8 = 0x45;

/// Call flag requesting a channel grant before voice flows.
pub const DMR_FLAG_GRANT_DEMAND: u8 = 0x80;
/// Call flag marking privacy (encrypted) voice.
pub const DMR_FLAG_PRIVACY: u8 = 0x40;

/// DMR message header length preceding the data segment.
pub const DMR_HEADER_LEN: usize = 20;
/// AMBE codewords per voice burst.
pub const DMR_CODEWORDS_PER_BURST: usize = 3;
/// Offsets of the sub-frame markers inside the data segment.
pub const DMR_MARKER_OFFSETS: [usize; 3] = [0, 13, 26];
/// Sub-frame markers, one per codeword position.
pub const DMR_VOICE_FRAME_TYPES: [u8; 3] = [0x74, 0x75, 0x76];
/// Data segment length: three 13-byte sub-frames.
pub const DMR_DATA_LEN: usize = 39;
/// Voice burst payload length on the wire.
pub const DMR_VOICE_PAYLOAD_LEN: usize = DMR_HEADER_LEN + DMR_DATA_LEN;
/// Header-only payload length (voice header, terminator).
pub const DMR_CONTROL_PAYLOAD_LEN: usize = DMR_HEADER_LEN;
/// Bursts per superframe before the index wraps.
pub const DMR_BURSTS_PER_SUPERFRAME: u8 = 6;

/// Bytes per AMBE codeword on this interface.
const CODEWORD_LEN: usize = crate::consts::IMBE_CODEWORD_LEN;

/// Call addressing carried by every DMR frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmrCallInfo {
    pub frame_type: u8,
    pub slot: u8,
    pub dst_id: u32,
    pub src_id: u32,
    pub peer_id: u32,
    /// Superframe burst index, 0..5.
    pub burst: u8,
    pub flags: u8,
}

/// Three-codeword scratch buffer for one voice burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmrSuperFrame {
    scratch: [u8; DMR_DATA_LEN],
}

impl DmrSuperFrame {
    pub fn new() -> Self {
        Self { scratch: [0; DMR_DATA_LEN] }
    }

    /// Store a codeword at burst position `index` (0..3).
    pub fn set_codeword(&mut self, index: usize, codeword: &[u8]) -> Result<()> {
        if index >= DMR_CODEWORDS_PER_BURST {
            return Err(DfsiError::InvalidPacket(format!("burst index {} out of range", index)));
        }
        if codeword.len() != CODEWORD_LEN {
            return Err(DfsiError::BufferTooSmall {
                required: CODEWORD_LEN,
                available: codeword.len(),
            });
        }
        let off = DMR_MARKER_OFFSETS[index] + 1;
        self.scratch[off..off + CODEWORD_LEN].copy_from_slice(codeword);
        Ok(())
    }

    /// Codeword at burst position `index` (0..3).
    pub fn codeword(&self, index: usize) -> &[u8] {
        let off = DMR_MARKER_OFFSETS[index] + 1;
        &self.scratch[off..off + CODEWORD_LEN]
    }

    /// Pack the three codewords into a voice burst payload.
    pub fn pack_voice(&self, call: &DmrCallInfo) -> Vec<u8> {
        let mut data = [0u8; DMR_DATA_LEN];
        data.copy_from_slice(&self.scratch);
        for (&off, &ft) in DMR_MARKER_OFFSETS.iter().zip(DMR_VOICE_FRAME_TYPES.iter()) {
            data[off] = ft;
        }
        build_frame(DMR_DT_VOICE, call, Some(&data))
    }

    /// Unpack a voice burst, verifying every sub-frame marker.
    pub fn unpack_voice(payload: &[u8]) -> Result<(Self, DmrCallInfo)> {
        if payload.len() < DMR_VOICE_PAYLOAD_LEN {
            return Err(DfsiError::BufferTooSmall {
                required: DMR_VOICE_PAYLOAD_LEN,
                available: payload.len(),
            });
        }
        if payload[0] != DMR_DT_VOICE {
            return Err(DfsiError::InvalidPacket(format!(
                "unexpected dmr frame type {:#04x}",
                payload[0]
            )));
        }
        let data = &payload[DMR_HEADER_LEN..];
        for (&off, &ft) in DMR_MARKER_OFFSETS.iter().zip(DMR_VOICE_FRAME_TYPES.iter()) {
            if data[off] != ft {
                return Err(DfsiError::FrameTypeMismatch { offset: off, expected: ft, actual: data[off] });
            }
        }

        let mut frame = Self::new();
        frame.scratch.copy_from_slice(&data[..DMR_DATA_LEN]);
        let info = call_info(payload)
            .ok_or_else(|| DfsiError::InvalidPacket("short dmr header".to_string()))?;
        Ok((frame, info))
    }
}

impl Default for DmrSuperFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Pack a voice LC header opening a call on `slot`.
pub fn pack_voice_header(call: &DmrCallInfo) -> Vec<u8> {
    build_frame(DMR_DT_VOICE_HEADER, call, None)
}

/// Pack a terminator closing the call on `slot`.
pub fn pack_terminator(call: &DmrCallInfo) -> Vec<u8> {
    build_frame(DMR_DT_TERMINATOR, call, None)
}

/// Read the call header of any DMR frame.
pub fn call_info(payload: &[u8]) -> Option<DmrCallInfo> {
    if payload.len() < DMR_HEADER_LEN {
        return None;
    }
    Some(DmrCallInfo {
        frame_type: payload[0],
        slot: payload[1],
        dst_id: ((payload[2] as u32) << 16) | ((payload[3] as u32) << 8) | payload[4] as u32,
        src_id: ((payload[5] as u32) << 16) | ((payload[6] as u32) << 8) | payload[7] as u32,
        peer_id: u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]),
        burst: payload[12],
        flags: payload[13],
    })
}

/// True when the frame type is one of the DMR voice-path frames.
pub fn is_dmr_frame_type(frame_type: u8) -> bool {
    matches!(frame_type, DMR_DT_VOICE_HEADER | DMR_DT_VOICE | DMR_DT_TERMINATOR)
}

fn build_frame(frame_type: u8, call: &DmrCallInfo, data: Option<&[u8]>) -> Vec<u8> {
    let total = DMR_HEADER_LEN + data.map(|d| d.len()).unwrap_or(0);
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(frame_type);
    buf.put_u8(call.slot);
    buf.put_u8((call.dst_id >> 16) as u8);
    buf.put_u8((call.dst_id >> 8) as u8);
    buf.put_u8(call.dst_id as u8);
    buf.put_u8((call.src_id >> 16) as u8);
    buf.put_u8((call.src_id >> 8) as u8);
    buf.put_u8(call.src_id as u8);
    buf.put_u32(call.peer_id);
    buf.put_u8(call.burst % DMR_BURSTS_PER_SUPERFRAME);
    buf.put_u8(call.flags);
    buf.put_slice(&[0u8; 5]);
    buf.put_u8(total as u8);
    if let Some(data) = data {
        buf.put_slice(data);
    }
    debug_assert_eq!(buf.len(), total);
    buf.to_vec()
}
