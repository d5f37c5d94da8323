//! LDU1/LDU2 voice super-frame pack and unpack.
//!
//! The wire form of an LDU is a 24-byte message header followed by a
//! 160-byte data segment holding nine DFSI voice frames and a short
//! trailer. Each voice frame starts with its frame-type marker and embeds
//! one 11-byte IMBE codeword after its control bytes:
//!
//! ```text
//! V1  FT, 9 reserved/RSSI bytes, IMBE          V6..V8  FT, 4 parity, IMBE
//! V2  FT, IMBE                                 V9      FT, LSD(2), pad, IMBE
//! V3  FT, LCO MFID SVCOPT, pad, IMBE
//! V4  FT, TGID(3 BE), pad, IMBE
//! V5  FT, SRC(3 BE), pad, IMBE
//! ```
//!
//! LDU2 reuses the same geometry with markers 0x6B..0x73, the MI spread
//! across V12-V14 and the algorithm/key IDs in V15. The trailer carries a
//! header-valid hint and algorithm ID so a receiver can reject encrypted
//! traffic without unpacking the frame.

use bytes::{BufMut, BytesMut};

use crate::consts::*;
use crate::error::{DfsiError, Result};

/// Per-frame offset of the IMBE codeword relative to its marker.
const IMBE_FRAME_OFFSETS: [usize; 9] = [10, 1, 5, 5, 5, 5, 5, 5, 4];

/// Link Control fields carried by an LDU1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkControl {
    pub lco: u8,
    pub mfid: u8,
    pub service_options: u8,
    pub dst_id: u32,
    pub src_id: u32,
    pub lsd: [u8; 2],
}

impl LinkControl {
    /// Link control for a clear group voice call.
    pub fn group_voice(src_id: u32, dst_id: u32) -> Self {
        Self {
            lco: P25_LCO_GROUP,
            mfid: P25_MFID_STANDARD,
            service_options: 0,
            dst_id,
            src_id,
            lsd: [0; 2],
        }
    }
}

/// Encryption Sync fields carried by an LDU2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionSync {
    pub mi: [u8; 9],
    pub alg_id: u8,
    pub key_id: u16,
    pub lsd: [u8; 2],
}

impl EncryptionSync {
    /// Encryption sync for clear voice.
    pub fn clear() -> Self {
        Self { mi: [0; 9], alg_id: P25_ALGO_UNENCRYPT, key_id: 0, lsd: [0; 2] }
    }
}

impl Default for EncryptionSync {
    fn default() -> Self {
        Self::clear()
    }
}

/// Nine-codeword scratch buffer for one voice super-frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSuperFrame {
    scratch: [u8; LDU_SCRATCH_LEN],
}

impl VoiceSuperFrame {
    pub fn new() -> Self {
        Self { scratch: [0; LDU_SCRATCH_LEN] }
    }

    /// Store a codeword at voice position `index` (0..9).
    pub fn set_codeword(&mut self, index: usize, codeword: &[u8]) -> Result<()> {
        if index >= CODEWORDS_PER_LDU {
            return Err(DfsiError::InvalidPacket(format!("voice index {} out of range", index)));
        }
        if codeword.len() != IMBE_CODEWORD_LEN {
            return Err(DfsiError::BufferTooSmall {
                required: IMBE_CODEWORD_LEN,
                available: codeword.len(),
            });
        }
        let off = VOICE_OFFSETS[index];
        self.scratch[off..off + IMBE_CODEWORD_LEN].copy_from_slice(codeword);
        Ok(())
    }

    /// Codeword at voice position `index` (0..9).
    pub fn codeword(&self, index: usize) -> &[u8] {
        let off = VOICE_OFFSETS[index];
        &self.scratch[off..off + IMBE_CODEWORD_LEN]
    }

    /// Pack voice 1-9 plus link control into an LDU1 payload.
    pub fn pack_ldu1(&self, lc: &LinkControl, peer_id: u32) -> Vec<u8> {
        let mut data = [0u8; LDU_DATA_LEN];
        self.write_voice_frames(&mut data, &LDU1_FRAME_TYPES);

        // V3: link control word.
        data[FRAME_MARKER_OFFSETS[2] + 1] = lc.lco;
        data[FRAME_MARKER_OFFSETS[2] + 2] = lc.mfid;
        data[FRAME_MARKER_OFFSETS[2] + 3] = lc.service_options;
        // V4: destination talkgroup.
        put_u24(&mut data[FRAME_MARKER_OFFSETS[3] + 1..], lc.dst_id);
        // V5: source RID.
        put_u24(&mut data[FRAME_MARKER_OFFSETS[4] + 1..], lc.src_id);
        // V9: low-speed data.
        data[FRAME_MARKER_OFFSETS[8] + 1] = lc.lsd[0];
        data[FRAME_MARKER_OFFSETS[8] + 2] = lc.lsd[1];

        // Trailer hint: clear voice.
        data[LDU_TRAILER_FT_OFFSET] = P25_FT_HDU_VALID;
        data[LDU_TRAILER_ALGID_OFFSET] = P25_ALGO_UNENCRYPT;

        build_payload(P25_DUID_LDU1, lc.lco, lc.dst_id, lc.src_id, peer_id, &data)
    }

    /// Pack voice 10-18 plus encryption sync into an LDU2 payload.
    pub fn pack_ldu2(&self, es: &EncryptionSync, src_id: u32, dst_id: u32, peer_id: u32) -> Vec<u8> {
        let mut data = [0u8; LDU_DATA_LEN];
        self.write_voice_frames(&mut data, &LDU2_FRAME_TYPES);

        // V12-V14: message indicator, three bytes per frame.
        for (chunk, &base) in es.mi.chunks(3).zip(&FRAME_MARKER_OFFSETS[2..5]) {
            data[base + 1..base + 1 + chunk.len()].copy_from_slice(chunk);
        }
        // V15: algorithm and key IDs.
        data[LDU2_ALGID_OFFSET] = es.alg_id;
        data[LDU2_ALGID_OFFSET + 1] = (es.key_id >> 8) as u8;
        data[LDU2_ALGID_OFFSET + 2] = es.key_id as u8;
        // V18: low-speed data.
        data[FRAME_MARKER_OFFSETS[8] + 1] = es.lsd[0];
        data[FRAME_MARKER_OFFSETS[8] + 2] = es.lsd[1];

        data[LDU_TRAILER_FT_OFFSET] = P25_FT_HDU_VALID;
        data[LDU_TRAILER_ALGID_OFFSET] = es.alg_id;

        build_payload(P25_DUID_LDU2, P25_LCO_GROUP, dst_id, src_id, peer_id, &data)
    }

    /// Unpack an LDU1 payload, verifying every frame-type marker.
    pub fn unpack_ldu1(payload: &[u8]) -> Result<(Self, LinkControl)> {
        let data = check_payload(payload, P25_DUID_LDU1, &LDU1_FRAME_TYPES)?;
        let frame = Self::read_voice_frames(data);

        let lc = LinkControl {
            lco: data[FRAME_MARKER_OFFSETS[2] + 1],
            mfid: data[FRAME_MARKER_OFFSETS[2] + 2],
            service_options: data[FRAME_MARKER_OFFSETS[2] + 3],
            dst_id: get_u24(&data[FRAME_MARKER_OFFSETS[3] + 1..]),
            src_id: get_u24(&data[FRAME_MARKER_OFFSETS[4] + 1..]),
            lsd: [data[FRAME_MARKER_OFFSETS[8] + 1], data[FRAME_MARKER_OFFSETS[8] + 2]],
        };
        Ok((frame, lc))
    }

    /// Unpack an LDU2 payload, verifying every frame-type marker.
    pub fn unpack_ldu2(payload: &[u8]) -> Result<(Self, EncryptionSync)> {
        let data = check_payload(payload, P25_DUID_LDU2, &LDU2_FRAME_TYPES)?;
        let frame = Self::read_voice_frames(data);

        let mut mi = [0u8; 9];
        for (chunk, &base) in mi.chunks_mut(3).zip(&FRAME_MARKER_OFFSETS[2..5]) {
            chunk.copy_from_slice(&data[base + 1..base + 4]);
        }
        let es = EncryptionSync {
            mi,
            alg_id: data[LDU2_ALGID_OFFSET],
            key_id: ((data[LDU2_ALGID_OFFSET + 1] as u16) << 8) | data[LDU2_ALGID_OFFSET + 2] as u16,
            lsd: [data[FRAME_MARKER_OFFSETS[8] + 1], data[FRAME_MARKER_OFFSETS[8] + 2]],
        };
        Ok((frame, es))
    }

    fn write_voice_frames(&self, data: &mut [u8; LDU_DATA_LEN], frame_types: &[u8; 9]) {
        for i in 0..CODEWORDS_PER_LDU {
            let base = FRAME_MARKER_OFFSETS[i];
            data[base] = frame_types[i];
            let imbe = base + IMBE_FRAME_OFFSETS[i];
            data[imbe..imbe + IMBE_CODEWORD_LEN].copy_from_slice(self.codeword(i));
        }
    }

    fn read_voice_frames(data: &[u8]) -> Self {
        let mut frame = Self::new();
        for i in 0..CODEWORDS_PER_LDU {
            let imbe = FRAME_MARKER_OFFSETS[i] + IMBE_FRAME_OFFSETS[i];
            let off = VOICE_OFFSETS[i];
            frame.scratch[off..off + IMBE_CODEWORD_LEN]
                .copy_from_slice(&data[imbe..imbe + IMBE_CODEWORD_LEN]);
        }
        frame
    }
}

impl Default for VoiceSuperFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the frame-type markers of an LDU payload without unpacking it.
pub fn has_valid_markers(payload: &[u8], frame_types: &[u8; 9]) -> bool {
    if payload.len() < LDU_PAYLOAD_LEN {
        return false;
    }
    let data = &payload[LDU_HEADER_LEN..];
    FRAME_MARKER_OFFSETS
        .iter()
        .zip(frame_types.iter())
        .all(|(&off, &ft)| data[off] == ft)
}

/// Algorithm ID from an LDU1 trailer, present when the header word was
/// valid at the sender.
pub fn ldu1_algorithm_hint(payload: &[u8]) -> Option<u8> {
    if payload.len() < LDU_PAYLOAD_LEN {
        return None;
    }
    let data = &payload[LDU_HEADER_LEN..];
    if data[LDU_TRAILER_FT_OFFSET] == P25_FT_HDU_VALID {
        Some(data[LDU_TRAILER_ALGID_OFFSET])
    } else {
        None
    }
}

/// Algorithm ID from LDU2 voice frame V15.
pub fn ldu2_algorithm_id(payload: &[u8]) -> Option<u8> {
    if payload.len() < LDU_PAYLOAD_LEN {
        return None;
    }
    Some(payload[LDU_HEADER_LEN + LDU2_ALGID_OFFSET])
}

/// Pack a terminator payload, optionally demanding a channel grant.
pub fn pack_tdu(src_id: u32, dst_id: u32, peer_id: u32, grant_demand: bool) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(TDU_PAYLOAD_LEN);
    buf.put_u8(P25_DUID_TDU);
    buf.put_u8(P25_LCO_GROUP);
    put_u24_buf(&mut buf, dst_id);
    put_u24_buf(&mut buf, src_id);
    buf.put_u32(peer_id);
    buf.put_u32(0);
    buf.put_u8(0); // frame count
    buf.put_u8(if grant_demand { TDU_FLAG_GRANT_DEMAND } else { 0 });
    buf.put_slice(&[0u8; 5]);
    buf.put_u8(TDU_PAYLOAD_LEN as u8);
    debug_assert_eq!(buf.len(), TDU_PAYLOAD_LEN);
    buf.to_vec()
}

/// True when a TDU payload carries the grant-demand flag.
pub fn tdu_grant_demand(payload: &[u8]) -> bool {
    payload.len() >= TDU_PAYLOAD_LEN
        && payload[0] == P25_DUID_TDU
        && payload[17] & TDU_FLAG_GRANT_DEMAND != 0
}

fn build_payload(duid: u8, lco: u8, dst_id: u32, src_id: u32, peer_id: u32, data: &[u8]) -> Vec<u8> {
    let total = LDU_HEADER_LEN + data.len();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(duid);
    buf.put_u8(lco);
    put_u24_buf(&mut buf, dst_id);
    put_u24_buf(&mut buf, src_id);
    buf.put_u32(peer_id);
    buf.put_u32(0);
    buf.put_u8(CODEWORDS_PER_LDU as u8);
    buf.put_slice(&[0u8; 6]);
    buf.put_u8(total as u8);
    buf.put_slice(data);
    debug_assert_eq!(buf.len(), total);
    buf.to_vec()
}

fn check_payload<'a>(payload: &'a [u8], duid: u8, frame_types: &[u8; 9]) -> Result<&'a [u8]> {
    if payload.len() < LDU_PAYLOAD_LEN {
        return Err(DfsiError::BufferTooSmall {
            required: LDU_PAYLOAD_LEN,
            available: payload.len(),
        });
    }
    if payload[0] != duid {
        return Err(DfsiError::InvalidPacket(format!(
            "unexpected duid {:#04x}, wanted {:#04x}",
            payload[0], duid
        )));
    }
    let data = &payload[LDU_HEADER_LEN..];
    for (&off, &ft) in FRAME_MARKER_OFFSETS.iter().zip(frame_types.iter()) {
        if data[off] != ft {
            return Err(DfsiError::FrameTypeMismatch { offset: off, expected: ft, actual: data[off] });
        }
    }
    Ok(data)
}

/// Destination and source IDs from an LDU or TDU message header.
pub fn header_ids(payload: &[u8]) -> Option<(u32, u32)> {
    if payload.len() < LDU_HEADER_LEN {
        return None;
    }
    Some((get_u24(&payload[2..]), get_u24(&payload[5..])))
}

fn put_u24(buf: &mut [u8], value: u32) {
    buf[0] = (value >> 16) as u8;
    buf[1] = (value >> 8) as u8;
    buf[2] = value as u8;
}

fn put_u24_buf(buf: &mut BytesMut, value: u32) {
    buf.put_u8((value >> 16) as u8);
    buf.put_u8((value >> 8) as u8);
    buf.put_u8(value as u8);
}

fn get_u24(buf: &[u8]) -> u32 {
    ((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | buf[2] as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codewords() -> Vec<[u8; IMBE_CODEWORD_LEN]> {
        (0..9u8)
            .map(|i| {
                let mut cw = [0u8; IMBE_CODEWORD_LEN];
                for (j, b) in cw.iter_mut().enumerate() {
                    *b = i.wrapping_mul(17).wrapping_add(j as u8);
                }
                cw
            })
            .collect()
    }

    fn filled_frame() -> VoiceSuperFrame {
        let mut frame = VoiceSuperFrame::new();
        for (i, cw) in test_codewords().iter().enumerate() {
            frame.set_codeword(i, cw).unwrap();
        }
        frame
    }

    #[test]
    fn test_ldu1_roundtrip() {
        let frame = filled_frame();
        let lc = LinkControl::group_voice(1234567, 9000);
        let payload = frame.pack_ldu1(&lc, 42);

        assert_eq!(payload.len(), LDU_PAYLOAD_LEN);
        assert_eq!(payload[0], P25_DUID_LDU1);
        assert_eq!(payload[LDU_HEADER_LEN - 1], LDU_PAYLOAD_LEN as u8);

        let (unpacked, lc2) = VoiceSuperFrame::unpack_ldu1(&payload).unwrap();
        assert_eq!(lc2, lc);
        for (i, cw) in test_codewords().iter().enumerate() {
            assert_eq!(unpacked.codeword(i), cw.as_slice(), "codeword {}", i);
        }
    }

    #[test]
    fn test_ldu2_roundtrip() {
        let frame = filled_frame();
        let mut es = EncryptionSync::clear();
        es.mi = [9, 8, 7, 6, 5, 4, 3, 2, 1];
        es.key_id = 0x1234;
        let payload = frame.pack_ldu2(&es, 9000, 1234567, 42);

        let (unpacked, es2) = VoiceSuperFrame::unpack_ldu2(&payload).unwrap();
        assert_eq!(es2, es);
        for (i, cw) in test_codewords().iter().enumerate() {
            assert_eq!(unpacked.codeword(i), cw.as_slice(), "codeword {}", i);
        }
    }

    #[test]
    fn test_markers_at_documented_offsets() {
        let payload = filled_frame().pack_ldu1(&LinkControl::group_voice(1, 2), 1);
        let data = &payload[LDU_HEADER_LEN..];
        for (i, &off) in FRAME_MARKER_OFFSETS.iter().enumerate() {
            assert_eq!(data[off], LDU1_FRAME_TYPES[i], "marker {}", i);
        }
        assert!(has_valid_markers(&payload, &LDU1_FRAME_TYPES));
        assert!(!has_valid_markers(&payload, &LDU2_FRAME_TYPES));
    }

    #[test]
    fn test_marker_corruption_detected() {
        let mut payload = filled_frame().pack_ldu1(&LinkControl::group_voice(1, 2), 1);
        payload[LDU_HEADER_LEN + FRAME_MARKER_OFFSETS[4]] = 0x00;
        assert!(matches!(
            VoiceSuperFrame::unpack_ldu1(&payload),
            Err(DfsiError::FrameTypeMismatch { offset: 70, .. })
        ));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let payload = filled_frame().pack_ldu1(&LinkControl::group_voice(1, 2), 1);
        assert!(VoiceSuperFrame::unpack_ldu1(&payload[..100]).is_err());
    }

    #[test]
    fn test_ldu1_algorithm_hint() {
        let payload = filled_frame().pack_ldu1(&LinkControl::group_voice(1, 2), 1);
        assert_eq!(ldu1_algorithm_hint(&payload), Some(P25_ALGO_UNENCRYPT));

        let mut encrypted = payload.clone();
        encrypted[LDU_HEADER_LEN + LDU_TRAILER_ALGID_OFFSET] = 0x81;
        assert_eq!(ldu1_algorithm_hint(&encrypted), Some(0x81));

        let mut no_hint = payload;
        no_hint[LDU_HEADER_LEN + LDU_TRAILER_FT_OFFSET] = 0x00;
        assert_eq!(ldu1_algorithm_hint(&no_hint), None);
    }

    #[test]
    fn test_ldu2_algorithm_id_offset() {
        let mut es = EncryptionSync::clear();
        es.alg_id = 0x84;
        let payload = filled_frame().pack_ldu2(&es, 1, 2, 3);
        // The algorithm ID sits one past the V15 marker in the data segment.
        assert_eq!(payload[LDU_HEADER_LEN + 87], LDU2_FRAME_TYPES[5]);
        assert_eq!(payload[LDU_HEADER_LEN + 88], 0x84);
        assert_eq!(ldu2_algorithm_id(&payload), Some(0x84));
    }

    #[test]
    fn test_header_ids() {
        let lc = LinkControl::group_voice(654321, 4095);
        let payload = filled_frame().pack_ldu1(&lc, 7);
        assert_eq!(header_ids(&payload), Some((4095, 654321)));
    }

    #[test]
    fn test_tdu_grant_demand_flag() {
        let tdu = pack_tdu(100, 200, 7, true);
        assert_eq!(tdu.len(), TDU_PAYLOAD_LEN);
        assert_eq!(tdu[0], P25_DUID_TDU);
        assert!(tdu_grant_demand(&tdu));

        let plain = pack_tdu(100, 200, 7, false);
        assert!(!tdu_grant_demand(&plain));
    }
}
