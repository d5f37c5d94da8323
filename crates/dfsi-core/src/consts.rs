//! P25 constants shared across the radio leg.

/// Header Data Unit.
pub const P25_DUID_HDU: u8 = 0x00;
/// Terminator Data Unit.
pub const P25_DUID_TDU: u8 = 0x03;
/// Logical Data Unit 1 (voice 1-9 plus link control).
pub const P25_DUID_LDU1: u8 = 0x05;
/// Trunking Signaling Data Unit.
pub const P25_DUID_TSDU: u8 = 0x07;
/// Logical Data Unit 2 (voice 10-18 plus encryption sync).
pub const P25_DUID_LDU2: u8 = 0x0A;
/// Packet Data Unit.
pub const P25_DUID_PDU: u8 = 0x0C;
/// Terminator Data Unit with Link Control.
pub const P25_DUID_TDULC: u8 = 0x0F;

/// Link Control Opcode: group voice channel user.
pub const P25_LCO_GROUP: u8 = 0x00;
/// Link Control Opcode: unit-to-unit voice channel user.
pub const P25_LCO_PRIVATE: u8 = 0x03;
/// Link Control Opcode: call alert.
pub const P25_LCO_CALL_ALRT: u8 = 0x1F;

/// TSBK opcode for the ISP/OSP call alert pair.
pub const P25_TSBK_IOSP_CALL_ALRT: u8 = 0x1F;

/// Standard MFID.
pub const P25_MFID_STANDARD: u8 = 0x00;

/// Algorithm ID marking clear (unencrypted) voice.
pub const P25_ALGO_UNENCRYPT: u8 = 0x80;

/// Frame-type hint marking a valid header word in an LDU trailer.
pub const P25_FT_HDU_VALID: u8 = 0x01;

/// DFSI frame-type markers for LDU1 voice frames V1..V9.
pub const LDU1_FRAME_TYPES: [u8; 9] = [0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0x6A];
/// DFSI frame-type markers for LDU2 voice frames V10..V18.
pub const LDU2_FRAME_TYPES: [u8; 9] = [0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0x73];

/// Offsets of the nine IMBE codewords inside the 225-byte scratch buffer.
pub const VOICE_OFFSETS: [usize; 9] = [10, 26, 55, 80, 105, 130, 155, 180, 204];

/// Offsets of the nine frame-type markers inside an LDU data segment.
pub const FRAME_MARKER_OFFSETS: [usize; 9] = [0, 22, 36, 53, 70, 87, 104, 121, 138];

/// Scratch super-frame length: nine 25-byte rows.
pub const LDU_SCRATCH_LEN: usize = 225;
/// P25 message header length preceding the data segment.
pub const LDU_HEADER_LEN: usize = 24;
/// LDU data segment length: nine voice frames plus the trailer.
pub const LDU_DATA_LEN: usize = 160;
/// Total LDU payload length on the wire.
pub const LDU_PAYLOAD_LEN: usize = LDU_HEADER_LEN + LDU_DATA_LEN;

/// Data-segment offset of the frame-type hint in the LDU trailer.
pub const LDU_TRAILER_FT_OFFSET: usize = 156;
/// Data-segment offset of the algorithm ID in the LDU trailer.
pub const LDU_TRAILER_ALGID_OFFSET: usize = 157;
/// Data-segment offset of the algorithm ID inside LDU2 voice frame V15.
pub const LDU2_ALGID_OFFSET: usize = 88;

/// Bytes per IMBE codeword.
pub const IMBE_CODEWORD_LEN: usize = 11;

/// Number of voice codewords per LDU.
pub const CODEWORDS_PER_LDU: usize = 9;

/// TDU payload length (header only).
pub const TDU_PAYLOAD_LEN: usize = LDU_HEADER_LEN;
/// Header flag bit requesting a channel grant before voice flows.
pub const TDU_FLAG_GRANT_DEMAND: u8 = 0x80;
