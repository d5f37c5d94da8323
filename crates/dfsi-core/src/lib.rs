//! P25 DFSI voice framing for the ZelloLink gateway.
//!
//! This crate owns the wire formats of the radio leg: the LDU1/LDU2 voice
//! super-frames exchanged with the FNE master, the TSBK control blocks
//! used for call alerts, and the [`FnePeer`] trait through which the
//! gateway hands framed payloads to the externally provided FNE transport.
//!
//! A P25 voice super-frame carries nine 11-byte IMBE codewords at fixed
//! offsets inside a 225-byte scratch buffer, interleaved with link
//! control (LDU1) or encryption sync (LDU2) fields. The DMR analogue
//! carries three AMBE codewords per marked voice burst. Pack and unpack
//! are exact inverses over the voice bytes; that property is
//! load-bearing for the bridge and tested here.

pub mod consts;
pub mod dmr;
pub mod error;
pub mod ldu;
pub mod peer;
pub mod tsbk;

pub use consts::*;
pub use dmr::{DmrCallInfo, DmrSuperFrame};
pub use error::{DfsiError, Result};
pub use ldu::{EncryptionSync, LinkControl, VoiceSuperFrame};
pub use peer::{FnePeer, P25Data, PeerEvent};
pub use tsbk::Tsbk;
