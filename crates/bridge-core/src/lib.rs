//! The bidirectional call state machine of the ZelloLink gateway.
//!
//! [`CallBridge`] sits between the two legs. On ingress it turns 8 kHz
//! PCM from the Zello session into vocoded LDU super-frames for the FNE
//! master, detecting call boundaries from the audio itself. On egress it
//! unpacks LDUs into PCM for the Zello stream, opening and closing the
//! Zello stream at P25 call boundaries and refusing encrypted traffic.
//!
//! The two directions share no mutable state beyond the bridge itself;
//! each is driven by its own event stream and the host serializes access.

pub mod bridge;
pub mod error;
pub mod slots;
pub mod zello_sink;

pub use bridge::{BridgeConfig, CallBridge, TxMode};
pub use error::{BridgeError, Result};
pub use slots::{CallSlot, SlotIndex};
pub use zello_sink::ZelloAudioSink;
