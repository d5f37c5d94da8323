//! Per-direction call slot bookkeeping.

use std::time::Instant;

/// Receive slot index. DMR carries two TDMA slots; P25 uses a fixed
/// third slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotIndex {
    Dmr1 = 0,
    Dmr2 = 1,
    P25 = 2,
}

/// State of one inbound radio call.
#[derive(Debug, Clone)]
pub struct CallSlot {
    /// When the first voice frame of the call arrived.
    pub rx_start: Option<Instant>,
    /// FNE stream id of the call in progress.
    pub rx_stream_id: u32,
    /// Source RID of the call.
    pub rx_src: u32,
    /// Destination TGID of the call.
    pub rx_dst: u32,
    /// DUID of the most recent frame.
    pub rx_type: u8,
    /// Zello stream id opened for this call.
    pub tx_stream_id: u32,
    /// Frames seen within the current stream.
    pub rx_seq: u32,
    /// A Zello stream is open for this call.
    pub call_in_progress: bool,
    /// Encrypted traffic seen; drop frames until the next header.
    pub ignore_call: bool,
    /// Algorithm ID that triggered the ignore.
    pub algo_id: u8,
}

impl CallSlot {
    pub fn new() -> Self {
        Self {
            rx_start: None,
            rx_stream_id: 0,
            rx_src: 0,
            rx_dst: 0,
            rx_type: 0,
            tx_stream_id: 0,
            rx_seq: 0,
            call_in_progress: false,
            ignore_call: false,
            algo_id: 0,
        }
    }

    /// Return the slot to idle between calls.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Seconds since the call started.
    pub fn duration_secs(&self) -> f64 {
        self.rx_start.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
    }
}

impl Default for CallSlot {
    fn default() -> Self {
        Self::new()
    }
}
