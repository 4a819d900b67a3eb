//! Reassembly counters.

use serde::{Deserialize, Serialize};

/// Running counters of a [`PacketReassembler`](crate::PacketReassembler).
///
/// Every submitted notification lands in `packets`; dropped input is counted
/// here rather than reported as an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassemblyStats {
    /// Notifications submitted, malformed ones included.
    pub packets: u64,
    /// Notifications shorter than the minimum packet length.
    pub malformed: u64,
    /// Continuation fragments dropped while unsynchronized.
    pub premature: u64,
    /// Losses detected from a sequence number gap.
    pub sequence_losses: u64,
    /// Losses detected from a fragment counter gap.
    pub fragment_losses: u64,
    /// Frames handed out, including one flushed by `finish`.
    pub frames: u64,
    /// Total bytes of the frames handed out.
    pub frame_bytes: u64,
    /// Partial frame bytes thrown away on loss.
    pub discarded_bytes: u64,
}

impl ReassemblyStats {
    /// Returns the number of loss events.
    pub fn losses(&self) -> u64 {
        self.sequence_losses + self.fragment_losses
    }

    /// Returns the number of packets dropped without reaching a frame.
    pub fn dropped(&self) -> u64 {
        self.malformed + self.premature
    }
}
