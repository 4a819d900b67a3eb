//! Error taxonomy for packet reassembly.

use thiserror::Error;

use crate::packet::{MAX_PACKETS_PER_FRAME, MIN_PACKET_LEN};

/// Conditions detected while parsing, reassembling or producing packets.
///
/// None of these is fatal. [`PacketReassembler::submit`] never returns them:
/// losses travel inside a [`LossEvent`], the rest is counted in
/// [`ReassemblyStats`] and the packet is dropped.
///
/// [`PacketReassembler::submit`]: crate::PacketReassembler::submit
/// [`LossEvent`]: crate::LossEvent
/// [`ReassemblyStats`]: crate::ReassemblyStats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ReassemblyError {
    /// Notification too short to hold a header and payload.
    #[error("reassembly: malformed packet of {len} bytes (need at least {min})", min = MIN_PACKET_LEN)]
    MalformedPacket { len: usize },

    /// Sequence number did not follow the previous packet.
    #[error("reassembly: sequence loss, expected {expected} got {actual}")]
    SequenceLoss { expected: u16, actual: u16 },

    /// Sequence number was contiguous but the fragment counter skipped.
    #[error("reassembly: fragment loss, expected {expected} got {actual}")]
    FragmentLoss { expected: u8, actual: u8 },

    /// Continuation fragment seen while waiting for a frame start.
    #[error("reassembly: fragment {fragment_counter} before any frame start")]
    PrematureFragment { fragment_counter: u8 },

    /// Frame cannot be packetized without the fragment counter wrapping
    /// into the frame-start marker.
    #[error(
        "reassembly: frame of {len} bytes needs {packets} packets (limit {max})",
        max = MAX_PACKETS_PER_FRAME
    )]
    FrameTooLarge { len: usize, packets: usize },

    /// Empty frames have no wire representation.
    #[error("reassembly: empty frame")]
    EmptyFrame,
}

impl ReassemblyError {
    /// Returns true for the conditions that break synchronization.
    pub fn is_loss(&self) -> bool {
        matches!(self, Self::SequenceLoss { .. } | Self::FragmentLoss { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ReassemblyError::MalformedPacket { len: 2 };
        assert_eq!(
            err.to_string(),
            "reassembly: malformed packet of 2 bytes (need at least 4)"
        );

        let err = ReassemblyError::SequenceLoss {
            expected: 1,
            actual: 5,
        };
        assert_eq!(err.to_string(), "reassembly: sequence loss, expected 1 got 5");
    }

    #[test]
    fn test_is_loss() {
        assert!(ReassemblyError::SequenceLoss { expected: 1, actual: 2 }.is_loss());
        assert!(ReassemblyError::FragmentLoss { expected: 1, actual: 3 }.is_loss());
        assert!(!ReassemblyError::MalformedPacket { len: 0 }.is_loss());
        assert!(!ReassemblyError::PrematureFragment { fragment_counter: 4 }.is_loss());
    }
}
