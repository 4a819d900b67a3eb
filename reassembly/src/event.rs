//! Outputs of the reassembler.

use crate::error::ReassemblyError;

/// One complete encoded audio frame, in receipt order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledFrame(Vec<u8>);

impl AssembledFrame {
    /// Creates a frame from its bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Returns the frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the frame is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the frame and returns its bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for AssembledFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for AssembledFrame {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for AssembledFrame {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

/// Sequencing broke; the frame in flight is gone.
///
/// Carries no recovery data. `discarded_bytes` only says how much of the
/// partial frame was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LossEvent {
    /// Either [`ReassemblyError::SequenceLoss`] or
    /// [`ReassemblyError::FragmentLoss`].
    pub cause: ReassemblyError,
    /// Size of the partial frame dropped on resynchronization.
    pub discarded_bytes: usize,
}

/// Observable result of submitting one packet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub enum Event {
    /// State advanced (or the packet was dropped); nothing to hand out.
    #[default]
    None,
    /// The previous frame is complete.
    FrameReady(AssembledFrame),
    /// Loss detected; the reassembler waits for the next frame start.
    LossDetected(LossEvent),
}

impl Event {
    /// Returns true if the packet produced no output.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the completed frame, if any.
    pub fn into_frame(self) -> Option<AssembledFrame> {
        match self {
            Self::FrameReady(frame) => Some(frame),
            _ => None,
        }
    }

    /// Returns the loss notice, if any.
    pub fn loss(&self) -> Option<&LossEvent> {
        match self {
            Self::LossDetected(loss) => Some(loss),
            _ => None,
        }
    }
}
