//! Batching of assembled frames.

use std::mem;
use std::num::NonZeroUsize;

use blerec_reassembly::AssembledFrame;
use tracing::debug;

use crate::config::DEFAULT_BATCH_THRESHOLD;

/// A group of consecutive frames, in receipt order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBatch {
    /// Position of this batch in the session, starting at 0.
    pub seq: u64,
    /// The frames.
    pub frames: Vec<AssembledFrame>,
}

impl FrameBatch {
    /// Returns the number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the batch holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the total size of the frames in bytes.
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(AssembledFrame::len).sum()
    }
}

/// Collects frames until a threshold is reached.
///
/// The batch is handed out by the [`push`](Self::push) that reaches the
/// threshold. Leftover frames must be taken with [`flush`](Self::flush) at
/// the end of the stream.
#[derive(Debug)]
pub struct FrameBatcher {
    threshold: NonZeroUsize,
    frames: Vec<AssembledFrame>,
    next_seq: u64,
}

impl Default for FrameBatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl FrameBatcher {
    /// Frames per batch unless configured otherwise.
    pub const DEFAULT_THRESHOLD: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BATCH_THRESHOLD) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    };

    /// Creates a batcher emitting every `threshold` frames.
    pub fn new(threshold: NonZeroUsize) -> Self {
        Self {
            threshold,
            frames: Vec::with_capacity(threshold.get()),
            next_seq: 0,
        }
    }

    /// Returns the batch size.
    pub fn threshold(&self) -> NonZeroUsize {
        self.threshold
    }

    /// Returns the number of frames held.
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of batches handed out.
    pub fn batches(&self) -> u64 {
        self.next_seq
    }

    /// Adds a frame; returns a batch once the threshold is reached.
    pub fn push(&mut self, frame: AssembledFrame) -> Option<FrameBatch> {
        self.frames.push(frame);
        if self.frames.len() >= self.threshold.get() {
            return Some(self.take());
        }
        None
    }

    /// Returns the frames held, if any.
    pub fn flush(&mut self) -> Option<FrameBatch> {
        if self.frames.is_empty() {
            return None;
        }
        Some(self.take())
    }

    fn take(&mut self) -> FrameBatch {
        let frames = mem::replace(&mut self.frames, Vec::with_capacity(self.threshold.get()));
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!("batch {} ready with {} frames", seq, frames.len());
        FrameBatch { seq, frames }
    }
}
