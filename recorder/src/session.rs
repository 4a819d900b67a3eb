//! One recording session: reassembly, batching and storage.

use blerec_reassembly::{Event, PacketReassembler, ReassemblyStats};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::FrameBatcher;
use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::sink::FrameSink;

/// Outcome of a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Reassembly counters.
    pub stats: ReassemblyStats,
    /// Batches handed to the sink.
    pub batches: u64,
    /// Whether the last, unterminated frame was stored.
    pub final_frame_flushed: bool,
}

/// Drives packets from one connection into a sink.
///
/// Owns its reassembler, batcher and sink for the lifetime of the
/// connection. Notifications must be handled one at a time, in arrival
/// order.
pub struct RecordingSession<S: FrameSink> {
    reassembler: PacketReassembler,
    batcher: FrameBatcher,
    sink: S,
    flush_partial_frame: bool,
}

impl<S: FrameSink> RecordingSession<S> {
    /// Creates a session with the default configuration.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, &RecorderConfig::default())
    }

    /// Creates a session configured by `config`.
    pub fn with_config(sink: S, config: &RecorderConfig) -> Self {
        info!(
            "recording session started (batch {}, resync {:?})",
            config.batch_threshold(),
            config.resync
        );
        Self {
            reassembler: PacketReassembler::with_policy(config.resync),
            batcher: FrameBatcher::new(config.batch_threshold()),
            sink,
            flush_partial_frame: config.flush_partial_frame,
        }
    }

    /// Returns the reassembler.
    pub fn reassembler(&self) -> &PacketReassembler {
        &self.reassembler
    }

    /// Returns the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the reassembly counters so far.
    pub fn stats(&self) -> &ReassemblyStats {
        self.reassembler.stats()
    }

    /// Handles one notification and returns what it produced.
    ///
    /// Errors come from the sink only; malformed or out-of-order packets are
    /// absorbed by the reassembler.
    pub fn handle_notification(&mut self, raw: &[u8]) -> Result<Event, RecorderError> {
        let event = self.reassembler.submit(raw);
        match &event {
            Event::None => {}
            Event::FrameReady(frame) => {
                if let Some(batch) = self.batcher.push(frame.clone()) {
                    self.sink.write_batch(batch)?;
                }
            }
            Event::LossDetected(loss) => self.sink.on_loss(loss)?,
        }
        Ok(event)
    }

    /// Ends the session: flushes the last frame and batch, then closes the
    /// sink.
    pub fn finish(mut self) -> Result<(S, SessionSummary), RecorderError> {
        let mut final_frame_flushed = false;
        if self.flush_partial_frame {
            if let Some(frame) = self.reassembler.finish() {
                debug!("storing final frame of {} bytes", frame.len());
                final_frame_flushed = true;
                if let Some(batch) = self.batcher.push(frame) {
                    self.sink.write_batch(batch)?;
                }
            }
        } else {
            self.reassembler.reset();
        }

        if let Some(batch) = self.batcher.flush() {
            self.sink.write_batch(batch)?;
        }
        self.sink.close()?;

        let summary = SessionSummary {
            stats: *self.reassembler.stats(),
            batches: self.batcher.batches(),
            final_frame_flushed,
        };
        info!(
            "recording session finished: {} frames in {} batches, {} losses",
            summary.stats.frames,
            summary.batches,
            summary.stats.losses()
        );
        Ok((self.sink, summary))
    }
}
