//! Destinations for assembled frames.

use std::io::{self, Read, Seek, Write};

use blerec_reassembly::{AssembledFrame, LossEvent};
use tracing::{debug, info};

use crate::batch::FrameBatch;
use crate::codec::FrameDecoder;
use crate::error::RecorderError;
use crate::ogg::OggOpusWriter;
use crate::wav::WavWriter;

/// Consumer of frame batches.
///
/// Batches arrive in order and exactly once. Loss notices arrive between the
/// batches they fall between, so a sink can mark gaps.
pub trait FrameSink {
    /// Stores a batch.
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError>;

    /// Notes a loss. The default ignores it.
    fn on_loss(&mut self, _loss: &LossEvent) -> Result<(), RecorderError> {
        Ok(())
    }

    /// Flushes and finalizes the output. Later writes fail.
    fn close(&mut self) -> Result<(), RecorderError>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        (**self).write_batch(batch)
    }

    fn on_loss(&mut self, loss: &LossEvent) -> Result<(), RecorderError> {
        (**self).on_loss(loss)
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        (**self).close()
    }
}

// ============================================================================
// MemorySink
// ============================================================================

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<FrameBatch>,
    losses: Vec<LossEvent>,
    closed: bool,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batches received.
    pub fn batches(&self) -> &[FrameBatch] {
        &self.batches
    }

    /// Returns the loss notices received.
    pub fn losses(&self) -> &[LossEvent] {
        &self.losses
    }

    /// Returns all frames, flattened across batches.
    pub fn frames(&self) -> impl Iterator<Item = &AssembledFrame> {
        self.batches.iter().flat_map(|b| b.frames.iter())
    }

    /// Returns true once closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSink for MemorySink {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::SinkClosed);
        }
        self.batches.push(batch);
        Ok(())
    }

    fn on_loss(&mut self, loss: &LossEvent) -> Result<(), RecorderError> {
        self.losses.push(*loss);
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        self.closed = true;
        Ok(())
    }
}

// ============================================================================
// FrameFileSink
// ============================================================================

/// Writes frames as `u32` little-endian length followed by the bytes.
pub struct FrameFileSink<W: Write> {
    writer: W,
    frames: u64,
    closed: bool,
}

impl<W: Write> FrameFileSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames: 0,
            closed: false,
        }
    }

    /// Returns the number of frames written.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for FrameFileSink<W> {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::SinkClosed);
        }
        for frame in &batch.frames {
            let len = u32::try_from(frame.len())
                .map_err(|_| RecorderError::FrameTooLong { len: frame.len() })?;
            self.writer.write_all(&len.to_le_bytes())?;
            self.writer.write_all(frame.as_bytes())?;
            self.frames += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if !self.closed {
            self.writer.flush()?;
            self.closed = true;
            debug!("frame file closed after {} frames", self.frames);
        }
        Ok(())
    }
}

/// Reads back a stream written by [`FrameFileSink`].
pub fn read_frames<R: Read>(mut reader: R) -> Result<Vec<AssembledFrame>, RecorderError> {
    let mut frames = Vec::new();
    let mut len = [0u8; 4];
    loop {
        match reader.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        // The prefix is untrusted; the buffer grows with the bytes present.
        let len = u64::from(u32::from_le_bytes(len));
        let mut data = Vec::new();
        let read = reader.by_ref().take(len).read_to_end(&mut data)?;
        if read as u64 != len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated frame").into());
        }
        frames.push(AssembledFrame::new(data));
    }
    Ok(frames)
}

// ============================================================================
// OggOpusSink
// ============================================================================

/// Stores encoded frames unchanged in an Ogg Opus container.
pub struct OggOpusSink<W: Write> {
    writer: OggOpusWriter<W>,
    frame_duration_48k: u64,
    closed: bool,
}

impl<W: Write> OggOpusSink<W> {
    /// Writes the stream headers and returns the sink.
    pub fn new(
        writer: W,
        sample_rate: u32,
        channels: u16,
        frame_duration_48k: u64,
    ) -> Result<Self, RecorderError> {
        Ok(Self {
            writer: OggOpusWriter::new(writer, 1, sample_rate, channels)?,
            frame_duration_48k,
            closed: false,
        })
    }

    /// Returns the granule position reached.
    pub fn granule(&self) -> u64 {
        self.writer.granule()
    }

    /// Ends the stream if needed and returns the inner writer.
    pub fn into_inner(self) -> Result<W, RecorderError> {
        Ok(self.writer.finish()?)
    }
}

impl<W: Write> FrameSink for OggOpusSink<W> {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::SinkClosed);
        }
        for frame in &batch.frames {
            self.writer.write_frame(frame.as_bytes(), self.frame_duration_48k)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if !self.closed {
            self.writer.end()?;
            self.closed = true;
            info!("ogg stream closed at granule {}", self.writer.granule());
        }
        Ok(())
    }
}

// ============================================================================
// DecodingSink
// ============================================================================

/// Decodes frames and writes the samples to a WAVE file.
pub struct DecodingSink<D, W: Write + Seek> {
    decoder: D,
    wav: WavWriter<W>,
    closed: bool,
}

impl<D: FrameDecoder, W: Write + Seek> DecodingSink<D, W> {
    /// Writes a provisional WAVE header and returns the sink.
    pub fn new(decoder: D, writer: W, sample_rate: u32, channels: u16) -> Result<Self, RecorderError> {
        Ok(Self {
            decoder,
            wav: WavWriter::new(writer, sample_rate, channels)?,
            closed: false,
        })
    }

    /// Returns the number of sample bytes written.
    pub fn data_len(&self) -> u32 {
        self.wav.data_len()
    }

    /// Finalizes the file and returns the inner writer.
    pub fn into_inner(self) -> Result<W, RecorderError> {
        Ok(self.wav.finish()?)
    }
}

impl<D: FrameDecoder, W: Write + Seek> FrameSink for DecodingSink<D, W> {
    fn write_batch(&mut self, batch: FrameBatch) -> Result<(), RecorderError> {
        if self.closed {
            return Err(RecorderError::SinkClosed);
        }
        let samples = self.decoder.decode_batch(&batch)?;
        self.wav.write_samples(&samples)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RecorderError> {
        if !self.closed {
            self.wav.finalize()?;
            self.closed = true;
            info!("wav closed with {} data bytes", self.wav.data_len());
        }
        Ok(())
    }
}
