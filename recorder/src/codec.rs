//! Frame decoders.
//!
//! The device sends Opus frames. Decoding them needs a native codec, so the
//! recorder only defines the seam and ships a PCM passthrough used by devices
//! configured for uncompressed audio and by tests.

use blerec_reassembly::AssembledFrame;

use crate::batch::FrameBatch;
use crate::error::RecorderError;

/// Decodes assembled frames to interleaved 16-bit samples.
pub trait FrameDecoder {
    /// Decodes one frame.
    fn decode(&mut self, frame: &AssembledFrame) -> Result<Vec<i16>, RecorderError>;

    /// Decodes every frame of a batch, in order, into one buffer.
    fn decode_batch(&mut self, batch: &FrameBatch) -> Result<Vec<i16>, RecorderError> {
        let mut samples = Vec::new();
        for frame in &batch.frames {
            samples.extend(self.decode(frame)?);
        }
        Ok(samples)
    }
}

/// Treats frame bytes as little-endian signed 16-bit PCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pcm16Decoder;

impl FrameDecoder for Pcm16Decoder {
    fn decode(&mut self, frame: &AssembledFrame) -> Result<Vec<i16>, RecorderError> {
        let bytes = frame.as_bytes();
        if bytes.len() % 2 != 0 {
            return Err(RecorderError::Decode {
                len: bytes.len(),
                reason: "odd length for 16-bit samples",
            });
        }
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }
}
