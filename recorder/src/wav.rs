//! Streaming WAVE writer for 16-bit PCM.

use std::io::{self, Seek, SeekFrom, Write};

const HEADER_LEN: u32 = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Writes 16-bit PCM samples as a RIFF/WAVE file.
///
/// The sizes in the header are unknown until the stream ends; they are
/// written as zero and patched by [`finish`](Self::finish).
pub struct WavWriter<W: Write + Seek> {
    writer: W,
    format: PcmFormat,
    data_len: u32,
    finished: bool,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Writes a provisional header and returns the writer.
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] if the byte rate or block
    /// alignment does not fit the header fields.
    pub fn new(mut writer: W, sample_rate: u32, channels: u16) -> io::Result<Self> {
        let format = PcmFormat::new(sample_rate, channels)?;
        writer.write_all(&header(&format, 0))?;
        Ok(Self {
            writer,
            format,
            data_len: 0,
            finished: false,
        })
    }

    /// Returns the number of sample bytes written.
    pub fn data_len(&self) -> u32 {
        self.data_len
    }

    /// Appends interleaved samples.
    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "wav writer finished"));
        }

        let len = u32::try_from(samples.len() * 2)
            .ok()
            .and_then(|n| self.data_len.checked_add(n))
            .filter(|n| n.checked_add(HEADER_LEN - 8).is_some())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "wav data exceeds 4 GiB"))?;

        let mut buf = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        self.writer.write_all(&buf)?;
        self.data_len = len;
        Ok(())
    }

    /// Patches the header sizes and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.patch_header()?;
        Ok(self.writer)
    }

    /// Patches the header sizes, leaving the writer usable for inspection.
    pub fn finalize(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.patch_header()
    }

    /// Returns a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn patch_header(&mut self) -> io::Result<()> {
        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(0))?;
        self.writer
            .write_all(&header(&self.format, self.data_len))?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct PcmFormat {
    sample_rate: u32,
    channels: u16,
    block_align: u16,
    byte_rate: u32,
}

impl PcmFormat {
    fn new(sample_rate: u32, channels: u16) -> io::Result<Self> {
        let block_align = channels
            .checked_mul(BITS_PER_SAMPLE / 8)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many channels"))?;
        let byte_rate = sample_rate
            .checked_mul(u32::from(block_align))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "byte rate exceeds 32 bits"))?;
        Ok(Self {
            sample_rate,
            channels,
            block_align,
            byte_rate,
        })
    }
}

fn header(format: &PcmFormat, data_len: u32) -> [u8; HEADER_LEN as usize] {
    let mut h = [0u8; HEADER_LEN as usize];
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&(HEADER_LEN - 8 + data_len).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");

    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes()); // chunk size
    h[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    h[22..24].copy_from_slice(&format.channels.to_le_bytes());
    h[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&format.byte_rate.to_le_bytes());
    h[32..34].copy_from_slice(&format.block_align.to_le_bytes());
    h[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());
    h
}
