//! Ogg Opus container writer.
//!
//! Stores already encoded Opus frames as one logical stream: an OpusHead
//! page (BOS), an OpusTags page, one page per frame, and an empty EOS page
//! carrying the final granule position (RFC 7845).

use std::io::{self, Write};

const PAGE_SIGNATURE: &[u8; 4] = b"OggS";
const PAGE_HEADER_LEN: usize = 27;
const FLAG_NONE: u8 = 0x00;
const FLAG_BOS: u8 = 0x02;
const FLAG_EOS: u8 = 0x04;

/// 80 ms at 48 kHz, the recommended decoder pre-roll.
const PRE_SKIP: u16 = 3840;
const VENDOR: &[u8] = b"blerec";

/// Largest packet that fits a single page (255 lacing values).
pub const MAX_PAGE_PAYLOAD: usize = 255 * 255 - 1;

const CRC_TABLE: [u32; 256] = crc_table();

/// Writes encoded Opus frames into an Ogg container.
pub struct OggOpusWriter<W: Write> {
    writer: W,
    serial_no: u32,
    page_seq: u32,
    granule: u64,
    ended: bool,
}

impl<W: Write> OggOpusWriter<W> {
    /// Writes the OpusHead and OpusTags pages.
    ///
    /// `sample_rate` is the input rate recorded in OpusHead; granule
    /// positions always count 48 kHz samples.
    pub fn new(writer: W, serial_no: u32, sample_rate: u32, channels: u16) -> io::Result<Self> {
        let channels = u8::try_from(channels)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many channels"))?;

        let mut ow = Self {
            writer,
            serial_no,
            page_seq: 0,
            granule: 0,
            ended: false,
        };

        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1); // version
        head.push(channels);
        head.extend_from_slice(&PRE_SKIP.to_le_bytes());
        head.extend_from_slice(&sample_rate.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes()); // output gain
        head.push(0); // mapping family
        ow.write_page(&head, FLAG_BOS, 0)?;

        let mut tags = Vec::with_capacity(16 + VENDOR.len());
        tags.extend_from_slice(b"OpusTags");
        tags.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
        tags.extend_from_slice(VENDOR);
        tags.extend_from_slice(&0u32.to_le_bytes()); // no comments
        ow.write_page(&tags, FLAG_NONE, 0)?;

        Ok(ow)
    }

    /// Returns the granule position after the last frame.
    pub fn granule(&self) -> u64 {
        self.granule
    }

    /// Returns the number of pages written.
    pub fn pages(&self) -> u32 {
        self.page_seq
    }

    /// Writes one frame lasting `duration_48k` samples at 48 kHz.
    pub fn write_frame(&mut self, frame: &[u8], duration_48k: u64) -> io::Result<()> {
        if self.ended {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream ended"));
        }
        if frame.len() > MAX_PAGE_PAYLOAD {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "frame too large for one page"));
        }

        self.granule += duration_48k;
        self.write_page(frame, FLAG_NONE, self.granule)
    }

    /// Writes the EOS page. Further writes fail.
    pub fn end(&mut self) -> io::Result<()> {
        if self.ended {
            return Ok(());
        }
        self.write_page(&[], FLAG_EOS, self.granule)?;
        self.ended = true;
        self.writer.flush()
    }

    /// Ends the stream and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.end()?;
        Ok(self.writer)
    }

    fn write_page(&mut self, payload: &[u8], flags: u8, granule: u64) -> io::Result<()> {
        let page = build_page(payload, flags, granule, self.serial_no, self.page_seq);
        self.writer.write_all(&page)?;
        self.page_seq += 1;
        Ok(())
    }
}

fn build_page(payload: &[u8], flags: u8, granule: u64, serial_no: u32, page_seq: u32) -> Vec<u8> {
    // A packet ends with a lacing value below 255, so a multiple of 255
    // needs a trailing zero.
    let segments = payload.len() / 255 + 1;

    let mut page = Vec::with_capacity(PAGE_HEADER_LEN + segments + payload.len());
    page.extend_from_slice(PAGE_SIGNATURE);
    page.push(0); // version
    page.push(flags);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&serial_no.to_le_bytes());
    page.extend_from_slice(&page_seq.to_le_bytes());
    page.extend_from_slice(&[0; 4]); // checksum
    page.push(segments as u8);
    page.extend(std::iter::repeat_n(255u8, segments - 1));
    page.push((payload.len() % 255) as u8);
    page.extend_from_slice(payload);

    let crc = checksum(&page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &b| {
        (crc << 8) ^ CRC_TABLE[((crc >> 24) as u8 ^ b) as usize]
    })
}

const fn crc_table() -> [u32; 256] {
    const POLY: u32 = 0x04c1_1db7;

    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 { (r << 1) ^ POLY } else { r << 1 };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}
