//! Text captures of notification streams.
//!
//! One notification per line, hex encoded. Blank lines and lines starting
//! with `#` are ignored, so captures can be annotated by hand:
//!
//! ```text
//! # seq=0 fc=0
//! 000000fc01
//! 010001aabb
//! ```

use std::io::{BufRead, Write};

use crate::error::RecorderError;

/// Reads every notification of a capture.
///
/// Line numbers in errors start at 1.
pub fn read_capture<R: BufRead>(reader: R) -> Result<Vec<Vec<u8>>, RecorderError> {
    let mut packets = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let packet = hex::decode(line).map_err(|source| RecorderError::Capture { line: i + 1, source })?;
        packets.push(packet);
    }
    Ok(packets)
}

/// Writes notifications as a capture, one per line.
pub fn write_capture<W, I>(mut writer: W, packets: I) -> Result<(), RecorderError>
where
    W: Write,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    for packet in packets {
        writeln!(writer, "{}", hex::encode(packet.as_ref()))?;
    }
    writer.flush()?;
    Ok(())
}
