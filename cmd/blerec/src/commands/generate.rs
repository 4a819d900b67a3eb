//! Synthetic capture generation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::num::NonZeroUsize;

use clap::Args;

use blerec_reassembly::{HEADER_LEN, Packetizer};
use blerec_recorder::write_capture;

use super::{print_success, require_output_file};
use crate::Cli;

/// Writes a capture of synthetic frames, optionally dropping packets.
#[derive(Args)]
pub struct GenerateCommand {
    /// Number of frames
    #[arg(long, default_value_t = 50)]
    frames: usize,

    /// Bytes per frame
    #[arg(long, default_value_t = 80)]
    frame_size: usize,

    /// Largest notification, header included
    #[arg(long, default_value_t = 20)]
    mtu: usize,

    /// Drop every Nth packet (0 keeps all)
    #[arg(long, default_value_t = 0)]
    drop_every: usize,

    /// Sequence number of the first packet
    #[arg(long, default_value_t = 0)]
    start_seq: u16,
}

impl GenerateCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let path = require_output_file(cli)?;
        let (packets, dropped) = self.generate()?;

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "# {} frames of {} bytes, mtu {}, {} packets dropped",
            self.frames, self.frame_size, self.mtu, dropped
        )?;
        write_capture(&mut writer, &packets)?;

        print_success(&format!("{} packets written to {}", packets.len(), path));
        Ok(())
    }

    fn generate(&self) -> anyhow::Result<(Vec<Vec<u8>>, usize)> {
        let max_payload = self
            .mtu
            .checked_sub(HEADER_LEN)
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| anyhow::anyhow!("mtu must exceed the {}-byte header", HEADER_LEN))?;
        if self.frame_size == 0 {
            anyhow::bail!("frame size must be positive");
        }

        let mut packetizer = Packetizer::new(max_payload).starting_at(self.start_seq);
        let mut packets = Vec::new();
        let mut index = 0usize;
        let mut dropped = 0usize;

        for i in 0..self.frames {
            for packet in packetizer.packetize(&synthetic_frame(i, self.frame_size))? {
                index += 1;
                if self.drop_every > 0 && index % self.drop_every == 0 {
                    dropped += 1;
                    continue;
                }
                packets.push(packet);
            }
        }
        Ok((packets, dropped))
    }
}

/// Deterministic frame content; the first byte is the frame index.
fn synthetic_frame(index: usize, len: usize) -> Vec<u8> {
    (0..len)
        .map(|j| if j == 0 { index as u8 } else { (index * 31 + j * 7) as u8 })
        .collect()
}
