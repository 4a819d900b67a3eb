//! Packet-by-packet view of a capture.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use blerec_reassembly::{Event, PacketReassembler, RawPacket, ReassemblyStats};

use super::{get_config, load_capture, output_result};
use crate::Cli;

/// Shows the header of every packet and the event it produced.
#[derive(Args)]
pub struct InspectCommand {
    /// Capture file (hex, one notification per line)
    capture: PathBuf,
}

#[derive(Serialize)]
struct PacketRow {
    index: usize,
    len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fragment_counter: Option<u8>,
    event: String,
}

#[derive(Serialize)]
struct InspectReport {
    packets: Vec<PacketRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_frame: Option<usize>,
    stats: ReassemblyStats,
}

impl InspectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let config = get_config(cli)?;
        let packets = load_capture(&self.capture)?;
        let report = inspect(&packets, PacketReassembler::with_policy(config.resync));

        if cli.json {
            return output_result(&report, true);
        }

        for row in &report.packets {
            match (row.sequence_number, row.fragment_counter) {
                (Some(sn), Some(fc)) => println!(
                    "{:>6}  sn={:<5} fc={:<3} len={:<4} {}",
                    row.index, sn, fc, row.len, row.event
                ),
                _ => println!("{:>6}  {:<16} len={:<4} {}", row.index, "-", row.len, row.event),
            }
        }
        if let Some(len) = report.final_frame {
            println!("{:>6}  final frame ({} bytes)", "end", len);
        }
        println!();
        output_result(&report.stats, false)
    }
}

fn inspect(packets: &[Vec<u8>], mut reassembler: PacketReassembler) -> InspectReport {
    let mut rows = Vec::with_capacity(packets.len());
    for (index, raw) in packets.iter().enumerate() {
        let header = RawPacket::parse(raw).ok();
        let synchronized = reassembler.is_synchronized();

        let event = match reassembler.submit(raw) {
            Event::FrameReady(frame) => format!("frame ready ({} bytes)", frame.len()),
            Event::LossDetected(loss) => format!("{} ({} bytes discarded)", loss.cause, loss.discarded_bytes),
            Event::None => match &header {
                None => "malformed, dropped".to_string(),
                Some(p) if !synchronized && !p.is_frame_start() => "premature, dropped".to_string(),
                Some(p) if p.is_frame_start() => "frame start".to_string(),
                Some(_) => "continuation".to_string(),
            },
        };

        rows.push(PacketRow {
            index,
            len: raw.len(),
            sequence_number: header.map(|p| p.sequence_number),
            fragment_counter: header.map(|p| p.fragment_counter),
            event,
        });
    }

    let final_frame = reassembler.finish().map(|f| f.len());
    InspectReport {
        packets: rows,
        final_frame,
        stats: *reassembler.stats(),
    }
}
