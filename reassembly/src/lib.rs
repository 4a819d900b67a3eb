//! Packet reassembly for fragmented audio notification streams.
//!
//! A recording device pushes encoded audio frames over a BLE notify
//! characteristic. Each notification carries a 3-byte header (a running
//! sequence number and a frame-local fragment counter) followed by a slice of
//! the current frame. This crate turns that stream back into whole frames:
//!
//! - [`RawPacket`]: the wire format, parsing and encoding
//! - [`Packetizer`]: producer-side splitting of frames into packets
//! - [`PacketReassembler`]: the reassembly state machine
//! - [`Event`]: what a single submitted packet produced
//! - [`ReassemblyStats`]: counters for every outcome, including dropped input
//!
//! # Example
//!
//! ```
//! use blerec_reassembly::{Event, PacketReassembler};
//!
//! let mut reassembler = PacketReassembler::new();
//!
//! assert!(reassembler.submit(&[0, 0, 0, b'A', b'B']).is_none());
//! assert!(reassembler.submit(&[1, 0, 1, b'C', b'D']).is_none());
//!
//! // A frame is only known complete once the next one starts.
//! match reassembler.submit(&[2, 0, 0, b'E', b'F']) {
//!     Event::FrameReady(frame) => assert_eq!(frame.as_bytes(), b"ABCD"),
//!     other => panic!("unexpected event: {other:?}"),
//! }
//!
//! // The last frame has no successor; flush it explicitly.
//! assert_eq!(reassembler.finish().unwrap().as_bytes(), b"EF");
//! ```

mod error;
mod event;
mod packet;
mod reassembler;
mod stats;

pub use error::ReassemblyError;
pub use event::{AssembledFrame, Event, LossEvent};
pub use packet::{HEADER_LEN, MAX_PACKETS_PER_FRAME, MIN_PACKET_LEN, Packetizer, RawPacket};
pub use reassembler::{Events, PacketReassembler, ReassemblyState, ResyncPolicy};
pub use stats::ReassemblyStats;

#[cfg(test)]
mod tests;
