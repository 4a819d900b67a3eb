//! Wire format of the audio data characteristic.
//!
//! Every notification carries one packet:
//!
//! ```text
//! +------------------+---------------+--------------------+
//! | Sequence (2B)    | Fragment (1B) | Payload            |
//! | little-endian    | 0 = new frame | rest of the packet |
//! +------------------+---------------+--------------------+
//! ```
//!
//! The sequence number runs across the whole stream and wraps at 65536. The
//! fragment counter restarts at 0 on every frame start and counts the
//! continuation packets of that frame.

use std::num::NonZeroUsize;

use crate::error::ReassemblyError;

/// Size of the packet header in bytes.
pub const HEADER_LEN: usize = 3;

/// Shortest notification accepted by the reassembler.
pub const MIN_PACKET_LEN: usize = HEADER_LEN + 1;

/// Most packets a single frame may span: one start packet plus 255
/// continuations. A 256th continuation would wrap the fragment counter into
/// the frame-start marker.
pub const MAX_PACKETS_PER_FRAME: usize = u8::MAX as usize + 1;

/// One packet received from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPacket<'a> {
    /// Stream-wide running index.
    pub sequence_number: u16,
    /// Position within the current frame; 0 starts a new frame.
    pub fragment_counter: u8,
    /// Fragment bytes of the current frame.
    pub payload: &'a [u8],
}

impl<'a> RawPacket<'a> {
    /// Creates a packet from its fields.
    pub fn new(sequence_number: u16, fragment_counter: u8, payload: &'a [u8]) -> Self {
        Self {
            sequence_number,
            fragment_counter,
            payload,
        }
    }

    /// Parses a notification buffer.
    ///
    /// The payload borrows from `raw`. Buffers shorter than
    /// [`MIN_PACKET_LEN`] are rejected.
    pub fn parse(raw: &'a [u8]) -> Result<Self, ReassemblyError> {
        if raw.len() < MIN_PACKET_LEN {
            return Err(ReassemblyError::MalformedPacket { len: raw.len() });
        }

        let (header, payload) = raw.split_at(HEADER_LEN);
        Ok(Self {
            sequence_number: u16::from_le_bytes([header[0], header[1]]),
            fragment_counter: header[2],
            payload,
        })
    }

    /// Returns true if this packet opens a new frame.
    pub fn is_frame_start(&self) -> bool {
        self.fragment_counter == 0
    }

    /// Returns the size of the encoded packet.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Appends the wire encoding of this packet to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&self.sequence_number.to_le_bytes());
        buf.push(self.fragment_counter);
        buf.extend_from_slice(self.payload);
    }

    /// Returns the wire encoding of this packet.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }
}

/// Splits whole frames into packets, the way a device does before notifying.
///
/// Sequence numbers continue across frames and wrap at 65536.
#[derive(Debug, Clone)]
pub struct Packetizer {
    next_sequence_number: u16,
    max_payload: NonZeroUsize,
}

impl Packetizer {
    /// Creates a packetizer that puts at most `max_payload` frame bytes in
    /// each packet, starting at sequence number 0.
    pub fn new(max_payload: NonZeroUsize) -> Self {
        Self {
            next_sequence_number: 0,
            max_payload,
        }
    }

    /// Sets the sequence number of the next packet.
    pub fn starting_at(mut self, sequence_number: u16) -> Self {
        self.next_sequence_number = sequence_number;
        self
    }

    /// Returns the sequence number the next packet will carry.
    pub fn next_sequence_number(&self) -> u16 {
        self.next_sequence_number
    }

    /// Returns the payload limit per packet.
    pub fn max_payload(&self) -> NonZeroUsize {
        self.max_payload
    }

    /// Splits `frame` into encoded packets.
    ///
    /// Fails without consuming sequence numbers if the frame is empty or
    /// would need more than [`MAX_PACKETS_PER_FRAME`] packets.
    pub fn packetize(&mut self, frame: &[u8]) -> Result<Vec<Vec<u8>>, ReassemblyError> {
        if frame.is_empty() {
            return Err(ReassemblyError::EmptyFrame);
        }

        let max_payload = self.max_payload.get();
        let packets = frame.len().div_ceil(max_payload);
        if packets > MAX_PACKETS_PER_FRAME {
            return Err(ReassemblyError::FrameTooLarge {
                len: frame.len(),
                packets,
            });
        }

        let mut out = Vec::with_capacity(packets);
        for (i, chunk) in frame.chunks(max_payload).enumerate() {
            // i < MAX_PACKETS_PER_FRAME, so the cast is lossless.
            let packet = RawPacket::new(self.next_sequence_number, i as u8, chunk);
            out.push(packet.encode());
            self.next_sequence_number = self.next_sequence_number.wrapping_add(1);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_parse_header() {
        let raw = [0x34, 0x12, 0x07, 0xAA, 0xBB];
        let packet = RawPacket::parse(&raw).unwrap();
        assert_eq!(packet.sequence_number, 0x1234);
        assert_eq!(packet.fragment_counter, 7);
        assert_eq!(packet.payload, &[0xAA, 0xBB]);
        assert!(!packet.is_frame_start());
    }

    #[test]
    fn test_parse_minimum_length() {
        let packet = RawPacket::parse(&[0xFF, 0xFF, 0x00, 0x01]).unwrap();
        assert_eq!(packet.sequence_number, u16::MAX);
        assert!(packet.is_frame_start());
        assert_eq!(packet.payload, &[0x01]);
    }

    #[test]
    fn test_parse_too_short() {
        for len in 0..MIN_PACKET_LEN {
            let raw = vec![0u8; len];
            assert_eq!(
                RawPacket::parse(&raw),
                Err(ReassemblyError::MalformedPacket { len })
            );
        }
    }

    #[test]
    fn test_encode_layout() {
        let packet = RawPacket::new(0x0102, 3, b"xyz");
        assert_eq!(packet.encode(), vec![0x02, 0x01, 0x03, b'x', b'y', b'z']);
        assert_eq!(packet.encoded_len(), 6);
    }

    #[test]
    fn test_packetize_fragment_counters() {
        let mut packetizer = Packetizer::new(nz(2)).starting_at(10);
        let packets = packetizer.packetize(b"abcde").unwrap();

        assert_eq!(packets.len(), 3);
        let parsed: Vec<_> = packets.iter().map(|p| RawPacket::parse(p).unwrap()).collect();
        assert_eq!(
            parsed.iter().map(|p| p.sequence_number).collect::<Vec<_>>(),
            vec![10, 11, 12]
        );
        assert_eq!(
            parsed.iter().map(|p| p.fragment_counter).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(parsed[2].payload, b"e");
        assert_eq!(packetizer.next_sequence_number(), 13);
    }

    #[test]
    fn test_packetize_wraps_sequence() {
        let mut packetizer = Packetizer::new(nz(1)).starting_at(u16::MAX);
        let packets = packetizer.packetize(b"ab").unwrap();
        assert_eq!(RawPacket::parse(&packets[0]).unwrap().sequence_number, u16::MAX);
        assert_eq!(RawPacket::parse(&packets[1]).unwrap().sequence_number, 0);
    }

    #[test]
    fn test_packetize_limits() {
        let mut packetizer = Packetizer::new(nz(1));
        assert_eq!(packetizer.packetize(&[]), Err(ReassemblyError::EmptyFrame));

        let largest = vec![0u8; MAX_PACKETS_PER_FRAME];
        let packets = packetizer.packetize(&largest).unwrap();
        assert_eq!(packets.len(), MAX_PACKETS_PER_FRAME);
        assert_eq!(RawPacket::parse(packets.last().unwrap()).unwrap().fragment_counter, 255);

        let next = packetizer.next_sequence_number();
        let too_large = vec![0u8; MAX_PACKETS_PER_FRAME + 1];
        assert_eq!(
            packetizer.packetize(&too_large),
            Err(ReassemblyError::FrameTooLarge {
                len: MAX_PACKETS_PER_FRAME + 1,
                packets: MAX_PACKETS_PER_FRAME + 1,
            })
        );
        assert_eq!(packetizer.next_sequence_number(), next);
    }
}
