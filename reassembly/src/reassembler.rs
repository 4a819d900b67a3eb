//! The reassembly state machine.
//!
//! Packets are evaluated against four cases, in this order:
//!
//! 1. unsynchronized frame start: synchronize and start buffering
//! 2. unsynchronized continuation: drop it
//! 3. synchronized, but the sequence number or fragment counter skipped:
//!    report loss and drop back to unsynchronized
//! 4. synchronized and contiguous: a frame start completes the pending frame,
//!    a continuation extends it
//!
//! There is no end-of-frame marker on the wire, so a frame is only known to
//! be complete when the next frame starts. [`PacketReassembler::finish`]
//! flushes the last one.

use std::mem;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReassemblyError;
use crate::event::{AssembledFrame, Event, LossEvent};
use crate::packet::RawPacket;
use crate::stats::ReassemblyStats;

/// What to do with the packet that revealed a loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncPolicy {
    /// Discard it, even if it is a frame start. Resynchronization waits for
    /// the next frame start. Matches existing receivers.
    #[default]
    Strict,
    /// If it is a frame start, synchronize on it in the same call.
    Immediate,
}

/// Reassembly state of one logical stream.
///
/// `expected_sequence_number` holds the sequence number of the last accepted
/// packet; the next packet must carry its successor (mod 65536). Likewise a
/// continuation must carry `expected_fragment_counter + 1` (mod 256).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassemblyState {
    expected_sequence_number: Option<u16>,
    expected_fragment_counter: u8,
    pending_frame_buffer: Vec<u8>,
}

impl ReassemblyState {
    /// Returns the sequence number of the last accepted packet, or `None`
    /// while waiting for a frame start.
    pub fn expected_sequence_number(&self) -> Option<u16> {
        self.expected_sequence_number
    }

    /// Returns the fragment counter of the last accepted packet.
    pub fn expected_fragment_counter(&self) -> u8 {
        self.expected_fragment_counter
    }

    /// Returns the bytes of the frame being assembled.
    pub fn pending_frame(&self) -> &[u8] {
        &self.pending_frame_buffer
    }

    /// Returns true once a frame start has been accepted.
    pub fn is_synchronized(&self) -> bool {
        self.expected_sequence_number.is_some()
    }

    fn start_frame(&mut self, packet: &RawPacket<'_>) {
        self.expected_sequence_number = Some(packet.sequence_number);
        self.expected_fragment_counter = 0;
        self.pending_frame_buffer.clear();
        self.pending_frame_buffer.extend_from_slice(packet.payload);
    }

    /// Drops back to unsynchronized. Returns the discarded pending length.
    fn desync(&mut self) -> usize {
        let discarded = self.pending_frame_buffer.len();
        self.expected_sequence_number = None;
        self.expected_fragment_counter = 0;
        self.pending_frame_buffer.clear();
        discarded
    }
}

/// Turns a packet stream into complete frames and loss notices.
///
/// Not safe for concurrent mutation: the transport must deliver packets one
/// at a time and each [`submit`](Self::submit) runs to completion before the
/// next. One instance lives for one recording session.
#[derive(Debug, Default)]
pub struct PacketReassembler {
    state: ReassemblyState,
    policy: ResyncPolicy,
    stats: ReassemblyStats,
}

impl PacketReassembler {
    /// Creates an unsynchronized reassembler with [`ResyncPolicy::Strict`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unsynchronized reassembler with the given policy.
    pub fn with_policy(policy: ResyncPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Returns the resynchronization policy.
    pub fn policy(&self) -> ResyncPolicy {
        self.policy
    }

    /// Returns the current state.
    pub fn state(&self) -> &ReassemblyState {
        &self.state
    }

    /// Returns true once a frame start has been accepted.
    pub fn is_synchronized(&self) -> bool {
        self.state.is_synchronized()
    }

    /// See [`ReassemblyState::expected_sequence_number`].
    pub fn expected_sequence_number(&self) -> Option<u16> {
        self.state.expected_sequence_number
    }

    /// See [`ReassemblyState::expected_fragment_counter`].
    pub fn expected_fragment_counter(&self) -> u8 {
        self.state.expected_fragment_counter
    }

    /// Returns the number of bytes buffered for the frame in flight.
    pub fn pending_len(&self) -> usize {
        self.state.pending_frame_buffer.len()
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> &ReassemblyStats {
        &self.stats
    }

    /// Submits one raw notification.
    ///
    /// Malformed buffers are counted and dropped. Never fails: the worst
    /// outcome is a [`Event::LossDetected`].
    pub fn submit(&mut self, raw: &[u8]) -> Event {
        match RawPacket::parse(raw) {
            Ok(packet) => self.submit_packet(packet),
            Err(err) => {
                self.stats.packets += 1;
                self.stats.malformed += 1;
                warn!("dropping packet: {}", err);
                Event::None
            }
        }
    }

    /// Submits an already parsed packet.
    pub fn submit_packet(&mut self, packet: RawPacket<'_>) -> Event {
        self.stats.packets += 1;

        let Some(last_sequence_number) = self.state.expected_sequence_number else {
            if packet.is_frame_start() {
                debug!("synchronized at sequence {}", packet.sequence_number);
                self.state.start_frame(&packet);
            } else {
                self.stats.premature += 1;
                debug!(
                    "dropping packet: {}",
                    ReassemblyError::PrematureFragment {
                        fragment_counter: packet.fragment_counter
                    }
                );
            }
            return Event::None;
        };

        if let Some(cause) = self.continuity_break(last_sequence_number, &packet) {
            return self.lose_sync(cause, &packet);
        }

        self.state.expected_sequence_number = Some(packet.sequence_number);

        if packet.is_frame_start() {
            let frame = mem::replace(&mut self.state.pending_frame_buffer, packet.payload.to_vec());
            self.state.expected_fragment_counter = 0;
            Event::FrameReady(self.emit(frame))
        } else {
            self.state.pending_frame_buffer.extend_from_slice(packet.payload);
            self.state.expected_fragment_counter = packet.fragment_counter;
            Event::None
        }
    }

    /// Flushes the frame in flight at the end of a session.
    ///
    /// The protocol has no end-of-frame marker, so the last frame is never
    /// completed by [`submit`](Self::submit). Returns it (possibly
    /// incomplete, possibly empty) if synchronized, and leaves the
    /// reassembler unsynchronized.
    pub fn finish(&mut self) -> Option<AssembledFrame> {
        if !self.state.is_synchronized() {
            return None;
        }

        let frame = mem::take(&mut self.state.pending_frame_buffer);
        self.state.desync();
        debug!("flushed final frame of {} bytes", frame.len());
        Some(self.emit(frame))
    }

    /// Discards all state without emitting anything, e.g. on disconnect.
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        let discarded = self.state.desync();
        if discarded > 0 {
            debug!("reset discarded {} pending bytes", discarded);
        }
    }

    /// Lazily submits every buffer of `packets`, yielding the events that
    /// carry output.
    pub fn events<I>(&mut self, packets: I) -> Events<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        Events {
            reassembler: self,
            packets: packets.into_iter(),
        }
    }

    fn continuity_break(
        &self,
        last_sequence_number: u16,
        packet: &RawPacket<'_>,
    ) -> Option<ReassemblyError> {
        let expected = last_sequence_number.wrapping_add(1);
        if packet.sequence_number != expected {
            return Some(ReassemblyError::SequenceLoss {
                expected,
                actual: packet.sequence_number,
            });
        }

        let expected = self.state.expected_fragment_counter.wrapping_add(1);
        if !packet.is_frame_start() && packet.fragment_counter != expected {
            return Some(ReassemblyError::FragmentLoss {
                expected,
                actual: packet.fragment_counter,
            });
        }

        None
    }

    fn lose_sync(&mut self, cause: ReassemblyError, packet: &RawPacket<'_>) -> Event {
        let discarded_bytes = self.state.desync();

        match cause {
            ReassemblyError::SequenceLoss { .. } => self.stats.sequence_losses += 1,
            ReassemblyError::FragmentLoss { .. } => self.stats.fragment_losses += 1,
            _ => {}
        }
        self.stats.discarded_bytes += discarded_bytes as u64;
        warn!("lost synchronization ({} bytes discarded): {}", discarded_bytes, cause);

        if self.policy == ResyncPolicy::Immediate && packet.is_frame_start() {
            debug!("resynchronized at sequence {}", packet.sequence_number);
            self.state.start_frame(packet);
        }

        Event::LossDetected(LossEvent {
            cause,
            discarded_bytes,
        })
    }

    fn emit(&mut self, frame: Vec<u8>) -> AssembledFrame {
        self.stats.frames += 1;
        self.stats.frame_bytes += frame.len() as u64;
        AssembledFrame::new(frame)
    }
}

/// Iterator returned by [`PacketReassembler::events`].
pub struct Events<'r, I> {
    reassembler: &'r mut PacketReassembler,
    packets: I,
}

impl<I> Iterator for Events<'_, I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        for raw in self.packets.by_ref() {
            let event = self.reassembler.submit(raw.as_ref());
            if !event.is_none() {
                return Some(event);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(sequence_number: u16, fragment_counter: u8, payload: &[u8]) -> Vec<u8> {
        RawPacket::new(sequence_number, fragment_counter, payload).encode()
    }

    #[test]
    fn test_cold_start() {
        let mut r = PacketReassembler::new();
        assert!(r.submit(&packet(42, 0, b"AB")).is_none());

        assert!(r.is_synchronized());
        assert_eq!(r.expected_sequence_number(), Some(42));
        assert_eq!(r.expected_fragment_counter(), 0);
        assert_eq!(r.state().pending_frame(), b"AB");
    }

    #[test]
    fn test_premature_fragment_dropped() {
        let mut r = PacketReassembler::new();
        assert!(r.submit(&packet(7, 3, b"zz")).is_none());

        assert_eq!(r.state(), &ReassemblyState::default());
        assert_eq!(r.stats().premature, 1);
        assert_eq!(r.stats().packets, 1);
    }

    #[test]
    fn test_continuation_appends() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"A"));
        assert!(r.submit(&packet(1, 1, b"B")).is_none());
        assert!(r.submit(&packet(2, 2, b"C")).is_none());

        assert_eq!(r.state().pending_frame(), b"ABC");
        assert_eq!(r.expected_sequence_number(), Some(2));
        assert_eq!(r.expected_fragment_counter(), 2);
    }

    #[test]
    fn test_sequence_loss_resets() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"A"));

        let event = r.submit(&packet(5, 1, b"B"));
        assert_eq!(
            event,
            Event::LossDetected(LossEvent {
                cause: ReassemblyError::SequenceLoss {
                    expected: 1,
                    actual: 5
                },
                discarded_bytes: 1,
            })
        );
        assert!(!r.is_synchronized());
        assert_eq!(r.pending_len(), 0);
        assert_eq!(r.stats().sequence_losses, 1);
        assert_eq!(r.stats().discarded_bytes, 1);
    }

    #[test]
    fn test_fragment_loss_resets() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"A"));
        let _ = r.submit(&packet(1, 1, b"B"));

        let event = r.submit(&packet(2, 3, b"D"));
        assert_eq!(
            event.loss().map(|l| l.cause),
            Some(ReassemblyError::FragmentLoss {
                expected: 2,
                actual: 3
            })
        );
        assert!(!r.is_synchronized());
        assert_eq!(r.stats().fragment_losses, 1);
    }

    #[test]
    fn test_strict_policy_discards_trigger() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"A"));

        // A frame start with a sequence gap: loss, and not reused.
        assert!(r.submit(&packet(9, 0, b"X")).loss().is_some());
        assert!(!r.is_synchronized());

        // Contiguous with the discarded packet, but still unsynchronized.
        assert!(r.submit(&packet(10, 1, b"Y")).is_none());
        assert_eq!(r.stats().premature, 1);
    }

    #[test]
    fn test_immediate_policy_reuses_trigger() {
        let mut r = PacketReassembler::with_policy(ResyncPolicy::Immediate);
        let _ = r.submit(&packet(0, 0, b"A"));

        assert!(r.submit(&packet(9, 0, b"X")).loss().is_some());
        assert!(r.is_synchronized());
        assert_eq!(r.state().pending_frame(), b"X");

        assert!(r.submit(&packet(10, 1, b"Y")).is_none());
        let frame = r.submit(&packet(11, 0, b"Z")).into_frame().unwrap();
        assert_eq!(frame.as_bytes(), b"XY");
    }

    #[test]
    fn test_immediate_policy_ignores_continuation_trigger() {
        let mut r = PacketReassembler::with_policy(ResyncPolicy::Immediate);
        let _ = r.submit(&packet(0, 0, b"A"));

        assert!(r.submit(&packet(4, 1, b"B")).loss().is_some());
        assert!(!r.is_synchronized());
    }

    #[test]
    fn test_finish_flushes_pending() {
        let mut r = PacketReassembler::new();
        assert_eq!(r.finish(), None);

        let _ = r.submit(&packet(0, 0, b"AB"));
        let _ = r.submit(&packet(1, 1, b"C"));
        assert_eq!(r.finish(), Some(AssembledFrame::new(b"ABC".to_vec())));
        assert!(!r.is_synchronized());
        assert_eq!(r.finish(), None);
        assert_eq!(r.stats().frames, 1);
        assert_eq!(r.stats().frame_bytes, 3);
    }

    #[test]
    fn test_reset_keeps_counters() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"AB"));
        r.reset();

        assert!(!r.is_synchronized());
        assert_eq!(r.pending_len(), 0);
        assert_eq!(r.stats().packets, 1);
        assert_eq!(r.stats().discarded_bytes, 0);
    }

    #[test]
    fn test_malformed_counted() {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(0, 0, b"AB"));
        let before = r.state().clone();

        assert!(r.submit(&[]).is_none());
        assert!(r.submit(&[1, 0, 1]).is_none());

        assert_eq!(r.state(), &before);
        assert_eq!(r.stats().malformed, 2);
        assert_eq!(r.stats().packets, 3);
    }

    #[test]
    fn test_events_adapter_skips_none() {
        let packets = vec![
            packet(0, 0, b"A"),
            packet(1, 1, b"B"),
            packet(2, 0, b"C"),
            packet(7, 0, b"D"),
        ];

        let mut r = PacketReassembler::new();
        let events: Vec<_> = r.events(&packets).collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Event::FrameReady(AssembledFrame::new(b"AB".to_vec())));
        assert!(events[1].loss().is_some());
    }
}
