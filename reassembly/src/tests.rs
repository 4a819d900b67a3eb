use std::num::NonZeroUsize;

use proptest::prelude::*;

use super::*;

fn packet(sequence_number: u16, fragment_counter: u8, payload: &[u8]) -> Vec<u8> {
    RawPacket::new(sequence_number, fragment_counter, payload).encode()
}

fn frames_of(events: impl IntoIterator<Item = Event>) -> Vec<Vec<u8>> {
    events
        .into_iter()
        .filter_map(Event::into_frame)
        .map(AssembledFrame::into_inner)
        .collect()
}

fn packetize_all(frames: &[Vec<u8>], max_payload: usize, start: u16) -> Vec<Vec<u8>> {
    let mut packetizer = Packetizer::new(NonZeroUsize::new(max_payload).unwrap()).starting_at(start);
    frames
        .iter()
        .flat_map(|frame| packetizer.packetize(frame).unwrap())
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_two_frames_in_order() {
    let mut r = PacketReassembler::new();

    assert!(r.submit(&[0x00, 0x00, 0x00, b'A', b'B']).is_none());
    assert!(r.submit(&[0x01, 0x00, 0x01, b'C', b'D']).is_none());

    let event = r.submit(&[0x02, 0x00, 0x00, b'E', b'F']);
    assert_eq!(event, Event::FrameReady(AssembledFrame::new(b"ABCD".to_vec())));

    assert_eq!(r.expected_sequence_number(), Some(2));
    assert_eq!(r.expected_fragment_counter(), 0);
    assert_eq!(r.state().pending_frame(), b"EF");
    assert_eq!(r.finish(), Some(AssembledFrame::new(b"EF".to_vec())));
}

#[test]
fn test_sequence_gap_waits_for_next_frame_start() {
    let mut r = PacketReassembler::new();

    let _ = r.submit(&packet(0, 0, b"A"));
    let loss = r.submit(&packet(5, 1, b"B"));
    assert!(matches!(
        loss.loss().map(|l| l.cause),
        Some(ReassemblyError::SequenceLoss { expected: 1, actual: 5 })
    ));

    // Continuations are dropped until a frame start arrives.
    assert!(r.submit(&packet(6, 2, b"C")).is_none());
    assert!(!r.is_synchronized());

    assert!(r.submit(&packet(7, 0, b"D")).is_none());
    assert!(r.submit(&packet(8, 1, b"E")).is_none());
    let frame = r.submit(&packet(9, 0, b"F")).into_frame().unwrap();
    assert_eq!(frame.as_bytes(), b"DE");
}

#[test]
fn test_premature_fragment_at_start() {
    let mut r = PacketReassembler::new();

    assert!(r.submit(&packet(100, 4, b"x")).is_none());
    assert!(r.submit(&packet(101, 5, b"y")).is_none());
    assert!(r.submit(&packet(102, 0, b"z")).is_none());

    assert_eq!(r.expected_sequence_number(), Some(102));
    assert_eq!(r.stats().premature, 2);
    assert_eq!(r.stats().frames, 0);
}

#[test]
fn test_malformed_leaves_state_unchanged() {
    let mut r = PacketReassembler::new();
    let _ = r.submit(&packet(3, 0, b"abc"));
    let _ = r.submit(&packet(4, 1, b"d"));
    let before = r.state().clone();

    for raw in [&[][..], &[0x05][..], &[0x05, 0x00][..], &[0x05, 0x00, 0x02][..]] {
        assert!(r.submit(raw).is_none());
    }
    assert_eq!(r.state(), &before);

    // The stream continues as if nothing happened.
    let _ = r.submit(&packet(5, 2, b"e"));
    assert_eq!(r.finish().unwrap().as_bytes(), b"abcde");
}

#[test]
fn test_sequence_wraps() {
    let mut r = PacketReassembler::new();

    let _ = r.submit(&packet(u16::MAX - 1, 0, b"a"));
    assert!(r.submit(&packet(u16::MAX, 1, b"b")).is_none());
    assert!(r.submit(&packet(0, 2, b"c")).is_none());

    let frame = r.submit(&packet(1, 0, b"d")).into_frame().unwrap();
    assert_eq!(frame.as_bytes(), b"abc");
    assert_eq!(r.stats().losses(), 0);
}

#[test]
fn test_longest_frame() {
    let mut r = PacketReassembler::new();
    let _ = r.submit(&packet(0, 0, &[0]));
    for fc in 1..=u8::MAX {
        assert!(r.submit(&packet(u16::from(fc), fc, &[fc])).is_none());
    }
    assert_eq!(r.expected_fragment_counter(), u8::MAX);

    // After 255 the counter comes back to 0, which starts a new frame.
    let frame = r.submit(&packet(256, 0, b"next")).into_frame().unwrap();
    assert_eq!(frame.len(), MAX_PACKETS_PER_FRAME);
    assert_eq!(frame.as_bytes()[255], 255);
}

#[test]
fn test_policies_diverge_on_frame_start_gap() {
    let stream = [
        packet(0, 0, b"A"),
        packet(1, 1, b"B"),
        packet(4, 0, b"C"),
        packet(5, 1, b"D"),
        packet(6, 0, b"E"),
    ];

    let mut strict = PacketReassembler::with_policy(ResyncPolicy::Strict);
    let strict_frames = frames_of(strict.events(&stream));
    assert!(strict_frames.is_empty());
    assert_eq!(strict.finish().unwrap().as_bytes(), b"E");

    let mut immediate = PacketReassembler::with_policy(ResyncPolicy::Immediate);
    let immediate_frames = frames_of(immediate.events(&stream));
    assert_eq!(immediate_frames, vec![b"CD".to_vec()]);
    assert_eq!(immediate.finish().unwrap().as_bytes(), b"E");
}

#[test]
fn test_stats_accounting() {
    let stream = [
        vec![0x00],
        packet(9, 2, b"?"),
        packet(10, 0, b"ab"),
        packet(11, 1, b"cd"),
        packet(12, 0, b"ef"),
        packet(13, 2, b"gh"),
        packet(14, 0, b"ij"),
        packet(20, 0, b"kl"),
    ];
    let mut r = PacketReassembler::new();
    let events: Vec<_> = r.events(&stream).collect();
    assert_eq!(events.len(), 3);

    let stats = *r.stats();
    assert_eq!(stats.packets, 8);
    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.premature, 1);
    assert_eq!(stats.fragment_losses, 1);
    assert_eq!(stats.sequence_losses, 1);
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.frame_bytes, 4);
    assert_eq!(stats.discarded_bytes, 4);
}

// ============================================================================
// Properties
// ============================================================================

fn frames_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..200), 1..20)
}

proptest! {
    #[test]
    fn prop_in_order_stream_is_lossless(
        frames in frames_strategy(),
        max_payload in 1usize..64,
        start in any::<u16>(),
    ) {
        let packets = packetize_all(&frames, max_payload, start);

        let mut r = PacketReassembler::new();
        let mut out = frames_of(r.events(&packets));

        // Every frame but the last is completed by its successor.
        prop_assert_eq!(out.len(), frames.len() - 1);
        out.push(r.finish().unwrap().into_inner());
        prop_assert_eq!(&out, &frames);
        prop_assert_eq!(r.stats().losses(), 0);
    }

    #[test]
    fn prop_dropped_packet_is_reported(
        frames in frames_strategy(),
        max_payload in 1usize..64,
        start in any::<u16>(),
        victim in any::<prop::sample::Index>(),
    ) {
        let mut packets = packetize_all(&frames, max_payload, start);
        prop_assume!(packets.len() >= 3);

        // Dropping the first packet only delays synchronization.
        let victim = 1 + victim.index(packets.len() - 2);
        packets.remove(victim);

        let mut r = PacketReassembler::new();
        let events: Vec<_> = r.events(&packets).collect();
        prop_assert_eq!(events.iter().filter(|e| e.loss().is_some()).count(), 1);

        // No emitted frame contains corrupted data.
        for frame in frames_of(events) {
            prop_assert!(frames.contains(&frame));
        }
    }

    #[test]
    fn prop_fragment_gap_detected(
        sequence in any::<u16>(),
        gap in 2u8..=255,
    ) {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(sequence, 0, b"a"));
        let event = r.submit(&packet(sequence.wrapping_add(1), gap, b"b"));

        prop_assert_eq!(
            event.loss().map(|l| l.cause),
            Some(ReassemblyError::FragmentLoss { expected: 1, actual: gap })
        );
        prop_assert!(!r.is_synchronized());
    }

    #[test]
    fn prop_sequence_gap_detected(
        sequence in any::<u16>(),
        skip in 2u16..=u16::MAX,
        fragment_counter in 0u8..=1,
    ) {
        let mut r = PacketReassembler::new();
        let _ = r.submit(&packet(sequence, 0, b"a"));
        let actual = sequence.wrapping_add(skip);
        let event = r.submit(&packet(actual, fragment_counter, b"b"));

        prop_assert_eq!(
            event.loss().map(|l| l.cause),
            Some(ReassemblyError::SequenceLoss {
                expected: sequence.wrapping_add(1),
                actual,
            })
        );
    }

    #[test]
    fn prop_arbitrary_input_never_panics(
        packets in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..64),
    ) {
        let mut r = PacketReassembler::new();
        for raw in &packets {
            let _ = r.submit(raw);
        }
        let _ = r.finish();
        prop_assert_eq!(r.stats().packets, packets.len() as u64);
    }
}
