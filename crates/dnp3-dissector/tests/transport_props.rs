//! Property tests for the token encoder and transport state machine,
//! quantifying the reassembly Laws over arbitrary segment sequences.

use proptest::prelude::*;

use dnp3_dissector::token::encode;
use dnp3_dissector::{MatchKind, Segment, TransportMachine};

fn arb_payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

fn arb_segment(fir: bool, fin: bool) -> impl Strategy<Value = Segment> {
    (any::<u8>(), arb_payload())
        .prop_map(move |(seq, payload)| Segment { fir, fin, seq: seq & 0x3F, payload })
}

fn feed_all(m: &mut TransportMachine, tokens: &[dnp3_dissector::token::TaggedToken]) -> Vec<MatchKind> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < tokens.len() {
        match m.feed(&tokens[offset..]) {
            Some((consumed, kind)) => {
                out.push(kind);
                offset += consumed;
            }
            None => break,
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // A single FIR+FIN segment always reassembles to exactly its own payload,
    // regardless of what its sequence number happens to be.
    #[test]
    fn prop_single_segment_roundtrips(seg in arb_segment(true, true)) {
        let tokens = encode(&seg, None);
        let mut m = TransportMachine::new();
        let matches = feed_all(&mut m, &tokens);
        prop_assert_eq!(matches, vec![MatchKind::Valid(seg.payload.clone())]);
    }

    // Feeding an exact duplicate of the most recent segment never changes
    // the eventual reassembled payload (idempotence of retransmission).
    #[test]
    fn prop_duplicate_segment_is_idempotent(
        first in arb_payload(),
        second in arb_payload(),
    ) {
        let seg1 = Segment { fir: true, fin: false, seq: 0, payload: first.clone() };
        let dup = seg1.clone();
        let seg2 = Segment { fir: false, fin: true, seq: 1, payload: second.clone() };

        let mut m = TransportMachine::new();
        let mut last = None;
        let mut matches = Vec::new();
        for seg in [&seg1, &dup, &seg2] {
            let tokens = encode(seg, last);
            matches.extend(feed_all(&mut m, &tokens));
            last = Some(seg);
        }

        let mut expected = first;
        expected.extend(second);
        prop_assert_eq!(matches, vec![MatchKind::Valid(expected)]);
    }

    // A non-sequential jump between two non-FIR segments always aborts the
    // series (never silently produces a reassembled payload).
    #[test]
    fn prop_sequence_gap_always_aborts(
        first in arb_payload(),
        second in arb_payload(),
        gap in 2u8..60,
    ) {
        let seg1 = Segment { fir: true, fin: false, seq: 0, payload: first };
        let seg2 = Segment { fir: false, fin: true, seq: gap, payload: second };

        let mut m = TransportMachine::new();
        let t1 = encode(&seg1, None);
        let mut matches = feed_all(&mut m, &t1);
        let t2 = encode(&seg2, Some(&seg1));
        matches.extend(feed_all(&mut m, &t2));

        prop_assert!(!matches.iter().any(|k| matches!(k, MatchKind::Valid(_))));
    }

    // Splitting the same token stream at every boundary yields the same
    // sequence of (kind) results as feeding it whole.
    #[test]
    fn prop_chunk_boundary_independence(
        segs in prop::collection::vec(arb_segment(false, false), 1..6),
        split_at in 0usize..6,
    ) {
        let mut tokens = Vec::new();
        let mut last: Option<Segment> = None;
        for (i, seg) in segs.iter().enumerate() {
            let mut seg = seg.clone();
            if i == 0 {
                seg.fir = true;
            }
            if i + 1 == segs.len() {
                seg.fin = true;
            }
            tokens.extend(encode(&seg, last.as_ref()));
            last = Some(seg);
        }

        let mut whole = TransportMachine::new();
        let whole_matches = feed_all(&mut whole, &tokens);

        let split = split_at.min(tokens.len());
        let mut parted = TransportMachine::new();
        let mut parted_matches = feed_all(&mut parted, &tokens[..split]);
        parted_matches.extend(feed_all(&mut parted, &tokens[split..]));

        prop_assert_eq!(whole_matches, parted_matches);
    }
}
