//! Maps each incoming transport segment to one or two abstract tokens for
//! the transport state machine ([`crate::tfsm`]).

use crate::transport::Segment;

/// Alphabet consumed by the transport state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// First-in-series.
    A,
    /// Byte-exact retransmission of the previous segment.
    Eq,
    /// In-order continuation.
    Plus,
    /// Gap or out-of-order segment.
    Bang,
    /// Continuation with no prior segment to compare against.
    Underscore,
    /// Final-in-series.
    Z,
}

/// A token paired with the payload bytes of the segment that produced it.
/// `Z` always carries an empty slice — it contributes no payload beyond
/// what the segment's first token (`A`/`+`/`=`/`!`/`_`) already carried.
pub type TaggedToken = (Token, Vec<u8>);

/// Is `seg` a link-layer retransmission of `last`? Compares `fin`, `seq`,
/// and the byte-exact payload, but deliberately *not* `fir`.
///
/// `Segment`'s derived `PartialEq` treats `fir` as significant, which is
/// right for the data model generally. But this duplicate check only
/// ever runs once `seg.fir` has already been found unset (the `A` branch
/// above always wins first) — so it is comparing a continuation segment
/// against whatever `last` was, and `last` may itself have been the
/// series' original `fir`-set segment. A byte-identical retransmit of
/// that very first segment legitimately arrives with `fir` cleared on
/// retry in some outstation implementations. Folding `fir` into this
/// comparison would misclassify that retransmit as a sequence gap (`!`)
/// instead of a duplicate (`=`), so the duplicate check ignores it.
fn is_retransmission(seg: &Segment, last: &Segment) -> bool {
    seg.fin == last.fin && seg.seq == last.seq && seg.payload == last.payload
}

/// Encode `seg` into one or two tagged tokens, comparing against `last`
/// (the previous segment on this connection, if any).
pub fn encode(seg: &Segment, last: Option<&Segment>) -> Vec<TaggedToken> {
    let first = if seg.fir {
        Token::A
    } else {
        match last {
            None => Token::Underscore,
            Some(l) if is_retransmission(seg, l) => Token::Eq,
            Some(l) if seg.seq == (l.seq + 1) % 64 => Token::Plus,
            Some(_) => Token::Bang,
        }
    };

    let mut tokens = Vec::with_capacity(2);
    tokens.push((first, seg.payload.clone()));
    if seg.fin {
        tokens.push((Token::Z, Vec::new()));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(fir: bool, fin: bool, seq: u8, payload: &[u8]) -> Segment {
        Segment { fir, fin, seq, payload: payload.to_vec() }
    }

    #[test]
    fn fir_always_yields_a_even_with_no_history() {
        let tokens = encode(&seg(true, false, 0, b"x"), None);
        assert_eq!(tokens[0].0, Token::A);
    }

    #[test]
    fn no_fir_no_history_yields_underscore() {
        let tokens = encode(&seg(false, false, 3, b"x"), None);
        assert_eq!(tokens[0].0, Token::Underscore);
    }

    #[test]
    fn byte_exact_repeat_yields_eq() {
        let last = seg(false, false, 5, b"dup");
        let tokens = encode(&seg(false, false, 5, b"dup"), Some(&last));
        assert_eq!(tokens[0].0, Token::Eq);
    }

    #[test]
    fn retransmit_of_the_fir_segment_with_fir_cleared_is_still_eq() {
        // The retransmitted copy of the series' first segment carries
        // fir=0, but matches `last` on fin/seq/payload.
        let last = seg(true, false, 5, b"A");
        let tokens = encode(&seg(false, false, 5, b"A"), Some(&last));
        assert_eq!(tokens[0].0, Token::Eq);
    }

    #[test]
    fn sequential_seq_yields_plus() {
        let last = seg(true, false, 5, b"a");
        let tokens = encode(&seg(false, false, 6, b"b"), Some(&last));
        assert_eq!(tokens[0].0, Token::Plus);
    }

    #[test]
    fn sequence_wraps_at_64() {
        let last = seg(true, false, 63, b"a");
        let tokens = encode(&seg(false, false, 0, b"b"), Some(&last));
        assert_eq!(tokens[0].0, Token::Plus);
    }

    #[test]
    fn gap_yields_bang() {
        let last = seg(true, false, 0, b"a");
        let tokens = encode(&seg(false, false, 4, b"b"), Some(&last));
        assert_eq!(tokens[0].0, Token::Bang);
    }

    #[test]
    fn fin_appends_trailing_z() {
        let tokens = encode(&seg(true, true, 0, b"x"), None);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].0, Token::Z);
        assert!(tokens[1].1.is_empty());
    }

    #[test]
    fn non_fin_segment_has_single_token() {
        let tokens = encode(&seg(true, false, 0, b"x"), None);
        assert_eq!(tokens.len(), 1);
    }
}
