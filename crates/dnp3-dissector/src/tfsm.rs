//! Incremental parser over the token alphabet that recognizes valid
//! segment series and reassembles their payloads.
//!
//! Recognizes the regular language:
//!
//! ```text
//! ( A+ [+=]* ( Z | [^AZ+=] ) | [^A] )*
//! ```
//!
//! Written as an explicit two-state walker rather than a compiled grammar
//! with self-reference, so there is no recursive/cyclic grammar to worry
//! about in the first place — see DESIGN.md.
//!
//! Reassembly is accumulated incrementally as tokens are consumed (on `A`
//! the accumulator is reset to that segment's payload; on `+` the next
//! segment's payload is appended; `=` contributes nothing) rather than
//! reconstructed at match time from a table of past segments, because a
//! series can span many separate `feed` calls — see DESIGN.md.

use crate::token::{TaggedToken, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No `A` seen yet since the last terminator.
    Idle,
    /// Inside an `A+ [+=]*` run, awaiting a terminator.
    InSeries,
}

/// What a terminated top-level alternative produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    /// The `A+ [+=]* Z` branch matched; carries the reassembled payload.
    Valid(Vec<u8>),
    /// Either `A+ [+=]* [^AZ+=]` (aborted series) or the bare `[^A]`
    /// branch matched. Both are discarded by the pipeline.
    Aborted,
}

/// In-flight incremental parse state for one series. Dropping this in
/// place (reassigning `Context::tfun` to `None`) abandons the parse
/// without emitting anything.
#[derive(Debug, Default)]
pub struct TransportMachine {
    state_in_series: bool,
    acc: Option<Vec<u8>>,
}

impl TransportMachine {
    pub fn new() -> Self {
        Self { state_in_series: false, acc: None }
    }

    fn state(&self) -> State {
        if self.state_in_series { State::InSeries } else { State::Idle }
    }

    /// Feed as many tokens as possible from `tokens`, starting at index 0.
    /// Returns `Some((consumed, kind))` the moment a top-level alternative
    /// terminates, where `consumed` is the number of tokens (starting at
    /// index 0) that belonged to that alternative. Returns `None` if the
    /// whole slice was consumed with no alternative yet decided (more
    /// tokens are needed to decide).
    pub fn feed(&mut self, tokens: &[TaggedToken]) -> Option<(usize, MatchKind)> {
        for (i, (tok, payload)) in tokens.iter().enumerate() {
            match (self.state(), tok) {
                (_, Token::A) => {
                    self.state_in_series = true;
                    self.acc = Some(payload.clone());
                }
                (State::InSeries, Token::Plus) => {
                    if let Some(acc) = &mut self.acc {
                        acc.extend_from_slice(payload);
                    }
                }
                (State::InSeries, Token::Eq) => {
                    // byte-exact duplicate: contributes nothing
                }
                (State::InSeries, Token::Z) => {
                    let out = self.acc.take().unwrap_or_default();
                    self.state_in_series = false;
                    return Some((i + 1, MatchKind::Valid(out)));
                }
                (State::InSeries, Token::Bang) | (State::InSeries, Token::Underscore) => {
                    self.acc = None;
                    self.state_in_series = false;
                    return Some((i + 1, MatchKind::Aborted));
                }
                (State::Idle, _) => {
                    // stray continuation/duplicate/terminator with no
                    // preceding FIR: the bare `[^A]` branch, consumed and
                    // ignored.
                    return Some((i + 1, MatchKind::Aborted));
                }
            }
        }
        None
    }
}
