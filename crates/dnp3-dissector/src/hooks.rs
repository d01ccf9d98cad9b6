//! One-way, synchronous hook emission — the hand-off point between the
//! core and the embedding application.

use bytes::Bytes;

use crate::app::{AppErrorKind, Fragment};
use crate::link::Frame;
use crate::transport::Segment;

/// One emission from the dissector. Delivered synchronously and in
/// arrival order: no cross-Context ordering guarantee, but strict
/// ordering within a single `(src,dst)` Context.
#[derive(Debug, Clone, PartialEq)]
pub enum DissectorEvent {
    LinkFrame { frame: Frame, raw: Bytes },
    TransportReject { src: u16, dst: u16 },
    TransportSegment { src: u16, dst: u16, segment: Segment },
    TransportPayload { src: u16, dst: u16, payload: Vec<u8> },
    AppFragment { src: u16, dst: u16, fragment: Fragment, raw: Bytes },
    AppError { src: u16, dst: u16, kind: AppErrorKind },
    AppReject { src: u16, dst: u16 },
}

/// Receives [`DissectorEvent`]s as the dissector emits them. Implemented
/// as a trait object rather than a raw function pointer since this is a
/// Rust library API, not an FFI plugin ABI.
pub trait HookSink {
    fn on_event(&mut self, event: DissectorEvent);
}

impl<F> HookSink for F
where
    F: FnMut(DissectorEvent),
{
    fn on_event(&mut self, event: DissectorEvent) {
        (self)(event)
    }
}

/// A [`HookSink`] that only records events, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink(pub Vec<DissectorEvent>);

#[cfg(test)]
impl HookSink for RecordingSink {
    fn on_event(&mut self, event: DissectorEvent) {
        self.0.push(event);
    }
}
