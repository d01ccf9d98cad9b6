//! Streaming, stateful DNP3 (IEEE 1815) wire dissector.
//!
//! Consumes a raw byte stream in which DNP3 link-layer frames are
//! embedded and emits structured [`DissectorEvent`]s for valid link
//! frames, transport segments, reassembled transport payloads, and
//! application fragments. Tolerates corruption between frames and
//! discards malformed transport series while preserving recovery — see
//! the crate's `DESIGN.md` for how each piece is grounded.
//!
//! ```
//! use dnp3_dissector::{Dissector, DissectorConfig, DissectorEvent};
//!
//! let mut events = Vec::new();
//! let mut dissector = Dissector::new(DissectorConfig::default(), |e: DissectorEvent| {
//!     events.push(e);
//! });
//! dissector.feed(&[]).unwrap();
//! dissector.finish();
//! ```

use bytes::Bytes;
use tracing::trace;

pub mod app;
mod context;
pub mod error;
mod hooks;
pub mod link;
mod pipeline;
pub mod tfsm;
pub mod token;
pub mod transport;

pub use app::{AppErrorKind, AppOutcome, Fragment, ObjectHeader};
pub use context::{Context, DroppedBytes};
pub use error::DissectError;
pub use hooks::{DissectorEvent, HookSink};
pub use link::{Frame, FunctionCode};
pub use tfsm::{MatchKind, TransportMachine};
pub use token::Token;
pub use transport::Segment;

use context::ContextTable;
use link::{next_frame, ResyncOutcome};

/// Tunables fixed for the lifetime of a [`Dissector`] instance.
///
/// `ctxmax` and `buflen` are tunable at construction time, then fixed
/// for the lifetime of the instance.
#[derive(Debug, Clone, Copy)]
pub struct DissectorConfig {
    /// Maximum number of live `(src,dst)` Contexts. Recommended: 16.
    pub ctxmax: usize,
    /// Per-Context raw-frame accumulation buffer size, in bytes.
    /// Recommended: at least 4 KiB.
    pub buflen: usize,
}

impl Default for DissectorConfig {
    fn default() -> Self {
        Self { ctxmax: 16, buflen: 4096 }
    }
}

/// A single-threaded, cooperative dissector instance. Owns its rolling
/// input buffer, its Context table, and the hook sink events are
/// delivered to. Not `Send`/`Sync`: concurrent calls against the same
/// instance are undefined.
pub struct Dissector {
    config: DissectorConfig,
    table: ContextTable,
    sink: Box<dyn HookSink>,
    inbuf: Vec<u8>,
    frames_dissected: u64,
    bytes_resynced: u64,
}

impl Dissector {
    pub fn new(config: DissectorConfig, sink: impl HookSink + 'static) -> Self {
        let table = ContextTable::new(config.ctxmax, config.buflen);
        Self {
            config,
            table,
            sink: Box::new(sink),
            inbuf: Vec::with_capacity(config.buflen),
            frames_dissected: 0,
            bytes_resynced: 0,
        }
    }

    /// Feed newly arrived bytes. Repeatedly resynchronizes on the rolling
    /// buffer, dispatching every frame it finds through the dissection
    /// pipeline, then compacts any unconsumed tail back to the buffer
    /// head. Never panics on malformed input; the only error path is an
    /// allocation failure while growing the rolling buffer.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), DissectError> {
        self.inbuf.try_reserve(bytes.len()).map_err(|_| DissectError::Alloc)?;
        self.inbuf.extend_from_slice(bytes);

        loop {
            match next_frame(&self.inbuf) {
                ResyncOutcome::Frame { frame, consumed, skipped } => {
                    if skipped > 0 {
                        trace!(n = skipped, "skipped junk bytes before a frame");
                        self.bytes_resynced += skipped as u64;
                    }
                    let raw = Bytes::copy_from_slice(&self.inbuf[skipped..consumed]);
                    self.inbuf.drain(..consumed);
                    self.frames_dissected += 1;
                    self.process_link_frame(frame, raw);
                }
                ResyncOutcome::NoMatch { consumed } => {
                    if consumed > 0 {
                        trace!(n = consumed, "skipped junk bytes, no frame found yet");
                        self.bytes_resynced += consumed as u64;
                    }
                    self.inbuf.drain(..consumed);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Tear down the instance: drop all Contexts, abandoning any
    /// in-flight transport parses without emitting partial results. The
    /// only cancellation path this crate exposes.
    pub fn finish(&mut self) {
        self.table.clear();
        self.inbuf.clear();
    }

    /// Total live Contexts. Exposed for the invariant tests in
    /// `tests/scenarios.rs` (`total live Contexts <= ctxmax`).
    pub fn live_contexts(&self) -> usize {
        self.table.len()
    }

    pub fn config(&self) -> DissectorConfig {
        self.config
    }

    /// Total link frames successfully dissected since construction.
    pub fn frames_dissected(&self) -> u64 {
        self.frames_dissected
    }

    /// Total bytes discarded while resynchronizing on corrupt/junk input
    /// since construction. Local to this instance; there is no global
    /// metrics registry to export it to.
    pub fn bytes_resynced(&self) -> u64 {
        self.bytes_resynced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crc::{Crc, CRC_16_DNP};

    const CRC_DNP: Crc<u16> = Crc::<u16>::new(&CRC_16_DNP);

    fn link_frame(dest: u16, src: u16, transport_payload: &[u8]) -> Vec<u8> {
        let control = 0xC4u8;
        let len_byte = (5 + transport_payload.len()) as u8;
        let mut out = vec![0x05, 0x64, len_byte, control];
        out.extend_from_slice(&dest.to_le_bytes());
        out.extend_from_slice(&src.to_le_bytes());
        let header_crc = CRC_DNP.checksum(&out[2..8]);
        out.extend_from_slice(&header_crc.to_le_bytes());
        for chunk in transport_payload.chunks(16) {
            out.extend_from_slice(chunk);
            out.extend_from_slice(&CRC_DNP.checksum(chunk).to_le_bytes());
        }
        out
    }

    #[test]
    fn counters_track_frames_and_skipped_junk() {
        let mut d = Dissector::new(DissectorConfig::default(), |_| {});
        let mut bytes = vec![0xAA, 0xBB, 0xCC];
        bytes.extend(link_frame(2, 1, &[0xC7, 0x01]));
        d.feed(&bytes).unwrap();

        assert_eq!(d.frames_dissected(), 1);
        assert_eq!(d.bytes_resynced(), 3);
    }

    #[test]
    fn fresh_instance_has_zeroed_counters() {
        let d = Dissector::new(DissectorConfig::default(), |_| {});
        assert_eq!(d.frames_dissected(), 0);
        assert_eq!(d.bytes_resynced(), 0);
    }

    #[test]
    fn link_frame_hook_raw_bytes_exclude_skipped_junk_prefix() {
        let frame = link_frame(2, 1, &[0xC7, 0x01]);
        let mut bytes = vec![0xAA, 0xBB, 0xCC];
        bytes.extend(frame.clone());

        let mut events = Vec::new();
        let mut d = Dissector::new(DissectorConfig::default(), |e: DissectorEvent| events.push(e));
        d.feed(&bytes).unwrap();

        match &events[0] {
            DissectorEvent::LinkFrame { raw, .. } => assert_eq!(raw.as_ref(), frame.as_slice()),
            other => panic!("expected a LinkFrame event, got {other:?}"),
        }
    }
}
