//! Per-connection reassembly state and the bounded, LRU-recycled table
//! that owns it.

use std::collections::VecDeque;

use crate::tfsm::TransportMachine;
use crate::transport::Segment;

/// Per-(src,dst) reassembly state. Invariants: `n <= buflen`,
/// `tfun_pos == 0` whenever `tfun` is `None`, and `last_segment`'s
/// payload is always owned by the Context.
#[derive(Debug)]
pub struct Context {
    pub src: u16,
    pub dst: u16,
    pub last_segment: Option<Segment>,
    pub tfun: Option<TransportMachine>,
    pub tfun_pos: u64,
    buf: Vec<u8>,
    n: usize,
}

impl Context {
    fn new(src: u16, dst: u16, buflen: usize) -> Self {
        Self {
            src,
            dst,
            last_segment: None,
            tfun: None,
            tfun_pos: 0,
            buf: vec![0u8; buflen],
            n: 0,
        }
    }

    /// Current fill of the raw-frame accumulation buffer.
    pub fn n(&self) -> usize {
        self.n
    }

    /// The raw bytes accumulated for the fragment currently in progress.
    pub fn raw(&self) -> &[u8] {
        &self.buf[..self.n]
    }

    /// Append `bytes` to the raw buffer if there is room. Returns `false`
    /// (and leaves the buffer untouched) on overflow — the caller logs
    /// and drops this frame's bytes rather than resizing.
    pub fn try_append_raw(&mut self, bytes: &[u8]) -> bool {
        if self.n + bytes.len() > self.buf.len() {
            return false;
        }
        self.buf[self.n..self.n + bytes.len()].copy_from_slice(bytes);
        self.n += bytes.len();
        true
    }

    /// Flush the raw buffer. Called on every series terminator, valid or
    /// invalid.
    pub fn reset_buf(&mut self) {
        self.n = 0;
    }

    fn reset_for(&mut self, src: u16, dst: u16) {
        self.src = src;
        self.dst = dst;
        self.last_segment = None;
        self.tfun = None;
        self.tfun_pos = 0;
        self.n = 0;
    }
}

/// A Context was recycled while it still held unflushed raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedBytes {
    pub src: u16,
    pub dst: u16,
    pub n: usize,
}

/// MRU-ordered collection mapping `(src,dst) -> Context`, capped at
/// `ctxmax` entries. Ordering discipline: MRU at the front, LRU at the
/// back. The source's singly-linked list with pointer-to-pointer
/// unlinking is a C idiom for O(1) removal without parent pointers; with
/// `ctxmax` in the tens, a `VecDeque` reordered by removal/reinsertion is
/// the idiomatic (and still plenty fast) Rust rendition — see DESIGN.md.
pub struct ContextTable {
    ctxmax: usize,
    buflen: usize,
    entries: VecDeque<Context>,
}

impl ContextTable {
    pub fn new(ctxmax: usize, buflen: usize) -> Self {
        Self { ctxmax, buflen, entries: VecDeque::with_capacity(ctxmax) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Find or create the Context for `(src,dst)`, promoting it to MRU.
    /// Returns `None` only when `ctxmax == 0` (the table is disabled).
    pub fn lookup_or_create(
        &mut self,
        src: u16,
        dst: u16,
    ) -> Option<(&mut Context, Option<DroppedBytes>)> {
        if self.ctxmax == 0 {
            return None;
        }

        if let Some(pos) = self.entries.iter().position(|c| c.src == src && c.dst == dst) {
            let ctx = self.entries.remove(pos).expect("position just found");
            self.entries.push_front(ctx);
            return Some((&mut self.entries[0], None));
        }

        if self.entries.len() < self.ctxmax {
            self.entries.push_front(Context::new(src, dst, self.buflen));
            return Some((&mut self.entries[0], None));
        }

        let mut reused = self.entries.pop_back().expect("table is at capacity");
        let dropped = if reused.n() > 0 {
            Some(DroppedBytes { src: reused.src, dst: reused.dst, n: reused.n() })
        } else {
            None
        };
        reused.reset_for(src, dst);
        self.entries.push_front(reused);
        Some((&mut self.entries[0], dropped))
    }

    /// Drop all Contexts, abandoning any in-flight transport parses
    /// without emitting partial results. Called at teardown.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
