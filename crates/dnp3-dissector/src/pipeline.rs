//! Orchestrator: routes frames → contexts → transport state machine →
//! application parser, emitting hook events in arrival order.
//!
//! Split out of `lib.rs` so the public API surface
//! (`Dissector::new`/`feed`/`finish`) stays small and this file can be
//! read as "what happens to one frame" end to end.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::app::{parse_app_message, AppOutcome};
use crate::hooks::DissectorEvent;
use crate::link::{Frame, FunctionCode};
use crate::tfsm::{MatchKind, TransportMachine};
use crate::token;
use crate::transport::{parse_transport_segment, Segment};
use crate::Dissector;

impl Dissector {
    pub(crate) fn process_link_frame(&mut self, frame: Frame, raw: Bytes) {
        self.sink.on_event(DissectorEvent::LinkFrame { frame: frame.clone(), raw: raw.clone() });

        match frame.func {
            FunctionCode::UnconfirmedUserData => {
                let Some(payload) = frame.payload.as_deref() else {
                    debug!(src = frame.source, dst = frame.destination, "frame CRC error, no payload");
                    return;
                };

                let Some((ctx, dropped)) = self.table.lookup_or_create(frame.source, frame.destination)
                else {
                    warn!(src = frame.source, dst = frame.destination, "context table disabled, dropping frame");
                    return;
                };
                if let Some(d) = dropped {
                    warn!(src = d.src, dst = d.dst, n = d.n, "context recycled with pending bytes");
                }

                match parse_transport_segment(payload) {
                    Err(_) => {
                        debug!(src = frame.source, dst = frame.destination, "transport segment parse rejected");
                        self.sink.on_event(DissectorEvent::TransportReject {
                            src: frame.source,
                            dst: frame.destination,
                        });
                    }
                    Ok(segment) => {
                        if !ctx.try_append_raw(&raw) {
                            warn!(
                                src = frame.source,
                                dst = frame.destination,
                                "per-context raw buffer overflow, dropping this frame's bytes"
                            );
                        }
                        self.process_transport_segment(frame.source, frame.destination, segment);
                    }
                }
            }
            FunctionCode::ConfirmedUserData => {
                warn!(src = frame.source, dst = frame.destination, "CONFIRMED_USER_DATA not supported");
            }
            FunctionCode::Unknown(code) => {
                trace!(src = frame.source, dst = frame.destination, code, "unrecognized link function code");
            }
            other => {
                debug!(src = frame.source, dst = frame.destination, func = ?other, "ignoring recognized link function code");
            }
        }
    }

    fn process_transport_segment(&mut self, src: u16, dst: u16, segment: Segment) {
        self.sink.on_event(DissectorEvent::TransportSegment {
            src,
            dst,
            segment: segment.clone(),
        });

        // Every match resolved while driving the token stream is collected
        // here first; `process_transport_payload` is only called once the
        // Context borrow below has ended, since it needs its own `&mut
        // self.table` borrow. Matches are still handed off in the order
        // they were resolved, so hook ordering is unaffected.
        let mut matches = Vec::new();
        {
            let Some((ctx, _)) = self.table.lookup_or_create(src, dst) else {
                return;
            };

            let tokens = token::encode(&segment, ctx.last_segment.as_ref());
            ctx.last_segment = Some(segment);

            let mut offset = 0usize;
            while offset < tokens.len() {
                let machine = ctx.tfun.get_or_insert_with(TransportMachine::new);
                match machine.feed(&tokens[offset..]) {
                    Some((consumed, kind)) => {
                        // Valid matches still need ctx.raw() downstream in
                        // process_transport_payload, so only the raw buffer
                        // of a discarded (Aborted) series is flushed here;
                        // a Valid match's buffer is flushed there, after the
                        // app_fragment hook has read it.
                        if matches!(kind, MatchKind::Aborted) {
                            ctx.reset_buf();
                        }
                        // tfun is cleared on every match, so tfun_pos must
                        // go back to 0 with it (tfun absent => tfun_pos = 0).
                        ctx.tfun = None;
                        ctx.tfun_pos = 0;
                        offset += consumed;
                        matches.push(kind);
                    }
                    None => {
                        ctx.tfun_pos += (tokens.len() - offset) as u64;
                        offset = tokens.len();
                    }
                }
            }
        }

        for kind in matches {
            if let MatchKind::Valid(payload) = kind {
                self.process_transport_payload(src, dst, payload);
            }
        }
    }

    fn process_transport_payload(&mut self, src: u16, dst: u16, payload: Vec<u8>) {
        self.sink.on_event(DissectorEvent::TransportPayload { src, dst, payload: payload.clone() });

        match parse_app_message(&payload) {
            AppOutcome::Fragment(fragment) => {
                let raw = self
                    .table
                    .lookup_or_create(src, dst)
                    .map(|(ctx, _)| Bytes::copy_from_slice(ctx.raw()))
                    .unwrap_or_default();
                self.sink.on_event(DissectorEvent::AppFragment { src, dst, fragment, raw });
            }
            AppOutcome::Error(kind) => {
                warn!(src, dst, ?kind, "application parser reported an error token");
                self.sink.on_event(DissectorEvent::AppError { src, dst, kind });
            }
            AppOutcome::Reject => {
                debug!(src, dst, "application parser failed outright");
                self.sink.on_event(DissectorEvent::AppReject { src, dst });
            }
        }

        if let Some((ctx, _)) = self.table.lookup_or_create(src, dst) {
            ctx.reset_buf();
        }
    }
}
