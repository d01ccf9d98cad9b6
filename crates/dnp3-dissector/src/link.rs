//! Link-layer frame grammar and the frame resynchronizer.
//!
//! Header layout (IEEE 1815 data link frame):
//! `[0x05][0x64][Length][Control][DestL][DestH][SrcL][SrcH][CRC_L][CRC_H]`
//! followed by the user-data body in 16-byte blocks, each followed by its
//! own 2-byte CRC. Structured as a standalone `next_frame` operation
//! rather than a `tokio_util::codec::Decoder` impl, since this crate
//! dissects a passive copy of the stream and never drives an executor.

use bytes::Bytes;
use crc::{Crc, CRC_16_DNP};

const CRC_DNP: Crc<u16> = Crc::<u16>::new(&CRC_16_DNP);

const SYNC_0: u8 = 0x05;
const SYNC_1: u8 = 0x64;
const HEADER_LEN: usize = 10;
const BLOCK_LEN: usize = 16;

/// Data-link function code, decoded from the low nibble of the control byte.
///
/// Only [`FunctionCode::UnconfirmedUserData`] and
/// [`FunctionCode::ConfirmedUserData`] are acted on by the dissection
/// pipeline; the rest are recognized so the pipeline can log them instead
/// of silently discarding an unmodeled byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ResetLinkStates,
    TestLinkStates,
    ConfirmedUserData,
    UnconfirmedUserData,
    RequestLinkStatus,
    Ack,
    Nack,
    LinkStatus,
    NotSupported,
    Unknown(u8),
}

impl FunctionCode {
    fn from_control(control: u8) -> Self {
        let prm = control & 0x40 != 0;
        let code = control & 0x0F;
        if prm {
            match code {
                0 => FunctionCode::ResetLinkStates,
                2 => FunctionCode::TestLinkStates,
                3 => FunctionCode::ConfirmedUserData,
                4 => FunctionCode::UnconfirmedUserData,
                9 => FunctionCode::RequestLinkStatus,
                other => FunctionCode::Unknown(other),
            }
        } else {
            match code {
                0 => FunctionCode::Ack,
                1 => FunctionCode::Nack,
                11 => FunctionCode::LinkStatus,
                15 => FunctionCode::NotSupported,
                other => FunctionCode::Unknown(other),
            }
        }
    }
}

/// A decoded link-layer frame. `payload` is `None` iff the per-block CRCs
/// failed to validate — the header (and thus the sync/length framing) was
/// still trustworthy, only the body is suspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub func: FunctionCode,
    pub source: u16,
    pub destination: u16,
    pub payload: Option<Bytes>,
    pub len: usize,
}

enum FrameAttempt {
    Complete { frame: Frame, frame_len: usize },
    Incomplete,
    Invalid,
}

/// Outcome of scanning for the next frame at the head of a byte slice.
pub enum ResyncOutcome {
    /// A frame was found; `consumed` bytes (including any skipped prefix)
    /// should be dropped from the caller's buffer. `skipped` is the prefix
    /// portion of `consumed` that had to be discarded to reach the frame,
    /// for the caller's resync-bytes diagnostic.
    Frame { frame: Frame, consumed: usize, skipped: usize },
    /// No frame could be confirmed in the supplied slice. `consumed` bytes
    /// of confirmed junk should still be dropped; the remainder needs more
    /// data before another attempt can be made.
    NoMatch { consumed: usize },
}

fn try_parse_at(buf: &[u8]) -> FrameAttempt {
    if buf.len() < HEADER_LEN {
        return FrameAttempt::Incomplete;
    }
    if buf[0] != SYNC_0 || buf[1] != SYNC_1 {
        return FrameAttempt::Invalid;
    }

    let header_crc_calc = CRC_DNP.checksum(&buf[2..8]);
    let header_crc_read = u16::from_le_bytes([buf[8], buf[9]]);
    if header_crc_calc != header_crc_read {
        return FrameAttempt::Invalid;
    }

    let length = buf[2] as usize;
    if length < 5 {
        return FrameAttempt::Invalid;
    }

    let control = buf[3];
    let destination = u16::from_le_bytes([buf[4], buf[5]]);
    let source = u16::from_le_bytes([buf[6], buf[7]]);

    let body_len = length - 5;
    let full_blocks = body_len / BLOCK_LEN;
    let partial = body_len % BLOCK_LEN;
    let crc_bytes = full_blocks * 2 + if partial > 0 { 2 } else { 0 };
    let frame_len = HEADER_LEN + body_len + crc_bytes;

    if buf.len() < frame_len {
        return FrameAttempt::Incomplete;
    }

    let mut payload = Vec::with_capacity(body_len);
    let mut remaining = body_len;
    let mut cursor = HEADER_LEN;
    let mut crc_ok = true;
    while remaining > 0 {
        let chunk_size = remaining.min(BLOCK_LEN);
        let chunk = &buf[cursor..cursor + chunk_size];
        cursor += chunk_size;
        let crc_read = u16::from_le_bytes([buf[cursor], buf[cursor + 1]]);
        cursor += 2;
        if CRC_DNP.checksum(chunk) != crc_read {
            crc_ok = false;
        }
        payload.extend_from_slice(chunk);
        remaining -= chunk_size;
    }

    let frame = Frame {
        func: FunctionCode::from_control(control),
        source,
        destination,
        payload: if crc_ok { Some(Bytes::from(payload)) } else { None },
        len: body_len,
    };

    FrameAttempt::Complete { frame, frame_len }
}

/// Scan `buf` for the next valid link frame, skipping one byte at a time
/// over anything that doesn't parse. Never consumes more bytes than are
/// needed to confirm either a match or the need for more input.
pub fn next_frame(buf: &[u8]) -> ResyncOutcome {
    let mut offset = 0;
    loop {
        match try_parse_at(&buf[offset..]) {
            FrameAttempt::Complete { frame, frame_len } => {
                return ResyncOutcome::Frame {
                    frame,
                    consumed: offset + frame_len,
                    skipped: offset,
                };
            }
            FrameAttempt::Incomplete => {
                return ResyncOutcome::NoMatch { consumed: offset };
            }
            FrameAttempt::Invalid => {
                offset += 1;
                if offset >= buf.len() {
                    return ResyncOutcome::NoMatch { consumed: offset };
                }
            }
        }
    }
}
