use thiserror::Error;

/// Fatal errors surfaced to the embedding application.
///
/// Every other failure mode in this crate (stream noise, CRC errors,
/// malformed series, unsupported function codes, capacity events) is
/// recovered locally and reported through a hook or a log line, never
/// through this type. `DissectError` exists for the one failure that is
/// genuinely unrecoverable: running out of memory while growing an
/// internal buffer.
#[derive(Debug, Error)]
pub enum DissectError {
    #[error("allocation failure while buffering input")]
    Alloc,
}
