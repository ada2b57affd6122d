//! Native stack headroom for the recursive parser and evaluator

/// Remaining stack below which a recursive step switches to a fresh segment
const RED_ZONE: usize = 256 * 1024;
/// Size of each fresh segment
const SEGMENT_SIZE: usize = 4 * 1024 * 1024;

/// Run `f`, first moving to a new stack segment if the current one is
/// nearly exhausted
#[inline]
pub(crate) fn with_headroom<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}
