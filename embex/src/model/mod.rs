//! Extraction models shared by every container format. Each model turns a
//! container's bytes into a lazy sequence of non-overlapping byte ranges.

pub mod dual_magic;
pub mod offset_table;
pub mod repeating_magic;

use crate::{container::CandidateRange, scan::MagicPattern};

/// Validated range for the match at `match_index`, or the reason the match
/// was rejected
fn sized_match(
    magic: &MagicPattern,
    buf: &[u8],
    match_index: usize,
) -> Result<CandidateRange, &'static str> {
    let size = magic
        .read_size(buf, match_index)
        .ok_or("size field past end of buffer")?;
    if size == 0 {
        return Err("zero size");
    }
    CandidateRange::new(match_index, size as usize, buf.len())
        .ok_or("range past end of buffer")
}
