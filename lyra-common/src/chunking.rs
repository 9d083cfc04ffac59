//! Chunk scheduling
//!
//! Splits an ordered line list into fixed-size batches. The last batch may be shorter.

use crate::model::{Chunk, LyricLine};
use std::ops::Range;

/// Assign global indices to raw line texts
pub fn index_lines<I, S>(lines: I) -> Vec<LyricLine>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    lines
        .into_iter()
        .enumerate()
        .map(|(index, text)| LyricLine::new(index, text))
        .collect()
}

/// Partition lines into chunks of `size`, preserving order
///
/// A size of zero is treated as one.
pub fn schedule(lines: &[LyricLine], size: usize) -> Vec<Chunk> {
    let size = size.max(1);

    lines
        .chunks(size)
        .enumerate()
        .map(|(index, batch)| Chunk {
            index,
            start_offset: index * size,
            lines: batch.to_vec(),
        })
        .collect()
}

/// Slots a chunk event may write in an array of `len` elements
///
/// Anything past `len` is clipped; a start beyond the end yields an empty range.
pub fn chunk_range(chunk_index: usize, size: usize, data_len: usize, len: usize) -> Range<usize> {
    let start = chunk_index.saturating_mul(size.max(1));
    let end = start.saturating_add(data_len).min(len);
    start.min(end)..end
}
