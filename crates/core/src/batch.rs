//! Batch partitioning under a parallelism cap.

use std::ops::Range;

use crate::error::CoreError;

/// Split `[start, end)` into contiguous half-open batches.
///
/// Batches hold `batch_size` tiles (the last one may be shorter). When that
/// would produce more than `max_parallelism` batches, the batch size grows
/// to `ceil(len / max_parallelism)` so the fan-out stays within the cap.
pub fn plan_batches(
    start: u32,
    end: u32,
    batch_size: u32,
    max_parallelism: u32,
) -> Result<Vec<Range<u32>>, CoreError> {
    if batch_size == 0 {
        return Err(CoreError::Validation("batchSize must be at least 1".to_string()));
    }
    if max_parallelism == 0 {
        return Err(CoreError::Validation(
            "maxParallelism must be at least 1".to_string(),
        ));
    }
    if start > end {
        return Err(CoreError::Validation(format!(
            "startIndex {start} is past endIndex {end}"
        )));
    }

    let len = end - start;
    let size = if len.div_ceil(batch_size) > max_parallelism {
        len.div_ceil(max_parallelism)
    } else {
        batch_size
    };

    let mut batches = Vec::with_capacity(len.div_ceil(size) as usize);
    let mut lo = start;
    while lo < end {
        let hi = lo.saturating_add(size).min(end);
        batches.push(lo..hi);
        lo = hi;
    }
    Ok(batches)
}
