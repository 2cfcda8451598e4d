//! Deterministic contiguous partitioning.
//!
//! Independently launched workers agree on a split by agreeing on `n` alone:
//! group `i` of a sequence of length `len` always covers
//! `[len * i / n, len * (i + 1) / n)` with floor division, so group sizes never
//! differ by more than one and concatenating the groups in order reproduces the
//! input.

use std::ops::Range;

/// Bounds of group `index` when `len` items are split into `n` groups.
///
/// `n` must be positive and `index < n`; callers validate this through
/// [`ShardCoordinates`](crate::config::ShardCoordinates).
#[must_use]
pub fn shard_range(len: usize, n: usize, index: usize) -> Range<usize> {
    debug_assert!(n > 0 && index < n, "invalid shard {index}/{n}");
    // u128 keeps `len * (index + 1)` from overflowing on 64-bit lengths
    let bound = |i: usize| ((len as u128 * i as u128) / n as u128) as usize;
    bound(index)..bound(index + 1)
}

/// Split `items` into exactly `n` contiguous groups, preserving order.
///
/// Empty input yields `n` empty groups; `n > items.len()` yields some empty
/// groups. `n == 0` yields no groups.
#[must_use]
pub fn split_even<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    (0..n)
        .map(|i| items[shard_range(items.len(), n, i)].to_vec())
        .collect()
}
