//! # Parallel building blocks
//!
//! Kernels follow a fork-join pattern: work is sliced into tasks
//! ([`slice`]), each task computes into its own buffers or into a disjoint
//! slice of the output, and results are assembled after a prefix sum.

pub mod slice;

use rayon::prelude::*;

use crate::config::Context;
use crate::error::Result;
use crate::types::Scalar;
use crate::utils::try_vec;

pub use slice::{ek_slice, ewise_slice, EntryTask, MergeTask, SliceOperand};

/// Split `data` into consecutive mutable chunks `data[offsets[k]..offsets[k+1]]`
///
/// `offsets` must be non-decreasing, start at zero and end at `data.len()`.
pub fn split_by_offsets_mut<'a, U>(mut data: &'a mut [U], offsets: &[usize]) -> Vec<&'a mut [U]> {
    debug_assert_eq!(offsets.first().copied().unwrap_or(0), 0);
    let mut chunks = Vec::with_capacity(offsets.len().saturating_sub(1));
    for w in offsets.windows(2) {
        let (head, tail) = std::mem::take(&mut data).split_at_mut(w[1] - w[0]);
        chunks.push(head);
        data = tail;
    }
    chunks
}

/// Run `f` over every task index in parallel, collecting the results in order
pub fn map_tasks<R, F>(ctx: &Context, ntasks: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize) -> R + Sync + Send,
{
    if ntasks <= 1 {
        return (0..ntasks).map(f).collect();
    }
    ctx.install(|| (0..ntasks).into_par_iter().map(f).collect())
}

/// Concatenate per-vector `(indices, values)` results into `(p, i, x)`
///
/// The vector pointers come from a running sum of the vector lengths.
pub fn assemble_vectors<T: Scalar>(
    vectors: Vec<(Vec<usize>, Vec<T>)>,
) -> Result<(Vec<usize>, Vec<usize>, Vec<T>)> {
    let total: usize = vectors.iter().map(|(idx, _)| idx.len()).sum();
    let mut p = try_vec(vectors.len() + 1)?;
    let mut i = try_vec(total)?;
    let mut x = try_vec(total)?;

    p.push(0);
    for (idx, val) in vectors {
        i.extend(idx);
        x.extend(val);
        p.push(i.len());
    }
    Ok((p, i, x))
}
