//! Slicing ragged sparse work into balanced tasks
//!
//! Two slicers share one scheme. Work is measured per vector, cut at even
//! boundaries of its running sum, and only a vector that is too large for
//! one task on its own is split at the entry level.
//!
//! - [`ek_slice`] partitions the entries of one matrix.
//! - [`ewise_slice`] partitions the output vectors of a merge of two or
//!   three operands (A, B and an optional mask), splitting an oversized
//!   vector into fine tasks whose cut points are chosen on the densest
//!   operand and mapped into the others by binary search.

use crate::error::Result;
use crate::utils::{exclusive_scan, lower_bound, try_vec};

/// Entries `[pstart, pend)` of a matrix, spanning vectors `kfirst..kend`
///
/// The first and last vectors may be shared with neighbouring tasks. Each
/// vector is *owned* by exactly one task, the one whose range contains the
/// vector's start; owned vectors are `kown_start..kown_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryTask {
    pub pstart: usize,
    pub pend: usize,
    pub kfirst: usize,
    pub kend: usize,
    pub kown_start: usize,
    pub kown_end: usize,
}

impl EntryTask {
    /// The part of vector `k` (entries `[vstart, vend)`) inside this task
    #[inline]
    pub fn clip(&self, vstart: usize, vend: usize) -> (usize, usize) {
        let start = vstart.max(self.pstart);
        (start, vend.min(self.pend).max(start))
    }
}

/// Slice `anz` entries held in `nvec` vectors into `ntasks` even tasks
///
/// `vstart(k)` is the first entry of vector `k`, for `k` in `0..=nvec`
/// (`vstart(nvec) == anz`). At least one task is always returned.
pub fn ek_slice<F>(nvec: usize, anz: usize, vstart: F, ntasks: usize) -> Result<Vec<EntryTask>>
where
    F: Fn(usize) -> usize,
{
    let ntasks = ntasks.min(anz).max(1);
    let mut tasks = try_vec(ntasks)?;

    // first vector k with vstart(k) >= p
    let first_starting_at = |p: usize| -> usize {
        let (mut lo, mut hi) = (0, nvec);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if vstart(mid) < p {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    };
    // the vector holding entry p (p < anz)
    let containing = |p: usize| -> usize {
        let (mut lo, mut hi) = (0, nvec);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if vstart(mid + 1) <= p {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    };

    let cut = |t: usize| ((t as u128 * anz as u128) / ntasks as u128) as usize;
    for t in 0..ntasks {
        let (pstart, pend) = (cut(t), cut(t + 1));
        let (kfirst, kend) = if pstart < pend {
            (containing(pstart), containing(pend - 1) + 1)
        } else {
            (0, 0)
        };
        let kown_start = if t == 0 { 0 } else { first_starting_at(pstart) };
        let kown_end = if t + 1 == ntasks {
            nvec
        } else {
            first_starting_at(pend)
        };
        tasks.push(EntryTask {
            pstart,
            pend,
            kfirst,
            kend,
            kown_start,
            kown_end,
        });
    }
    Ok(tasks)
}

/// Per-output-vector entry ranges of one operand of a merge
pub struct SliceOperand<'a> {
    /// `[start, end)` of the operand's entries for each output vector
    pub ranges: &'a [(usize, usize)],
    /// Index within its vector of the entry at a position
    pub index: &'a (dyn Fn(usize) -> usize + Sync),
}

impl SliceOperand<'_> {
    /// First position in `[start, end)` whose index is at least `target`
    fn lower_bound(&self, start: usize, end: usize, target: usize) -> usize {
        let (mut lo, mut hi) = (start, end);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if (self.index)(mid) < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

/// A unit of merge work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTask {
    /// Whole output vectors `kstart..kend`
    Coarse { kstart: usize, kend: usize },
    /// Part of output vector `k`: entry ranges into each operand, in the
    /// order the operands were given
    Fine { k: usize, ranges: Vec<(usize, usize)> },
}

impl MergeTask {
    /// Output vectors this task contributes to
    pub fn vectors(&self) -> std::ops::Range<usize> {
        match *self {
            MergeTask::Coarse { kstart, kend } => kstart..kend,
            MergeTask::Fine { k, .. } => k..k + 1,
        }
    }
}

/// Slice the merge of `operands` over `work.len()` output vectors
///
/// `work[k]` estimates the cost of output vector `k` (usually the sum of the
/// operands' entries in it). Tasks come out in vector order, and the fine
/// tasks of one vector are consecutive and in index order, so the task
/// outputs laid end to end form the output in storage order.
pub fn ewise_slice(
    work: &[usize],
    operands: &[SliceOperand<'_>],
    ntasks: usize,
) -> Result<Vec<MergeTask>> {
    let cnvec = work.len();
    let cum = exclusive_scan(work);
    let total = cum[cnvec];
    if ntasks <= 1 || cnvec == 0 || total == 0 {
        return Ok(vec![MergeTask::Coarse { kstart: 0, kend: cnvec }]);
    }

    let target = total.div_ceil(ntasks).max(1);
    let is_big = |k: usize| work[k] > 2 * target;
    let mut tasks = try_vec(ntasks + cnvec.min(ntasks))?;
    let mut k = 0;
    while k < cnvec {
        if is_big(k) {
            push_fine_tasks(&mut tasks, k, work[k], target, operands);
            k += 1;
            continue;
        }
        // cut at the first vector where the running work reaches the target
        let goal = cum[k] + target;
        let mut kend = lower_bound(&cum, goal).clamp(k + 1, cnvec);
        if kend - 1 > k && is_big(kend - 1) {
            kend -= 1;
        }
        tasks.push(MergeTask::Coarse { kstart: k, kend });
        k = kend;
    }
    Ok(tasks)
}

/// Split output vector `k` into fine tasks at entries of its densest operand
fn push_fine_tasks(
    tasks: &mut Vec<MergeTask>,
    k: usize,
    work: usize,
    target: usize,
    operands: &[SliceOperand<'_>],
) {
    let len = |op: &SliceOperand<'_>| op.ranges[k].1 - op.ranges[k].0;
    let Some(dense) = operands.iter().max_by_key(|op| len(op)) else {
        tasks.push(MergeTask::Coarse { kstart: k, kend: k + 1 });
        return;
    };
    let dlen = len(dense);
    let nfine = (work / target).min(dlen);
    if nfine < 2 {
        tasks.push(MergeTask::Coarse { kstart: k, kend: k + 1 });
        return;
    }

    // cut indices: the index of evenly spaced entries of the dense operand
    let (d0, _) = dense.ranges[k];
    let cuts: Vec<usize> = (1..nfine)
        .map(|f| (dense.index)(d0 + f * dlen / nfine))
        .collect();

    let mut starts: Vec<usize> = operands.iter().map(|op| op.ranges[k].0).collect();
    for f in 0..nfine {
        let ranges: Vec<(usize, usize)> = operands
            .iter()
            .zip(starts.iter_mut())
            .map(|(op, start)| {
                let (_, x1) = op.ranges[k];
                let end = match cuts.get(f) {
                    Some(&i) => op.lower_bound(*start, x1, i),
                    None => x1,
                };
                let range = (*start, end);
                *start = end;
                range
            })
            .collect();
        tasks.push(MergeTask::Fine { k, ranges });
    }
}
