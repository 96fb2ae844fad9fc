//! Sparse vector merges for `C = A ∪ B` and `C = A ∩ B`
//!
//! Every output vector is computed by one routine, [`Plan::vector`], that
//! picks a strategy from the shapes of its inputs and hands each output
//! entry to a [`Sink`]. The count phase runs it with a sink that only
//! counts; the fill phase runs it again with a sink that writes into the
//! task's slice of the output. Both phases therefore agree exactly.

use std::cmp::Ordering;

use rayon::prelude::*;
use tracing::trace;

use crate::config::{burble, Context};
use crate::error::Result;
use crate::matrix::{Matrix, MatrixView};
use crate::parallel::{ewise_slice, map_tasks, split_by_offsets_mut, MergeTask, SliceOperand};
use crate::types::Scalar;
use crate::utils::{cumsum_in_place, exclusive_scan, try_filled, try_vec};

/// Receives the entries of an output vector in increasing index order
pub(crate) trait Sink<Z> {
    fn emit<V: FnOnce() -> Z>(&mut self, i: usize, value: V);
}

/// Counts entries without computing them
pub(crate) struct CountSink(pub usize);

impl<Z> Sink<Z> for CountSink {
    #[inline]
    fn emit<V: FnOnce() -> Z>(&mut self, _i: usize, _value: V) {
        self.0 += 1;
    }
}

/// Writes entries into preallocated index and value slices
pub(crate) struct FillSink<'o, Z> {
    i: &'o mut [usize],
    x: &'o mut [Z],
    n: usize,
}

impl<'o, Z> FillSink<'o, Z> {
    pub(crate) fn new(i: &'o mut [usize], x: &'o mut [Z]) -> Self {
        Self { i, x, n: 0 }
    }

    pub(crate) fn len(&self) -> usize {
        self.n
    }
}

impl<Z> Sink<Z> for FillSink<'_, Z> {
    #[inline]
    fn emit<V: FnOnce() -> Z>(&mut self, i: usize, value: V) {
        self.i[self.n] = i;
        self.x[self.n] = value();
        self.n += 1;
    }
}

/// The entries `[start, end)` of one vector of an operand
///
/// `base` is set when the whole vector is dense (every index present); the
/// entry for index `i` then sits at `base + i`.
pub(crate) struct Side<'v, T: Clone> {
    view: &'v MatrixView<'v, T>,
    start: usize,
    end: usize,
    base: Option<usize>,
}

impl<T: Clone> Clone for Side<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Clone> Copy for Side<'_, T> {}

impl<'v, T: Scalar> Side<'v, T> {
    /// Entries `range` of a vector whose whole extent is `whole`
    pub(crate) fn new(
        view: &'v MatrixView<'v, T>,
        range: (usize, usize),
        whole: (usize, usize),
    ) -> Self {
        let dense = view.vlen > 0 && whole.1 - whole.0 == view.vlen;
        Self {
            view,
            start: range.0,
            end: range.1,
            base: dense.then_some(whole.0),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    fn index(&self, pos: usize) -> usize {
        self.view.index(pos)
    }

    #[inline]
    fn value(&self, pos: usize) -> &T {
        self.view.value(pos)
    }

    /// Position of index `i` within this range, if present
    #[inline]
    fn lookup(&self, i: usize) -> Option<usize> {
        match self.base {
            Some(base) => {
                let pos = base + i;
                (self.start..self.end).contains(&pos).then_some(pos)
            }
            None => self.view.i[self.start..self.end]
                .binary_search(&i)
                .ok()
                .map(|off| self.start + off),
        }
    }

    /// First position in `[from, end)` whose index is at least `i`
    #[inline]
    fn lower_bound(&self, from: usize, i: usize) -> usize {
        from + self.view.i[from..self.end].partition_point(|&x| x < i)
    }
}

/// Tests output indices of one vector against a mask, in increasing order
pub(crate) struct MaskFilter<'v> {
    side: Side<'v, bool>,
    pos: usize,
}

impl<'v> MaskFilter<'v> {
    pub(crate) fn new(side: Side<'v, bool>) -> Self {
        Self { pos: side.start, side }
    }

    #[inline]
    pub(crate) fn test(&mut self, i: usize) -> bool {
        if let Some(pos) = self.side.lookup_dense(i) {
            return *self.side.value(pos);
        }
        while self.pos < self.side.end && self.side.index(self.pos) < i {
            self.pos += 1;
        }
        self.pos < self.side.end && self.side.index(self.pos) == i && *self.side.value(self.pos)
    }
}

impl Side<'_, bool> {
    #[inline]
    fn lookup_dense(&self, i: usize) -> Option<usize> {
        self.base.map(|base| base + i)
    }
}

/// The operators of a merge
///
/// `f` combines entries present in both inputs; in a union, `fa` and `fb`
/// convert entries present in only one.
pub(crate) struct Merge<F, FA, FB> {
    pub union: bool,
    pub ratio: usize,
    pub f: F,
    pub fa: FA,
    pub fb: FB,
}

#[inline]
fn put<Z, S, K, V>(sink: &mut S, keep: &mut K, i: usize, value: V)
where
    S: Sink<Z>,
    K: FnMut(usize) -> bool,
    V: FnOnce() -> Z,
{
    if keep(i) {
        sink.emit(i, value);
    }
}

fn copy_side<T, Z, G, S, K>(
    side: &Side<'_, T>,
    from: usize,
    to: usize,
    g: &G,
    keep: &mut K,
    sink: &mut S,
)
where
    T: Scalar,
    G: Fn(&T) -> Z,
    S: Sink<Z>,
    K: FnMut(usize) -> bool,
{
    for pos in from..to {
        put(sink, keep, side.index(pos), || g(side.value(pos)));
    }
}

impl<F, FA, FB> Merge<F, FA, FB> {
    /// Merge one vector of A with one of B
    pub(crate) fn vector<A, B, Z, S, K>(
        &self,
        a: Side<'_, A>,
        b: Side<'_, B>,
        keep: &mut K,
        sink: &mut S,
    )
    where
        A: Scalar,
        B: Scalar,
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
        K: FnMut(usize) -> bool,
    {
        let (anz, bnz) = (a.len(), b.len());
        if anz == 0 || bnz == 0 {
            if self.union {
                copy_side(&a, a.start, a.end, &self.fa, keep, sink);
                copy_side(&b, b.start, b.end, &self.fb, keep, sink);
            }
            return;
        }

        match (a.base, b.base) {
            (Some(_), Some(bbase)) => {
                // both dense: positional
                for pa in a.start..a.end {
                    let i = a.index(pa);
                    put(sink, keep, i, || (self.f)(a.value(pa), b.value(bbase + i)));
                }
            }
            (Some(abase), None) => {
                if self.union {
                    let mut pb = b.start;
                    for pa in a.start..a.end {
                        let i = a.index(pa);
                        if pb < b.end && b.index(pb) == i {
                            put(sink, keep, i, || (self.f)(a.value(pa), b.value(pb)));
                            pb += 1;
                        } else {
                            put(sink, keep, i, || (self.fa)(a.value(pa)));
                        }
                    }
                } else {
                    for pb in b.start..b.end {
                        let i = b.index(pb);
                        put(sink, keep, i, || (self.f)(a.value(abase + i), b.value(pb)));
                    }
                }
            }
            (None, Some(bbase)) => {
                if self.union {
                    let mut pa = a.start;
                    for pb in b.start..b.end {
                        let i = b.index(pb);
                        if pa < a.end && a.index(pa) == i {
                            put(sink, keep, i, || (self.f)(a.value(pa), b.value(pb)));
                            pa += 1;
                        } else {
                            put(sink, keep, i, || (self.fb)(b.value(pb)));
                        }
                    }
                } else {
                    for pa in a.start..a.end {
                        let i = a.index(pa);
                        put(sink, keep, i, || (self.f)(a.value(pa), b.value(bbase + i)));
                    }
                }
            }
            (None, None) => self.sparse_vector(a, b, keep, sink),
        }
    }

    fn sparse_vector<A, B, Z, S, K>(
        &self,
        a: Side<'_, A>,
        b: Side<'_, B>,
        keep: &mut K,
        sink: &mut S,
    )
    where
        A: Scalar,
        B: Scalar,
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
        K: FnMut(usize) -> bool,
    {
        let (anz, bnz) = (a.len(), b.len());
        let (afirst, alast) = (a.index(a.start), a.index(a.end - 1));
        let (bfirst, blast) = (b.index(b.start), b.index(b.end - 1));

        // disjoint index ranges
        if alast < bfirst {
            if self.union {
                copy_side(&a, a.start, a.end, &self.fa, keep, sink);
                copy_side(&b, b.start, b.end, &self.fb, keep, sink);
            }
            return;
        }
        if blast < afirst {
            if self.union {
                copy_side(&b, b.start, b.end, &self.fb, keep, sink);
                copy_side(&a, a.start, a.end, &self.fa, keep, sink);
            }
            return;
        }

        if anz > self.ratio.saturating_mul(bnz) {
            // A is much denser: walk B and search A
            let mut pa = a.start;
            for pb in b.start..b.end {
                let i = b.index(pb);
                let q = a.lower_bound(pa, i);
                if self.union {
                    copy_side(&a, pa, q, &self.fa, keep, sink);
                }
                if q < a.end && a.index(q) == i {
                    put(sink, keep, i, || (self.f)(a.value(q), b.value(pb)));
                    pa = q + 1;
                } else {
                    if self.union {
                        put(sink, keep, i, || (self.fb)(b.value(pb)));
                    }
                    pa = q;
                }
            }
            if self.union {
                copy_side(&a, pa, a.end, &self.fa, keep, sink);
            }
        } else if bnz > self.ratio.saturating_mul(anz) {
            // B is much denser: walk A and search B
            let mut pb = b.start;
            for pa in a.start..a.end {
                let i = a.index(pa);
                let q = b.lower_bound(pb, i);
                if self.union {
                    copy_side(&b, pb, q, &self.fb, keep, sink);
                }
                if q < b.end && b.index(q) == i {
                    put(sink, keep, i, || (self.f)(a.value(pa), b.value(q)));
                    pb = q + 1;
                } else {
                    if self.union {
                        put(sink, keep, i, || (self.fa)(a.value(pa)));
                    }
                    pb = q;
                }
            }
            if self.union {
                copy_side(&b, pb, b.end, &self.fb, keep, sink);
            }
        } else {
            let (mut pa, mut pb) = (a.start, b.start);
            while pa < a.end && pb < b.end {
                let (ia, ib) = (a.index(pa), b.index(pb));
                match ia.cmp(&ib) {
                    Ordering::Less => {
                        if self.union {
                            put(sink, keep, ia, || (self.fa)(a.value(pa)));
                        }
                        pa += 1;
                    }
                    Ordering::Greater => {
                        if self.union {
                            put(sink, keep, ib, || (self.fb)(b.value(pb)));
                        }
                        pb += 1;
                    }
                    Ordering::Equal => {
                        put(sink, keep, ia, || (self.f)(a.value(pa), b.value(pb)));
                        pa += 1;
                        pb += 1;
                    }
                }
            }
            if self.union {
                copy_side(&a, pa, a.end, &self.fa, keep, sink);
                copy_side(&b, pb, b.end, &self.fb, keep, sink);
            }
        }
    }

    /// Merge one vector driven by the entries of a very sparse mask
    pub(crate) fn masked_vector<A, B, Z, S>(
        &self,
        a: Side<'_, A>,
        b: Side<'_, B>,
        m: Side<'_, bool>,
        sink: &mut S,
    )
    where
        A: Scalar,
        B: Scalar,
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
    {
        for pm in m.start..m.end {
            if !*m.value(pm) {
                continue;
            }
            let i = m.index(pm);
            match (a.lookup(i), b.lookup(i)) {
                (Some(pa), Some(pb)) => sink.emit(i, || (self.f)(a.value(pa), b.value(pb))),
                (Some(pa), None) if self.union => sink.emit(i, || (self.fa)(a.value(pa))),
                (None, Some(pb)) if self.union => sink.emit(i, || (self.fb)(b.value(pb))),
                _ => {}
            }
        }
    }
}

/// How a mask takes part in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaskUse {
    /// Merge as usual and drop entries outside the mask
    Filter,
    /// Visit only the mask's entries and look the inputs up
    Drive,
}

/// Everything the per-vector work needs, shared by all tasks
struct Plan<'p, A: Scalar, B: Scalar, F, FA, FB> {
    merge: &'p Merge<F, FA, FB>,
    a: &'p MatrixView<'p, A>,
    b: &'p MatrixView<'p, B>,
    mask: Option<(&'p MatrixView<'p, bool>, MaskUse)>,
    ra: Vec<(usize, usize)>,
    rb: Vec<(usize, usize)>,
    rm: Vec<(usize, usize)>,
}

impl<A: Scalar, B: Scalar, F, FA, FB> Plan<'_, A, B, F, FA, FB> {
    /// Compute output vector `k`, restricted to the given operand ranges
    fn vector<Z, S>(
        &self,
        k: usize,
        ra: (usize, usize),
        rb: (usize, usize),
        rm: Option<(usize, usize)>,
        sink: &mut S,
    )
    where
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
    {
        let a = Side::new(self.a, ra, self.ra[k]);
        let b = Side::new(self.b, rb, self.rb[k]);
        match (self.mask, rm) {
            (Some((mv, use_)), Some(rm)) => {
                let m = Side::new(mv, rm, self.rm[k]);
                match use_ {
                    MaskUse::Drive => self.merge.masked_vector(a, b, m, sink),
                    MaskUse::Filter => {
                        let mut filter = MaskFilter::new(m);
                        self.merge.vector(a, b, &mut |i| filter.test(i), sink)
                    }
                }
            }
            _ => self.merge.vector(a, b, &mut |_| true, sink),
        }
    }

    fn whole_vector<Z, S>(&self, k: usize, sink: &mut S)
    where
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
    {
        let rm = self.mask.map(|_| self.rm[k]);
        self.vector(k, self.ra[k], self.rb[k], rm, sink);
    }

    fn run_task<Z, S>(&self, task: &MergeTask, sink: &mut S, mut per_vector: impl FnMut(&mut S))
    where
        F: Fn(&A, &B) -> Z,
        FA: Fn(&A) -> Z,
        FB: Fn(&B) -> Z,
        S: Sink<Z>,
    {
        match task {
            MergeTask::Coarse { kstart, kend } => {
                for k in *kstart..*kend {
                    self.whole_vector(k, sink);
                    per_vector(sink);
                }
            }
            MergeTask::Fine { k, ranges } => {
                self.vector(*k, ranges[0], ranges[1], ranges.get(2).copied(), sink);
                per_vector(sink);
            }
        }
    }
}

/// Union of two sorted id lists
fn union_ids(x: &[usize], y: &[usize]) -> Result<Vec<usize>> {
    let mut out = try_vec(x.len() + y.len())?;
    let (mut p, mut q) = (0, 0);
    while p < x.len() && q < y.len() {
        match x[p].cmp(&y[q]) {
            Ordering::Less => {
                out.push(x[p]);
                p += 1;
            }
            Ordering::Greater => {
                out.push(y[q]);
                q += 1;
            }
            Ordering::Equal => {
                out.push(x[p]);
                p += 1;
                q += 1;
            }
        }
    }
    out.extend_from_slice(&x[p..]);
    out.extend_from_slice(&y[q..]);
    Ok(out)
}

/// Compute `C = A ∪ B` or `C = A ∩ B`, optionally restricted by a
/// non-complemented mask
///
/// All three inputs share dimensions and orientation. The result has the
/// same orientation; it is full when both inputs are full and there is no
/// mask, hypersparse when the inputs' vector lists allow it, and sparse
/// otherwise.
pub(crate) fn ewise_core<A, B, Z, F, FA, FB>(
    ctx: &Context,
    merge: &Merge<F, FA, FB>,
    a: &MatrixView<'_, A>,
    b: &MatrixView<'_, B>,
    mask: Option<(&MatrixView<'_, bool>, MaskUse)>,
) -> Result<Matrix<Z>>
where
    A: Scalar,
    B: Scalar,
    Z: Scalar,
    F: Fn(&A, &B) -> Z + Sync,
    FA: Fn(&A) -> Z + Sync,
    FB: Fn(&B) -> Z + Sync,
{
    let (vlen, vdim, is_csc) = (a.vlen, a.vdim, a.is_csc);
    debug_assert!(b.vlen == vlen && b.vdim == vdim && b.is_csc == is_csc);

    if a.is_full() && b.is_full() && mask.is_none() {
        burble!(ctx, "dense C = A op B");
        let n = vlen * vdim;
        if a.iso && b.iso {
            let z = (merge.f)(a.value(0), b.value(0));
            return Ok(Matrix::full_from_parts(vlen, vdim, is_csc, vec![z], true));
        }
        let mut x = try_vec(n)?;
        ctx.install(|| {
            x.par_extend((0..n).into_par_iter().map(|p| (merge.f)(a.value(p), b.value(p))))
        });
        return Ok(Matrix::full_from_parts(vlen, vdim, is_csc, x, false));
    }

    // phase 0: the output vectors and each operand's entries in them
    let hyper = if merge.union {
        a.is_hyper() && b.is_hyper()
    } else {
        a.is_hyper() || b.is_hyper()
    };
    let candidates: Vec<usize> = if !hyper {
        (0..vdim).collect()
    } else if merge.union {
        union_ids(a.h, b.h)?
    } else if a.is_hyper() && (!b.is_hyper() || a.h.len() <= b.h.len()) {
        a.h.to_vec()
    } else {
        b.h.to_vec()
    };

    let mut ch = try_vec(if hyper { candidates.len() } else { 0 })?;
    let mut ra = try_vec(candidates.len())?;
    let mut rb = try_vec(candidates.len())?;
    let mut rm = try_vec(if mask.is_some() { candidates.len() } else { 0 })?;
    for &j in &candidates {
        let (va, vb) = (a.vector_range(j), b.vector_range(j));
        let vm = mask.map(|(m, _)| m.vector_range(j));
        if hyper {
            let empty = if merge.union {
                va.0 == va.1 && vb.0 == vb.1
            } else {
                va.0 == va.1 || vb.0 == vb.1
            };
            if empty || vm.is_some_and(|r| r.0 == r.1) {
                continue;
            }
            ch.push(j);
        }
        ra.push(va);
        rb.push(vb);
        if let Some(vm) = vm {
            rm.push(vm);
        }
    }
    let cnvec = ra.len();

    let driven = matches!(mask, Some((_, MaskUse::Drive)));
    let work: Vec<usize> = (0..cnvec)
        .map(|k| {
            if driven {
                rm[k].1 - rm[k].0
            } else {
                (ra[k].1 - ra[k].0) + (rb[k].1 - rb[k].0)
            }
        })
        .collect();
    let total: usize = work.iter().sum();
    let nthreads = ctx.nthreads_for(total);
    let ntasks = ctx.ntasks_for(nthreads, total);

    let a_index = |pos: usize| a.index(pos);
    let b_index = |pos: usize| b.index(pos);
    let m_view = mask.map(|(m, _)| m);
    let m_index = |pos: usize| m_view.map_or(0, |m| m.index(pos));
    let mut operands = vec![
        SliceOperand { ranges: &ra, index: &a_index },
        SliceOperand { ranges: &rb, index: &b_index },
    ];
    if mask.is_some() {
        operands.push(SliceOperand { ranges: &rm, index: &m_index });
    }
    let tasks = ewise_slice(&work, &operands, ntasks)?;
    drop(operands);
    burble!(
        ctx,
        union = merge.union,
        cnvec,
        ntasks = tasks.len(),
        mask = ?mask.map(|(_, u)| u),
        "ewise merge"
    );

    let plan = Plan {
        merge,
        a,
        b,
        mask,
        ra,
        rb,
        rm,
    };

    // phase 1: count the entries of every vector (or fine task)
    let counts: Vec<Vec<usize>> = map_tasks(ctx, tasks.len(), |t| {
        let mut counts = Vec::with_capacity(tasks[t].vectors().len());
        let mut sink = CountSink(0);
        let mut last = 0;
        plan.run_task::<Z, _>(&tasks[t], &mut sink, |s| {
            counts.push(s.0 - last);
            last = s.0;
        });
        counts
    });

    let mut cp = try_filled(cnvec + 1, 0usize)?;
    for (task, counts) in tasks.iter().zip(&counts) {
        for (k, &n) in task.vectors().zip(counts) {
            cp[k] += n;
        }
    }
    let cnz = cumsum_in_place(&mut cp);
    let sizes: Vec<usize> = counts.iter().map(|c| c.iter().sum()).collect();
    let offsets = exclusive_scan(&sizes);
    trace!(cnz, "ewise count phase done");

    // phase 2: fill each task's slice of the output
    let mut ci = try_filled(cnz, 0usize)?;
    let mut cx = try_filled(cnz, Z::default())?;
    {
        let i_chunks = split_by_offsets_mut(&mut ci, &offsets);
        let x_chunks = split_by_offsets_mut(&mut cx, &offsets);
        ctx.install(|| {
            tasks
                .par_iter()
                .zip(i_chunks)
                .zip(x_chunks)
                .for_each(|((task, ic), xc)| {
                    let mut sink = FillSink::new(ic, xc);
                    plan.run_task::<Z, _>(task, &mut sink, |_| {});
                    debug_assert_eq!(sink.len(), sink.i.len());
                });
        });
    }

    Ok(Matrix::sparse_from_parts(
        vlen,
        vdim,
        is_csc,
        cp,
        hyper.then_some(ch),
        ci,
        cx,
        false,
    ))
}
