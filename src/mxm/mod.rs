//! # Matrix multiply
//!
//! `C<M> = accum(C, A*B)` over a semiring, with either input optionally
//! transposed. Three algorithms compute the same result:
//!
//! - [`gustavson`]: saxpy with a dense workspace per thread
//! - [`heap`]: saxpy merging the contributing vectors through a min-heap
//! - [`dot`]: one dot product per output entry
//!
//! Kernels work in storage terms: output vector `j` is
//! `C(:,j) = Σ_k L(:,k) ⊗ R(k,j)`. A column-stored C takes `L = A` and
//! `R = B`. A row-stored C is computed as `C' = B'*A'`, which is the same
//! loop over the row storage of B and A with the multiply operator flipped.

pub mod dot;
pub mod gustavson;
pub mod heap;

use std::ops::Range;

use rayon::prelude::*;
use tracing::trace;

use crate::config::{burble, Context};
use crate::descriptor::{AxbMethod, Descriptor};
use crate::error::{Error, Result};
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::merge::{MaskFilter, Side};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Format, Matrix, MatrixView, Operand};
use crate::ops::{BinaryOp, Monoid, Semiring};
use crate::parallel::{ek_slice, split_by_offsets_mut};
use crate::types::{cast_factory, Scalar};
use crate::utils::{cumsum_in_place, exclusive_scan, try_filled};

/// A mask as the multiply kernels see it: boolean, oriented like C
#[derive(Clone, Copy)]
pub(crate) struct KernelMask<'m> {
    pub view: &'m MatrixView<'m, bool>,
    pub complement: bool,
}

impl<'m> KernelMask<'m> {
    /// The mask's entries in output vector `j`
    pub(crate) fn side(&self, j: usize) -> Side<'m, bool> {
        let range = self.view.vector_range(j);
        Side::new(self.view, range, range)
    }

    /// A filter for output vector `j`, to be queried in increasing order
    pub(crate) fn filter(&self, j: usize) -> MaskFilter<'m> {
        MaskFilter::new(self.side(j))
    }
}

/// The operands of a product, all in storage terms
pub(crate) struct Product<'p, L: Scalar, R: Scalar, Z: Scalar, F> {
    pub left: &'p MatrixView<'p, L>,
    pub right: &'p MatrixView<'p, R>,
    pub add: &'p Monoid<Z>,
    pub mult: F,
    pub mask: Option<KernelMask<'p>>,
}

impl<L: Scalar, R: Scalar, Z: Scalar, F> Product<'_, L, R, Z, F> {
    /// Length of every output vector
    pub(crate) fn cvlen(&self) -> usize {
        self.left.vlen
    }

    /// Fold `t` into `sum`, leaving a terminal value alone
    #[inline]
    pub(crate) fn add_into(&self, sum: &mut Z, t: Z) {
        if !self.add.is_terminal(sum) {
            *sum = self.add.call(sum, &t);
        }
    }
}

/// Count-then-fill over coarse tasks of the output vectors
///
/// `work` is the running sum of the estimated cost of each output vector
/// (`cnvec + 1` entries). Every task gets a workspace from `init`, reused
/// for all its vectors. `count(ws, k)` returns the number of entries of
/// output vector `k`; `fill(ws, k, i, x)` writes exactly that many.
pub(crate) fn two_phase<Z, W, Init, Count, Fill>(
    ctx: &Context,
    work: &[usize],
    init: Init,
    count: Count,
    fill: Fill,
) -> Result<(Vec<usize>, Vec<usize>, Vec<Z>)>
where
    Z: Scalar,
    W: Send,
    Init: Fn() -> Result<W> + Sync + Send,
    Count: Fn(&mut W, usize) -> usize + Sync + Send,
    Fill: Fn(&mut W, usize, &mut [usize], &mut [Z]) + Sync + Send,
{
    let cnvec = work.len() - 1;
    let total = work[cnvec];
    let nthreads = ctx.nthreads_for(total);
    let ntasks = ctx.ntasks_for(nthreads, total);
    let ranges: Vec<Range<usize>> = ek_slice(cnvec, total, |k| work[k], ntasks)?
        .into_iter()
        .map(|t| t.kown_start..t.kown_end)
        .collect();
    trace!(cnvec, total, ntasks = ranges.len(), "mxm tasks");

    // phase 1: entries per output vector
    let counts: Vec<Vec<usize>> = ctx.install(|| {
        ranges
            .par_iter()
            .map_init(&init, |ws, range| {
                let ws = ws.as_mut().map_err(|e| e.clone())?;
                Ok(range.clone().map(|k| count(ws, k)).collect::<Vec<usize>>())
            })
            .collect::<Result<_>>()
    })?;
    let mut cp = try_filled(cnvec + 1, 0usize)?;
    for (range, counts) in ranges.iter().zip(&counts) {
        for (k, &n) in range.clone().zip(counts) {
            cp[k] = n;
        }
    }
    let cnz = cumsum_in_place(&mut cp);

    // phase 2: each task fills its own slice
    let mut offsets: Vec<usize> = ranges.iter().map(|r| cp[r.start]).collect();
    offsets.push(cnz);
    let mut ci = try_filled(cnz, 0usize)?;
    let mut cx = try_filled(cnz, Z::default())?;
    {
        let i_chunks = split_by_offsets_mut(&mut ci, &offsets);
        let x_chunks = split_by_offsets_mut(&mut cx, &offsets);
        ctx.install(|| {
            ranges
                .par_iter()
                .zip(i_chunks)
                .zip(x_chunks)
                .map_init(&init, |ws, ((range, ic), xc)| {
                    let ws = ws.as_mut().map_err(|e| e.clone())?;
                    let base = cp[range.start];
                    for k in range.clone() {
                        let (s, e) = (cp[k] - base, cp[k + 1] - base);
                        fill(ws, k, &mut ic[s..e], &mut xc[s..e]);
                    }
                    Ok(())
                })
                .collect::<Result<()>>()
        })?;
    }
    Ok((cp, ci, cx))
}

/// Flops of every output vector, as a running sum
fn saxpy_flops<L: Scalar, R: Scalar>(
    ctx: &Context,
    left: &MatrixView<'_, L>,
    right: &MatrixView<'_, R>,
) -> Vec<usize> {
    let per_vector: Vec<usize> = ctx.install(|| {
        (0..right.nvec())
            .into_par_iter()
            .map(|k| {
                (right.vstart(k)..right.vend(k))
                    .map(|p| {
                        let (s, e) = left.vector_range(right.index(p));
                        e - s
                    })
                    .sum()
            })
            .collect()
    });
    exclusive_scan(&per_vector)
}

/// `C<M> = accum(C, A*B)`
///
/// `desc.transpose_a` and `desc.transpose_b` select `A'` and `B'`;
/// `desc.axb_method` forces an algorithm.
pub fn mxm<C, M, A, B, X, Y, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    semiring: &Semiring<X, Y, Z>,
    a: &Matrix<A>,
    b: &Matrix<B>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
    B: Scalar,
    X: Scalar,
    Y: Scalar,
    Z: Scalar,
{
    let (m, ka) = shape_of(a, desc.transpose_a);
    let (kb, n) = shape_of(b, desc.transpose_b);
    if ka != kb {
        return Err(Error::dimension_mismatch(
            "mxm",
            format!("inner dimensions differ: {m}×{ka} times {kb}×{n}"),
        ));
    }
    check_same_shape("mxm", "A*B", c, (m, n))?;
    if let Some(mk) = mask {
        check_same_shape("mxm", "M", c, shape_of(mk, false))?;
    }
    let ax = cast_factory::<A, X>()?;
    let by = cast_factory::<B, Y>()?;
    cast_factory::<Z, C>()?;

    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    let resolved = mask.map(|mk| ResolvedMask::new(mk, is_csc, desc)).transpose()?;
    let mask_view = resolved.as_ref().map(|r| r.view()).transpose()?;
    let kmask = mask_view.as_ref().zip(resolved.as_ref()).map(|(view, r)| KernelMask {
        view,
        complement: r.complement,
    });

    let t: Matrix<Z> = if is_csc {
        let mult = semiring.multiply();
        product(
            ctx,
            (a, desc.transpose_a),
            (b, desc.transpose_b),
            is_csc,
            semiring.add(),
            |x: &A, y: &B| mult.call(&ax(x), &by(y)),
            kmask,
            desc.axb_method,
        )?
    } else {
        // C' = B'*A', reading the row storage of both inputs
        let flipped = semiring.flip();
        let mult = flipped.multiply();
        product(
            ctx,
            (b, desc.transpose_b),
            (a, desc.transpose_a),
            is_csc,
            flipped.add(),
            |y: &B, x: &A| mult.call(&by(y), &ax(x)),
            kmask,
            desc.axb_method,
        )?
    };
    drop(mask_view);
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, mask.is_some())
}

/// The algorithm chosen for a product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Dot,
    Gustavson,
    Heap,
}

/// `C(:,j) = Σ_k L(:,k) ⊗ R(k,j)` for every `j`, in orientation `is_csc`
#[allow(clippy::too_many_arguments)]
fn product<L, R, Z, F>(
    ctx: &Context,
    (left, tl): (&Matrix<L>, bool),
    (right, tr): (&Matrix<R>, bool),
    is_csc: bool,
    add: &Monoid<Z>,
    mult: F,
    mask: Option<KernelMask<'_>>,
    method: AxbMethod,
) -> Result<Matrix<Z>>
where
    L: Scalar,
    R: Scalar,
    Z: Scalar,
    F: Fn(&L, &R) -> Z + Sync,
{
    let r = Operand::new(right, tr, is_csc)?;
    let rv = r.view();

    let forced = match method {
        AxbMethod::Auto => None,
        AxbMethod::Dot => Some(Method::Dot),
        AxbMethod::Gustavson => Some(Method::Gustavson),
        AxbMethod::Heap => Some(Method::Heap),
    };
    let use_dot = match forced {
        Some(m) => m == Method::Dot,
        None => {
            // the left operand is already stored the other way round
            let dot_free = (left.format() == Format::ByCol) ^ tl != is_csc;
            let masked = mask.is_some_and(|m| !m.complement);
            let (lrows, lcols) = shape_of(left, tl);
            let cvlen = if is_csc { lrows } else { lcols };
            let positions = cvlen.saturating_mul(rv.vdim);
            dot_free && (masked || positions <= left.live_entries() + rv.nnz())
        }
    };

    if use_dot {
        let lt = Operand::new(left, tl, !is_csc)?;
        let ltv = lt.view();
        burble!(ctx, method = "dot", cvlen = ltv.vdim, cvdim = rv.vdim, "mxm");
        let prod = Product {
            left: &ltv,
            right: &rv,
            add,
            mult,
            mask,
        };
        return dot::dot_product(ctx, &prod, is_csc);
    }

    let l = Operand::new(left, tl, is_csc)?;
    let lv = l.view();
    let flops = saxpy_flops(ctx, &lv, &rv);
    let total = flops[flops.len() - 1];
    let method = forced.unwrap_or_else(|| {
        let nonempty = (0..rv.nvec()).filter(|&k| rv.vend(k) > rv.vstart(k)).count();
        let avg = total / nonempty.max(1);
        if lv.vlen > 16 * avg.max(1) {
            Method::Heap
        } else {
            Method::Gustavson
        }
    });
    burble!(ctx, method = ?method, flops = total, "mxm");
    let prod = Product {
        left: &lv,
        right: &rv,
        add,
        mult,
        mask,
    };
    match method {
        Method::Heap => heap::heap_product(ctx, &prod, &flops, is_csc),
        _ => gustavson::gustavson_product(ctx, &prod, &flops, is_csc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ewise::NO_MASK;
    use crate::matrix::{dense_reference, reference_mxm, DenseMatrix};
    use crate::ops::BinaryOpcode;

    const METHODS: [AxbMethod; 4] = [
        AxbMethod::Auto,
        AxbMethod::Dot,
        AxbMethod::Gustavson,
        AxbMethod::Heap,
    ];

    /// A reproducible pseudo-random matrix with about `percent`% entries
    fn random(nrows: usize, ncols: usize, percent: u64, seed: u64, format: Format) -> Matrix<i64> {
        let mut state = seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            state >> 33
        };
        let (mut rows, mut cols, mut vals) = (Vec::new(), Vec::new(), Vec::new());
        for i in 0..nrows {
            for j in 0..ncols {
                if next() % 100 < percent {
                    rows.push(i);
                    cols.push(j);
                    vals.push((next() % 19) as i64 - 9);
                }
            }
        }
        let mut m = Matrix::new_with_format(nrows, ncols, format);
        m.build(&rows, &cols, &vals, None).unwrap();
        m
    }

    fn multiply(
        ctx: &Context,
        format: Format,
        mask: Option<&Matrix<i64>>,
        semiring: &Semiring<i64>,
        a: &Matrix<i64>,
        b: &Matrix<i64>,
        desc: Descriptor,
    ) -> DenseMatrix<i64> {
        let (m, _) = shape_of(a, desc.transpose_a);
        let (_, n) = shape_of(b, desc.transpose_b);
        let mut c = Matrix::new_with_format(m, n, format);
        mxm(ctx, &mut c, mask, None, semiring, a, b, &desc).unwrap();
        c.check().unwrap();
        dense_reference(&c).unwrap()
    }

    fn transpose_dense<T: Clone>(d: &DenseMatrix<T>) -> DenseMatrix<T> {
        let mut t = DenseMatrix::empty(d.ncols, d.nrows);
        for i in 0..d.nrows {
            for j in 0..d.ncols {
                if let Some(v) = d.get(i, j) {
                    t.set(j, i, v.clone());
                }
            }
        }
        t
    }

    #[test]
    fn test_methods_agree_with_reference() {
        let ctx = Context::with_threads(4).unwrap().chunk(1);
        let semirings = [
            Semiring::<i64>::plus_times(),
            Semiring::builtin(BinaryOpcode::Min, BinaryOpcode::Plus).unwrap(),
            Semiring::builtin(BinaryOpcode::Max, BinaryOpcode::Times).unwrap(),
        ];
        for (seed, percent) in [(1, 5), (2, 30), (3, 90)] {
            for fa in [Format::ByRow, Format::ByCol] {
                for fb in [Format::ByRow, Format::ByCol] {
                    let a = random(13, 9, percent, seed, fa);
                    let b = random(9, 11, percent, seed + 7, fb);
                    for s in &semirings {
                        let expected =
                            reference_mxm(
                                &dense_reference(&a).unwrap(),
                                &dense_reference(&b).unwrap(),
                                s,
                            )
                            .unwrap();
                        for fc in [Format::ByRow, Format::ByCol] {
                            for method in METHODS {
                                let desc = Descriptor::default().method(method);
                                let got = multiply(&ctx, fc, None, s, &a, &b, desc);
                                assert_eq!(
                                    got,
                                    expected,
                                    "{} {method:?} {fa:?}{fb:?}->{fc:?}",
                                    s.name(),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_transposed_inputs() {
        let ctx = Context::sequential();
        let s = Semiring::<i64>::plus_times();
        // A is 7×5 used as A', B is 6×7 used as B'
        let a = random(7, 5, 40, 11, Format::ByRow);
        let b = random(6, 7, 40, 12, Format::ByCol);
        let at = transpose_dense(&dense_reference(&a).unwrap());
        let bt = transpose_dense(&dense_reference(&b).unwrap());
        let b2 = random(7, 6, 40, 13, Format::ByRow);

        let expected = reference_mxm(&at, &dense_reference(&b2).unwrap(), &s).unwrap();
        let expected_both = reference_mxm(&at, &bt, &s).unwrap();
        let expected_b = reference_mxm(&dense_reference(&b2).unwrap(), &bt, &s).unwrap();
        for fc in [Format::ByRow, Format::ByCol] {
            for method in METHODS {
                let d = Descriptor::default().method(method);
                assert_eq!(multiply(&ctx, fc, None, &s, &a, &b2, d.transpose_a()), expected);
                assert_eq!(
                    multiply(&ctx, fc, None, &s, &a, &b, d.transpose_a().transpose_b()),
                    expected_both,
                );
                assert_eq!(multiply(&ctx, fc, None, &s, &b2, &b, d.transpose_b()), expected_b);
            }
        }
    }

    #[test]
    fn test_masked_products() {
        let ctx = Context::with_threads(2).unwrap().chunk(1);
        let s = Semiring::<i64>::plus_times();
        let a = random(10, 8, 35, 21, Format::ByRow);
        let b = random(8, 12, 35, 22, Format::ByCol);
        let mask = random(10, 12, 25, 23, Format::ByRow);
        let full = reference_mxm(
            &dense_reference(&a).unwrap(),
            &dense_reference(&b).unwrap(),
            &s,
        )
        .unwrap();
        let md = dense_reference(&mask).unwrap();

        for (structural, complement) in [
            (false, false),
            (true, false),
            (false, true),
            (true, true),
        ] {
            let mut expected = DenseMatrix::empty(10, 12);
            for i in 0..10 {
                for j in 0..12 {
                    let m = match md.get(i, j) {
                        Some(v) => structural || *v != 0,
                        None => false,
                    };
                    if m != complement {
                        if let Some(v) = full.get(i, j) {
                            expected.set(i, j, *v);
                        }
                    }
                }
            }
            for fc in [Format::ByRow, Format::ByCol] {
                for method in METHODS {
                    let mut d = Descriptor::default().method(method);
                    if structural {
                        d = d.structural();
                    }
                    if complement {
                        d = d.complement();
                    }
                    let got = multiply(&ctx, fc, Some(&mask), &s, &a, &b, d);
                    assert_eq!(
                        got,
                        expected,
                        "structural {structural} complement {complement} {method:?}",
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_products() {
        let ctx = Context::sequential();
        let s = Semiring::<i64>::plus_times();
        // no entries at all
        let a = Matrix::<i64>::new(4, 3);
        let b = random(3, 5, 50, 31, Format::ByRow);
        for method in METHODS {
            let got = multiply(
                &ctx,
                Format::ByRow,
                None,
                &s,
                &a,
                &b,
                Descriptor::default().method(method),
            );
            assert_eq!(got.nvals(), 0);
        }
        // inner dimension zero
        let a = Matrix::<i64>::new(4, 0);
        let b = Matrix::<i64>::new(0, 5);
        let got = multiply(&ctx, Format::ByCol, None, &s, &a, &b, Descriptor::default());
        assert_eq!((got.nrows, got.ncols, got.nvals()), (4, 5, 0));
    }

    #[test]
    fn test_inner_dimension_mismatch() {
        let ctx = Context::sequential();
        let a = Matrix::<i64>::new(2, 3);
        let b = Matrix::<i64>::new(4, 2);
        let mut c = Matrix::<i64>::new(2, 2);
        let err = mxm(
            &ctx,
            &mut c,
            NO_MASK,
            None,
            &Semiring::<i64>::plus_times(),
            &a,
            &b,
            &Descriptor::default(),
        );
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_mixed_types_and_accumulate() {
        let ctx = Context::sequential();
        let a = Matrix::from_tuples(2, 2, &[0, 1], &[0, 1], &[2i32, 3]).unwrap();
        let b = Matrix::from_tuples(2, 2, &[0, 1], &[1, 1], &[0.5f64, 1.5]).unwrap();
        let mut c = Matrix::from_tuples(2, 2, &[0], &[1], &[10.0f32]).unwrap();
        let plus = BinaryOp::<f32>::plus();
        let s = Semiring::<f64>::plus_times();
        mxm(&ctx, &mut c, NO_MASK, Some(&plus), &s, &a, &b, &Descriptor::default()).unwrap();
        assert_eq!(c.extract_element(0, 1).unwrap(), 11.0);
        assert_eq!(c.extract_element(1, 1).unwrap(), 4.5);
        assert!(c.extract_element(0, 0).unwrap_err().is_no_value());
    }

    #[test]
    fn test_boolean_terminal_stops_early() {
        let ctx = Context::sequential();
        let a = Matrix::full_iso(3, 50, true, Format::ByRow);
        let b = Matrix::full_iso(50, 3, true, Format::ByCol);
        let s = Semiring::<bool>::builtin(BinaryOpcode::Lor, BinaryOpcode::Land).unwrap();
        for method in METHODS {
            let mut c = Matrix::<bool>::new(3, 3);
            mxm(
                &ctx,
                &mut c,
                NO_MASK,
                None,
                &s,
                &a,
                &b,
                &Descriptor::default().method(method),
            )
            .unwrap();
            assert_eq!(c.nvals().unwrap(), 9);
            assert!(c.extract_element(2, 1).unwrap());
        }
    }
}
