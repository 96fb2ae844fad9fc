//! `C<M> = accum(C, select(A))`: keep the entries for which a predicate holds
//!
//! The entries of A are cut into tasks. Each task first counts the entries
//! it keeps; a prefix sum over the tasks gives every task its slice of the
//! output. The second pass fills the slices, and the task owning the start
//! of a vector also writes that vector's pointer.

use rayon::prelude::*;

use super::{entry_tasks, logical};
use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Matrix, MatrixView, Operand};
use crate::ops::{BinaryOp, IndexUnaryOp};
use crate::parallel::{split_by_offsets_mut, EntryTask};
use crate::types::{cast_factory, Scalar};
use crate::utils::{exclusive_scan, try_filled};

/// `C<M> = accum(C, A(i,j) where op(A(i,j), i, j))`
pub fn select<C, M, A, X>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &IndexUnaryOp<X, bool>,
    a: &Matrix<A>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
    X: Scalar,
{
    check_same_shape("select", "A", c, shape_of(a, desc.transpose_a))?;
    if let Some(m) = mask {
        check_same_shape("select", "M", c, shape_of(m, false))?;
    }
    let ax = cast_factory::<A, X>()?;
    cast_factory::<A, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    let oa = Operand::new(a, desc.transpose_a, is_csc)?;
    let av = oa.view();
    let t = select_entries(ctx, &av, |p, j| {
        let (row, col) = logical(is_csc, av.index(p), j);
        op.call(&ax(av.value(p)), row, col)
    })?;
    burble!(ctx, op = op.name(), kept = t.i.len(), of = av.nnz(), "select");
    let resolved = mask.map(|m| ResolvedMask::new(m, is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}

/// The entries of `av` at which `keep(position, vector id)` holds
pub(crate) fn select_entries<A, K>(
    ctx: &Context,
    av: &MatrixView<'_, A>,
    keep: K,
) -> Result<Matrix<A>>
where
    A: Scalar,
    K: Fn(usize, usize) -> bool + Sync,
{
    let tasks = entry_tasks(ctx, av)?;
    let nvec = av.nvec();

    // phase 1: entries kept by each task
    let counts: Vec<usize> = ctx.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let mut n = 0;
                for k in task.kfirst..task.kend {
                    let j = av.vector_id(k);
                    let (s, e) = task.clip(av.vstart(k), av.vend(k));
                    n += (s..e).filter(|&p| keep(p, j)).count();
                }
                n
            })
            .collect()
    });
    let offsets = exclusive_scan(&counts);
    let cnz = offsets[tasks.len()];

    // phase 2: fill each task's slice and the pointers of the vectors it owns
    let mut cp = try_filled(nvec + 1, 0usize)?;
    let mut ci = try_filled(cnz, 0usize)?;
    let mut cx = if av.iso {
        Vec::new()
    } else {
        try_filled(cnz, A::default())?
    };
    {
        let mut owned: Vec<usize> = tasks.iter().map(|t| t.kown_start).collect();
        owned.push(nvec);
        let p_chunks = split_by_offsets_mut(&mut cp[..nvec], &owned);
        let i_chunks = split_by_offsets_mut(&mut ci, &offsets);
        let x_chunks = if av.iso {
            tasks.iter().map(|_| Default::default()).collect()
        } else {
            split_by_offsets_mut(&mut cx, &offsets)
        };
        ctx.install(|| {
            tasks
                .par_iter()
                .zip(offsets.par_iter())
                .zip(p_chunks)
                .zip(i_chunks)
                .zip(x_chunks)
                .for_each(|((((task, &base), pc), ic), xc)| {
                    fill_task(av, task, base, &keep, pc, ic, xc);
                })
        });
    }
    cp[nvec] = cnz;
    if av.iso {
        cx = vec![av.x[0].clone()];
    }

    Ok(Matrix::sparse_from_parts(
        av.vlen,
        av.vdim,
        av.is_csc,
        cp,
        av.is_hyper().then(|| av.h.to_vec()),
        ci,
        cx,
        av.iso,
    ))
}

fn fill_task<A: Scalar>(
    av: &MatrixView<'_, A>,
    task: &EntryTask,
    base: usize,
    keep: &(impl Fn(usize, usize) -> bool + Sync),
    pc: &mut [usize],
    ic: &mut [usize],
    xc: &mut [A],
) {
    let lo = task.kfirst.min(task.kown_start);
    let hi = task.kend.max(task.kown_end);
    let mut q = 0;
    for k in lo..hi {
        if (task.kown_start..task.kown_end).contains(&k) {
            pc[k - task.kown_start] = base + q;
        }
        let j = av.vector_id(k);
        let (s, e) = task.clip(av.vstart(k), av.vend(k));
        for p in s..e {
            if keep(p, j) {
                ic[q] = av.index(p);
                if !xc.is_empty() {
                    xc[q] = av.value(p).clone();
                }
                q += 1;
            }
        }
    }
    debug_assert_eq!(q, ic.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ewise::NO_MASK;
    use crate::matrix::{Format, SparsityControl};
    use crate::ops::IndexUnaryOpcode;

    fn square(n: usize, format: Format) -> Matrix<i32> {
        let mut m = Matrix::new_with_format(n, n, format);
        m.set_sparsity_control(SparsityControl::SPARSE).unwrap();
        let (mut r, mut c, mut v) = (Vec::new(), Vec::new(), Vec::new());
        for i in 0..n {
            for j in 0..n {
                if (i * 7 + j * 3) % 4 != 0 {
                    r.push(i);
                    c.push(j);
                    v.push((i * n + j) as i32);
                }
            }
        }
        m.build(&r, &c, &v, None).unwrap();
        m
    }

    #[test]
    fn test_tril_across_tasks() {
        let ctx = Context::with_threads(4).unwrap().chunk(1);
        for format in [Format::ByRow, Format::ByCol] {
            let a = square(9, format);
            let mut c = Matrix::<i32>::new_with_format(9, 9, format);
            select(
                &ctx,
                &mut c,
                NO_MASK,
                None,
                &IndexUnaryOp::<i32>::tril(0),
                &a,
                &Descriptor::default(),
            )
            .unwrap();
            c.check().unwrap();
            let (rows, cols, vals) = c.extract_tuples().unwrap();
            let expected = a.clone().extract_tuples().unwrap();
            let expected: Vec<_> = (0..expected.0.len())
                .filter(|&k| expected.1[k] <= expected.0[k])
                .map(|k| (expected.0[k], expected.1[k], expected.2[k]))
                .collect();
            let mut got: Vec<_> = (0..rows.len()).map(|k| (rows[k], cols[k], vals[k])).collect();
            got.sort();
            let mut expected = expected;
            expected.sort();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_select_by_value_keeps_iso() {
        let ctx = Context::sequential();
        let a = Matrix::full_iso(3, 4, 5u16, Format::ByRow);
        let mut c = Matrix::<u16>::new(3, 4);
        let op = IndexUnaryOp::value_cmp(IndexUnaryOpcode::ValueGt, 3u16).unwrap();
        select(&ctx, &mut c, NO_MASK, None, &op, &a, &Descriptor::default()).unwrap();
        assert_eq!(c.nvals().unwrap(), 12);
        let op = IndexUnaryOp::value_cmp(IndexUnaryOpcode::ValueLt, 3u16).unwrap();
        select(&ctx, &mut c, NO_MASK, None, &op, &a, &Descriptor::default()).unwrap();
        assert_eq!(c.nvals().unwrap(), 0);
    }

    #[test]
    fn test_owner_writes_vector_pointers() {
        let ctx = Context::with_threads(3).unwrap().chunk(1);
        // long vectors with empty ones in between, split across tasks
        let mut a = Matrix::<i32>::new_with_format(20, 6, Format::ByCol);
        a.set_sparsity_control(SparsityControl::SPARSE).unwrap();
        let rows: Vec<usize> = (0..20).chain(0..20).collect();
        let cols: Vec<usize> = std::iter::repeat(1)
            .take(20)
            .chain(std::iter::repeat(4).take(20))
            .collect();
        let vals: Vec<i32> = (0..40).collect();
        a.build(&rows, &cols, &vals, None).unwrap();
        let view = a.view();
        let t = select_entries(&ctx, &view, |p, _| *view.value(p) % 2 == 0).unwrap();
        t.check().unwrap();
        assert_eq!(t.p, vec![0, 0, 10, 10, 10, 20, 20]);
    }
}
