//! Reductions with a monoid: to a scalar, or to a vector along rows

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use super::entry_tasks;
use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Matrix, Operand};
use crate::ops::{BinaryOp, Monoid};
use crate::types::{cast_factory, Scalar};

/// Sum every entry of `a` with `monoid`
///
/// An empty matrix reduces to the monoid's identity. Once any task reaches
/// the monoid's terminal value, every task stops.
pub fn reduce_to_scalar<A: Scalar, Z: Scalar>(
    ctx: &Context,
    monoid: &Monoid<Z>,
    a: &Matrix<A>,
) -> Result<Z> {
    let az = cast_factory::<A, Z>()?;
    let ready = a.prepare()?;
    let av = ready.view();
    if av.nnz() == 0 {
        return Ok(monoid.identity().clone());
    }
    let tasks = entry_tasks(ctx, &av)?;
    burble!(
        ctx,
        monoid = monoid.op().name(),
        nnz = av.nnz(),
        ntasks = tasks.len(),
        "reduce to scalar"
    );

    let done = AtomicBool::new(false);
    let partial: Vec<Z> = ctx.install(|| {
        tasks
            .par_iter()
            .map(|task| {
                let mut sum = monoid.identity().clone();
                for p in task.pstart..task.pend {
                    if done.load(Ordering::Relaxed) {
                        break;
                    }
                    sum = monoid.call(&sum, &az(av.value(p)));
                    if monoid.is_terminal(&sum) {
                        done.store(true, Ordering::Relaxed);
                        break;
                    }
                }
                sum
            })
            .collect()
    });

    // tasks are combined in order, so the result does not depend on timing
    // unless the terminal value was reached
    let mut sum = monoid.identity().clone();
    for z in &partial {
        if monoid.is_terminal(&sum) {
            break;
        }
        sum = monoid.call(&sum, z);
    }
    Ok(sum)
}

/// `C<M> = accum(C, Σ_j A(:,j))`: reduce each row of A to one entry of the
/// column vector C
///
/// With `desc.transpose_a` the columns of A are reduced instead. A row with
/// no entries gives no entry.
pub fn reduce_to_vector<C, M, A, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    monoid: &Monoid<Z>,
    a: &Matrix<A>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
    Z: Scalar,
{
    let (nrows, _) = shape_of(a, desc.transpose_a);
    check_same_shape("reduce_to_vector", "the reduction", c, (nrows, 1))?;
    if let Some(m) = mask {
        check_same_shape("reduce_to_vector", "M", c, shape_of(m, false))?;
    }
    let az = cast_factory::<A, Z>()?;
    cast_factory::<Z, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    // one vector per row
    let oa = Operand::new(a, desc.transpose_a, false)?;
    let av = oa.view();
    burble!(ctx, monoid = monoid.op().name(), rows = nrows, "reduce to vector");
    let sums: Vec<(usize, Z)> = ctx.install(|| {
        (0..av.nvec())
            .into_par_iter()
            .filter_map(|k| {
                let (s, e) = (av.vstart(k), av.vend(k));
                if s == e {
                    return None;
                }
                let mut sum = az(av.value(s));
                for p in s + 1..e {
                    if monoid.is_terminal(&sum) {
                        break;
                    }
                    sum = monoid.call(&sum, &az(av.value(p)));
                }
                Some((av.vector_id(k), sum))
            })
            .collect()
    });

    let n = sums.len();
    let (rows, vals): (Vec<usize>, Vec<Z>) = sums.into_iter().unzip();
    let t = if c.is_csc {
        Matrix::sparse_from_parts(nrows, 1, true, vec![0, n], None, rows, vals, false)
    } else {
        Matrix::sparse_from_parts(
            1,
            nrows,
            false,
            (0..=n).collect(),
            Some(rows),
            vec![0; n],
            vals,
            false,
        )
    };
    let resolved = mask.map(|m| ResolvedMask::new(m, c.is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}
