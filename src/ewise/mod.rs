//! # Element-wise operations
//!
//! `C<M> = accum(C, A ∪op B)` ([`ewise_add`]) and `C<M> = accum(C, A ∩op B)`
//! ([`ewise_mult`]). Inputs are conformed to the orientation of C, the merge
//! runs in [`merge`], and the result is written through [`mask`].
//!
//! A non-complemented mask is applied inside the merge when that is cheap:
//! when it is much sparser than the inputs (the mask then drives the merge)
//! or when every input is either full or the mask itself (entries outside
//! the mask are simply filtered). Any other mask is applied by the writer.

pub mod mask;
pub mod merge;

use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::matrix::{Matrix, Operand};
use crate::ops::BinaryOp;
use crate::types::{cast_factory, CastFn, Scalar};

use mask::{accum_mask, ResolvedMask};
use merge::{ewise_core, MaskUse, Merge};

/// Pass as the mask argument of any operation to mean "no mask"
pub const NO_MASK: Option<&'static Matrix<bool>> = None;

/// Logical shape of `m`, or of its transpose
pub(crate) fn shape_of<T: Scalar>(m: &Matrix<T>, transpose: bool) -> (usize, usize) {
    if transpose {
        (m.ncols(), m.nrows())
    } else {
        (m.nrows(), m.ncols())
    }
}

/// Fail unless `m` has exactly the shape of C
pub(crate) fn check_same_shape<C: Scalar>(
    op: &'static str,
    what: &str,
    c: &Matrix<C>,
    shape: (usize, usize),
) -> Result<()> {
    if shape != (c.nrows(), c.ncols()) {
        return Err(Error::dimension_mismatch(
            op,
            format!(
                "{what} is {}×{} but C is {}×{}",
                shape.0,
                shape.1,
                c.nrows(),
                c.ncols()
            ),
        ));
    }
    Ok(())
}

/// Handle a complemented empty mask, which allows nothing
///
/// Returns true if the operation is complete.
pub(crate) fn empty_mask_quick_return<C: Scalar, M: Scalar>(
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    desc: &Descriptor,
) -> bool {
    if mask.is_none() && desc.mask_complement {
        if desc.replace {
            c.clear();
        }
        return true;
    }
    false
}

/// `C<M> = accum(C, A ∪op B)`
///
/// Entries present in both inputs are combined with `op`; entries present in
/// only one are typecast into the operator's output type and copied.
pub fn ewise_add<C, M, A, B, X, Y, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &BinaryOp<X, Y, Z>,
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
    ewise("ewise_add", true, ctx, c, mask, accum, op, a, b, desc)
}

/// `C<M> = accum(C, A ∩op B)`
pub fn ewise_mult<C, M, A, B, X, Y, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &BinaryOp<X, Y, Z>,
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
    ewise("ewise_mult", false, ctx, c, mask, accum, op, a, b, desc)
}

fn unused_cast<S, D: Default>(_: &S) -> D {
    D::default()
}

#[allow(clippy::too_many_arguments)]
fn ewise<C, M, A, B, X, Y, Z>(
    what: &'static str,
    union: bool,
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &BinaryOp<X, Y, Z>,
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
    check_same_shape(what, "A", c, shape_of(a, desc.transpose_a))?;
    check_same_shape(what, "B", c, shape_of(b, desc.transpose_b))?;
    if let Some(m) = mask {
        check_same_shape(what, "M", c, shape_of(m, false))?;
    }

    // every domain is checked before C is touched
    let ax = cast_factory::<A, X>()?;
    let by = cast_factory::<B, Y>()?;
    // an intersection never copies a lone entry
    let az: CastFn<A, Z> = if union { cast_factory::<A, Z>()? } else { unused_cast::<A, Z> };
    let bz: CastFn<B, Z> = if union { cast_factory::<B, Z>()? } else { unused_cast::<B, Z> };
    cast_factory::<Z, C>()?;

    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    let oa = Operand::new(a, desc.transpose_a, is_csc)?;
    let ob = Operand::new(b, desc.transpose_b, is_csc)?;
    let resolved = mask.map(|m| ResolvedMask::new(m, is_csc, desc)).transpose()?;
    let (av, bv) = (oa.view(), ob.view());

    let mask_use = match (mask, &resolved) {
        (Some(m), Some(rm)) if !rm.complement => {
            if ctx.mask_sparsity_ratio.saturating_mul(rm.nnz()) < av.nnz() + bv.nnz() {
                Some(MaskUse::Drive)
            } else if (av.is_full() || oa.is(m)) && (bv.is_full() || ob.is(m)) {
                Some(MaskUse::Filter)
            } else {
                None
            }
        }
        _ => None,
    };
    let mask_view = match (&resolved, mask_use) {
        (Some(rm), Some(_)) => Some(rm.view()?),
        _ => None,
    };
    burble!(ctx, op = op.name(), union, mask = ?mask_use, what);

    let merge = Merge {
        union,
        ratio: ctx.merge_ratio,
        f: |x: &A, y: &B| op.call(&ax(x), &by(y)),
        fa: az,
        fb: bz,
    };
    let t: Matrix<Z> = ewise_core(
        ctx,
        &merge,
        &av,
        &bv,
        mask_view.as_ref().zip(mask_use),
    )?;
    drop(mask_view);
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, mask_use.is_some())
}
