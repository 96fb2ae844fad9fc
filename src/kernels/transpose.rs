//! `C<M> = accum(C, A')`

use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Matrix, Operand};
use crate::ops::BinaryOp;
use crate::types::{cast_factory, Scalar};

/// `C<M> = accum(C, A')`
///
/// `desc.transpose_a` cancels the transpose, giving `C<M> = accum(C, A)`.
/// When A is stored in the orientation opposite to C the result shares its
/// arrays' layout and only a copy is made; otherwise the entries are
/// bucketed into the new orientation.
pub fn transpose<C, M, A>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    a: &Matrix<A>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
{
    let transpose = !desc.transpose_a;
    check_same_shape("transpose", "the transpose of A", c, shape_of(a, transpose))?;
    if let Some(m) = mask {
        check_same_shape("transpose", "M", c, shape_of(m, false))?;
    }
    cast_factory::<A, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    burble!(
        ctx,
        transpose,
        in_place = (a.is_csc ^ transpose) == is_csc,
        nrows = a.nrows(),
        ncols = a.ncols(),
        "transpose"
    );
    let t = Operand::new(a, transpose, is_csc)?.view().to_matrix();
    let resolved = mask.map(|m| ResolvedMask::new(m, is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}
