//! `C<M> = accum(C, op(A))` for unary and index-unary operators

use rayon::prelude::*;

use super::{entry_tasks, logical};
use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Matrix, Operand};
use crate::ops::{BinaryOp, IndexUnaryOp, UnaryOp};
use crate::parallel::split_by_offsets_mut;
use crate::types::{cast_factory, Scalar};
use crate::utils::try_filled;

/// `C<M> = accum(C, op(A))`
///
/// The result shares the pattern of A, so only the values are computed. An
/// iso A gives an iso result.
pub fn apply<C, M, A, X, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &UnaryOp<X, Z>,
    a: &Matrix<A>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
    X: Scalar,
    Z: Scalar,
{
    check_same_shape("apply", "A", c, shape_of(a, desc.transpose_a))?;
    if let Some(m) = mask {
        check_same_shape("apply", "M", c, shape_of(m, false))?;
    }
    cast_factory::<A, X>()?;
    cast_factory::<Z, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let oa = Operand::new(a, desc.transpose_a, c.is_csc)?;
    let av = oa.view();
    burble!(ctx, op = op.name(), nnz = av.nnz(), iso = av.iso, "apply");
    let t = av.cast::<X>()?.apply(op).to_matrix();
    let resolved = mask.map(|m| ResolvedMask::new(m, c.is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}

/// `C<M> = accum(C, op(A(i,j), i, j))`
pub fn apply_index<C, M, A, X, Z>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    op: &IndexUnaryOp<X, Z>,
    a: &Matrix<A>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
    X: Scalar,
    Z: Scalar,
{
    check_same_shape("apply_index", "A", c, shape_of(a, desc.transpose_a))?;
    if let Some(m) = mask {
        check_same_shape("apply_index", "M", c, shape_of(m, false))?;
    }
    let ax = cast_factory::<A, X>()?;
    cast_factory::<Z, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    let oa = Operand::new(a, desc.transpose_a, is_csc)?;
    let av = oa.view();
    let tasks = entry_tasks(ctx, &av)?;
    burble!(ctx, op = op.name(), nnz = av.nnz(), ntasks = tasks.len(), "apply_index");

    let mut x = try_filled(av.nnz(), Z::default())?;
    {
        let mut offsets: Vec<usize> = tasks.iter().map(|t| t.pstart).collect();
        offsets.push(av.nnz());
        let chunks = split_by_offsets_mut(&mut x, &offsets);
        ctx.install(|| {
            chunks.into_par_iter().zip(tasks.par_iter()).for_each(|(chunk, task)| {
                for k in task.kfirst..task.kend {
                    let j = av.vector_id(k);
                    let (s, e) = task.clip(av.vstart(k), av.vend(k));
                    for p in s..e {
                        let (row, col) = logical(is_csc, av.index(p), j);
                        chunk[p - task.pstart] = op.call(&ax(av.value(p)), row, col);
                    }
                }
            })
        });
    }
    let mut tv = av.with_values(x);
    tv.iso = false;
    let t = tv.to_matrix();
    let resolved = mask.map(|m| ResolvedMask::new(m, is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ewise::NO_MASK;
    use crate::matrix::Format;
    use crate::ops::UnaryOpcode;

    #[test]
    fn test_apply_negates_and_casts() {
        let ctx = Context::sequential();
        let a = Matrix::from_tuples(2, 3, &[0, 1], &[2, 0], &[4i32, -5]).unwrap();
        let mut c = Matrix::<f64>::new(2, 3);
        let ainv = UnaryOp::<i64>::builtin(UnaryOpcode::Ainv).unwrap();
        apply(&ctx, &mut c, NO_MASK, None, &ainv, &a, &Descriptor::default()).unwrap();
        assert_eq!(c.extract_element(0, 2).unwrap(), -4.0);
        assert_eq!(c.extract_element(1, 0).unwrap(), 5.0);
        assert_eq!(c.nvals().unwrap(), 2);
    }

    #[test]
    fn test_apply_keeps_iso() {
        let ctx = Context::sequential();
        let a = Matrix::full_iso(3, 3, 2u8, Format::ByCol);
        let mut c = Matrix::<u8>::new_with_format(3, 3, Format::ByCol);
        let double = UnaryOp::new("double", |x: &u8| x * 2);
        apply(&ctx, &mut c, NO_MASK, None, &double, &a, &Descriptor::default()).unwrap();
        assert!(c.is_iso());
        assert_eq!(c.extract_element(2, 1).unwrap(), 4);
    }

    #[test]
    fn test_apply_transposed_input() {
        let ctx = Context::sequential();
        let a = Matrix::from_tuples(2, 3, &[0], &[2], &[7i32]).unwrap();
        let mut c = Matrix::<i32>::new(3, 2);
        let id = UnaryOp::<i32>::builtin(UnaryOpcode::Identity).unwrap();
        apply(&ctx, &mut c, NO_MASK, None, &id, &a, &Descriptor::default().transpose_a()).unwrap();
        assert_eq!(c.extract_element(2, 0).unwrap(), 7);
    }

    #[test]
    fn test_apply_index_sees_logical_positions() {
        let ctx = Context::with_threads(3).unwrap().chunk(1);
        for format in [Format::ByRow, Format::ByCol] {
            let mut a = Matrix::<f32>::new_with_format(4, 5, format);
            let rows = [0, 1, 3, 3, 2];
            let cols = [4, 1, 0, 2, 3];
            a.build(&rows, &cols, &[1.0; 5], None).unwrap();
            let mut c = Matrix::<i64>::new(4, 5);
            let colindex = IndexUnaryOp::<f32, i64>::colindex(10);
            apply_index(
                &ctx,
                &mut c,
                NO_MASK,
                None,
                &colindex,
                &a,
                &Descriptor::default(),
            )
            .unwrap();
            for (&r, &col) in rows.iter().zip(&cols) {
                assert_eq!(c.extract_element(r, col).unwrap(), col as i64 + 10);
            }
            assert_eq!(c.nvals().unwrap(), 5);
        }
    }
}
