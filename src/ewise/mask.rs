//! Writing a result into its output: `C<M> = accum(C, T)`
//!
//! Every operation computes a result `T` and hands it here. With an
//! accumulator, `Z = C ∪accum T`; otherwise `Z = T`. Without a mask,
//! `C = Z`. With one, each position takes `Z(i,j)` where the mask allows it,
//! and elsewhere keeps `C(i,j)` (or is cleared under `replace`).

use std::any::Any;
use std::cmp::Ordering;

use rayon::prelude::*;

use super::merge::{ewise_core, Merge, MaskFilter, Side};
use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::matrix::{Matrix, MatrixView, Operand, Sparsity};
use crate::ops::BinaryOp;
use crate::parallel::assemble_vectors;
use crate::types::{cast_factory, Scalar};

/// A mask resolved for the kernels: oriented like the output, with its
/// values cast to `bool` (or all `true` for a structural mask)
pub(crate) struct ResolvedMask<'a, M: Scalar> {
    operand: Operand<'a, M>,
    structural: bool,
    pub(crate) complement: bool,
}

impl<'a, M: Scalar> ResolvedMask<'a, M> {
    pub(crate) fn new(m: &'a Matrix<M>, is_csc: bool, desc: &Descriptor) -> Result<Self> {
        if !desc.mask_structural {
            // user-defined masks must be structural
            cast_factory::<M, bool>()?;
        }
        Ok(Self {
            operand: Operand::new(m, false, is_csc)?,
            structural: desc.mask_structural,
            complement: desc.mask_complement,
        })
    }

    /// The mask as a boolean view
    pub(crate) fn view(&self) -> Result<MatrixView<'_, bool>> {
        let v = self.operand.view();
        if self.structural {
            Ok(v.structure())
        } else {
            v.cast::<bool>()
        }
    }

    pub(crate) fn nnz(&self) -> usize {
        self.operand.view().nnz()
    }

    /// True if this mask is `m` itself
    pub(crate) fn is<U>(&self, m: &Matrix<U>) -> bool {
        self.operand.is(m)
    }
}

/// Reinterpret or typecast a result matrix into the output type
pub(crate) fn cast_matrix<Z: Scalar, C: Scalar>(t: Matrix<Z>) -> Result<Matrix<C>> {
    let boxed: Box<dyn Any> = Box::new(t);
    match boxed.downcast::<Matrix<C>>() {
        Ok(same) => Ok(*same),
        Err(boxed) => {
            let f = cast_factory::<Z, C>()?;
            // the downcast to our own type cannot fail
            let t = match boxed.downcast::<Matrix<Z>>() {
                Ok(t) => *t,
                Err(_) => unreachable!("matrix changed type"),
            };
            let x: Vec<C> = t.x.iter().map(f).collect();
            let mut out = Matrix::<C>::empty_shaped(t.vlen, t.vdim, t.is_csc);
            out.copy_settings_from(&t);
            out.sparsity = t.sparsity;
            out.p = t.p;
            out.h = t.h;
            out.b = t.b;
            out.i = t.i;
            out.x = x;
            out.iso = t.iso;
            out.nvals = t.nvals;
            out.nzombies = t.nzombies;
            out.jumbled = t.jumbled;
            debug_assert!(t.pending.is_none());
            Ok(out)
        }
    }
}

/// `C<M> = accum(C, T)`
///
/// `mask_applied` says the kernel already restricted `T` to the mask; when
/// there is also no accumulator and C is empty or being replaced, `T`
/// simply becomes the new C.
pub(crate) fn accum_mask<C: Scalar, M: Scalar, Z: Scalar>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&ResolvedMask<'_, M>>,
    accum: Option<&BinaryOp<C>>,
    t: Matrix<Z>,
    desc: &Descriptor,
    mask_applied: bool,
) -> Result<()> {
    debug_assert_eq!(c.is_csc, t.is_csc);
    let t: Matrix<C> = cast_matrix(t)?;

    let c_empty = !c.has_pending() && c.live_entries() == 0;
    if accum.is_none() && (mask.is_none() || mask_applied) && (desc.replace || c_empty) {
        burble!(ctx, "transplant result into C");
        return transplant(c, t);
    }

    let mut t = t;
    t.wait()?;
    if t.sparsity == Sparsity::Bitmap {
        t.convert_to_sparse()?;
    }
    let c_ready = c.prepare()?;
    let c_view = c_ready.view();
    let z = match accum {
        Some(op) => {
            let t_view = t.view();
            let merge = Merge {
                union: true,
                ratio: ctx.merge_ratio,
                f: |x: &C, y: &C| op.call(x, y),
                fa: |x: &C| x.clone(),
                fb: |y: &C| y.clone(),
            };
            ewise_core(ctx, &merge, &c_view, &t_view, None)?
        }
        None => t,
    };

    let result = match mask {
        None => z,
        Some(mask) => {
            let m = mask.view()?;
            masked_merge(ctx, &c_view, &z.view(), &m, mask.complement, desc.replace)?
        }
    };
    drop(c_ready);
    transplant(c, result)
}

/// Replace C by `t`, keeping C's settings, and conform
fn transplant<C: Scalar>(c: &mut Matrix<C>, mut t: Matrix<C>) -> Result<()> {
    t.copy_settings_from(c);
    *c = t;
    c.conform()
}

/// `C(i,j) = mask(i,j) ? Z(i,j) : (replace ? none : C(i,j))`, vector by
/// vector in parallel
fn masked_merge<C: Scalar>(
    ctx: &Context,
    c: &MatrixView<'_, C>,
    z: &MatrixView<'_, C>,
    m: &MatrixView<'_, bool>,
    complement: bool,
    replace: bool,
) -> Result<Matrix<C>> {
    let hyper = c.is_hyper() && z.is_hyper();
    let ids: Vec<usize> = if hyper {
        let mut ids: Vec<usize> = c.h.iter().chain(z.h).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    } else {
        (0..c.vdim).collect()
    };

    let vectors: Vec<(Vec<usize>, Vec<C>)> = ctx.install(|| {
        ids.par_iter()
            .map(|&j| {
                let (c0, c1) = c.vector_range(j);
                let (z0, z1) = z.vector_range(j);
                let mwhole = m.vector_range(j);
                let mut filter = MaskFilter::new(Side::new(m, mwhole, mwhole));
                let mut idx = Vec::with_capacity(c1 - c0 + z1 - z0);
                let mut val = Vec::with_capacity(idx.capacity());
                let (mut pc, mut pz) = (c0, z0);
                while pc < c1 || pz < z1 {
                    let ic = (pc < c1).then(|| c.index(pc));
                    let iz = (pz < z1).then(|| z.index(pz));
                    let (i, in_c, in_z) = match (ic, iz) {
                        (Some(x), Some(y)) => match x.cmp(&y) {
                            Ordering::Less => (x, true, false),
                            Ordering::Greater => (y, false, true),
                            Ordering::Equal => (x, true, true),
                        },
                        (Some(x), None) => (x, true, false),
                        (None, Some(y)) => (y, false, true),
                        (None, None) => break,
                    };
                    if filter.test(i) != complement {
                        if in_z {
                            idx.push(i);
                            val.push(z.value(pz).clone());
                        }
                    } else if in_c && !replace {
                        idx.push(i);
                        val.push(c.value(pc).clone());
                    }
                    if in_c {
                        pc += 1;
                    }
                    if in_z {
                        pz += 1;
                    }
                }
                (idx, val)
            })
            .collect()
    });

    let (p, i, x) = assemble_vectors(vectors)?;
    Ok(Matrix::sparse_from_parts(
        c.vlen,
        c.vdim,
        c.is_csc,
        p,
        hyper.then_some(ids),
        i,
        x,
        false,
    ))
}
