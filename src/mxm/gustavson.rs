//! Gustavson's saxpy: `C(:,j) = Σ_k L(:,k) * R(k,j)` scattered into a dense
//! workspace
//!
//! Each thread owns a workspace of `cvlen` slots, reused for every output
//! vector it computes. Slots are claimed with a watermark: a slot belongs to
//! the current vector only if its mark equals the current stamp, so nothing
//! is cleared between vectors.

use super::{two_phase, KernelMask, Product};
use crate::config::Context;
use crate::error::Result;
use crate::matrix::{Matrix, MatrixView};
use crate::types::Scalar;
use crate::utils::try_filled;

pub(crate) struct Workspace<Z> {
    mark: Vec<usize>,
    mask_mark: Vec<usize>,
    stamp: usize,
    values: Vec<Z>,
    list: Vec<usize>,
}

impl<Z: Scalar> Workspace<Z> {
    pub(crate) fn new(cvlen: usize, masked: bool) -> Result<Self> {
        Ok(Self {
            mark: try_filled(cvlen, 0)?,
            mask_mark: if masked { try_filled(cvlen, 0)? } else { Vec::new() },
            stamp: 0,
            values: try_filled(cvlen, Z::default())?,
            list: Vec::new(),
        })
    }

    /// Start output vector `j`, scattering its mask entries
    fn start(&mut self, mask: Option<KernelMask<'_>>, j: usize) {
        self.stamp += 1;
        self.list.clear();
        if let Some(m) = mask {
            let (s, e) = m.view.vector_range(j);
            for pm in s..e {
                if *m.view.value(pm) {
                    self.mask_mark[m.view.index(pm)] = self.stamp;
                }
            }
        }
    }

    #[inline]
    fn allowed(&self, mask: Option<KernelMask<'_>>, i: usize) -> bool {
        match mask {
            None => true,
            Some(m) => (self.mask_mark[i] == self.stamp) != m.complement,
        }
    }

    /// Claim slot `i` for the current vector; false if already claimed
    #[inline]
    fn claim(&mut self, i: usize) -> bool {
        if self.mark[i] == self.stamp {
            return false;
        }
        self.mark[i] = self.stamp;
        self.list.push(i);
        true
    }
}

/// Compute the product with Gustavson's method
///
/// `flops` is the running sum of the multiply count of every output vector.
pub(crate) fn gustavson_product<L, R, Z, F>(
    ctx: &Context,
    prod: &Product<'_, L, R, Z, F>,
    flops: &[usize],
    is_csc: bool,
) -> Result<Matrix<Z>>
where
    L: Scalar,
    R: Scalar,
    Z: Scalar,
    F: Fn(&L, &R) -> Z + Sync,
{
    let (lv, rv): (&MatrixView<'_, L>, &MatrixView<'_, R>) = (prod.left, prod.right);
    let cvlen = prod.cvlen();
    let mask = prod.mask;

    let (cp, ci, cx) = two_phase(
        ctx,
        flops,
        || Workspace::<Z>::new(cvlen, mask.is_some()),
        |ws, k| {
            ws.start(mask, rv.vector_id(k));
            for pr in rv.vstart(k)..rv.vend(k) {
                let (ls, le) = lv.vector_range(rv.index(pr));
                for pl in ls..le {
                    let i = lv.index(pl);
                    if ws.allowed(mask, i) {
                        ws.claim(i);
                    }
                }
            }
            ws.list.len()
        },
        |ws, k, ic, xc| {
            ws.start(mask, rv.vector_id(k));
            for pr in rv.vstart(k)..rv.vend(k) {
                let r = rv.value(pr);
                let (ls, le) = lv.vector_range(rv.index(pr));
                for pl in ls..le {
                    let i = lv.index(pl);
                    if !ws.allowed(mask, i) {
                        continue;
                    }
                    let t = (prod.mult)(lv.value(pl), r);
                    if ws.claim(i) {
                        ws.values[i] = t;
                    } else {
                        prod.add_into(&mut ws.values[i], t);
                    }
                }
            }
            debug_assert_eq!(ws.list.len(), ic.len());

            // gather in index order: scan a dense result, sort a sparse one
            if ws.list.len() * 16 > cvlen {
                let mut q = 0;
                for i in 0..cvlen {
                    if ws.mark[i] == ws.stamp {
                        ic[q] = i;
                        xc[q] = std::mem::take(&mut ws.values[i]);
                        q += 1;
                    }
                }
            } else {
                ws.list.sort_unstable();
                for (q, &i) in ws.list.iter().enumerate() {
                    ic[q] = i;
                    xc[q] = std::mem::take(&mut ws.values[i]);
                }
            }
        },
    )?;

    Ok(Matrix::sparse_from_parts(
        cvlen,
        rv.vdim,
        is_csc,
        cp,
        rv.is_hyper().then(|| rv.h.to_vec()),
        ci,
        cx,
        false,
    ))
}
