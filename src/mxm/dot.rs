//! Dot-product method: `C(i,j) = L(:,i)' * R(:,j)`
//!
//! The left operand arrives stored the other way round, so each of its
//! vectors is one row of the output. A non-complemented mask limits the
//! dot products to the mask's entries, which makes this the method of choice
//! when the mask is much sparser than the product.

use super::{two_phase, KernelMask, Product};
use crate::config::Context;
use crate::error::Result;
use crate::matrix::{Matrix, MatrixView};
use crate::types::Scalar;
use crate::utils::exclusive_scan;

/// Call `f(pl, pr)` for every pair of entries sharing an index `k`, in
/// increasing `k`, until it returns false
///
/// When one side holds more than `ratio` times the entries of the other,
/// the shorter side is walked and each index binary-searched in the longer.
fn visit<L: Scalar, R: Scalar>(
    lt: &MatrixView<'_, L>,
    (ls, le): (usize, usize),
    rv: &MatrixView<'_, R>,
    (rs, re): (usize, usize),
    ratio: usize,
    mut f: impl FnMut(usize, usize) -> bool,
) {
    if ls >= le || rs >= re {
        return;
    }
    if lt.is_full() {
        for pr in rs..re {
            if !f(ls + rv.index(pr), pr) {
                return;
            }
        }
        return;
    }
    if rv.is_full() {
        for pl in ls..le {
            if !f(pl, rs + lt.index(pl)) {
                return;
            }
        }
        return;
    }
    if lt.index(le - 1) < rv.index(rs) || rv.index(re - 1) < lt.index(ls) {
        return;
    }
    let (nl, nr) = (le - ls, re - rs);
    if nl > ratio.saturating_mul(nr) {
        let mut pl = ls;
        for pr in rs..re {
            pl += lt.i[pl..le].partition_point(|&k| k < rv.index(pr));
            if pl == le {
                return;
            }
            if lt.index(pl) == rv.index(pr) && !f(pl, pr) {
                return;
            }
        }
        return;
    }
    if nr > ratio.saturating_mul(nl) {
        let mut pr = rs;
        for pl in ls..le {
            pr += rv.i[pr..re].partition_point(|&k| k < lt.index(pl));
            if pr == re {
                return;
            }
            if rv.index(pr) == lt.index(pl) && !f(pl, pr) {
                return;
            }
        }
        return;
    }
    let (mut pl, mut pr) = (ls, rs);
    while pl < le && pr < re {
        let (kl, kr) = (lt.index(pl), rv.index(pr));
        if kl < kr {
            pl += 1;
        } else if kr < kl {
            pr += 1;
        } else {
            if !f(pl, pr) {
                return;
            }
            pl += 1;
            pr += 1;
        }
    }
}

/// Call `f(i, kl)` for every output index of vector `j` that may hold an
/// entry, with `kl` the position of vector `i` in `lt`
fn candidates<L: Scalar>(
    lt: &MatrixView<'_, L>,
    mask: Option<KernelMask<'_>>,
    j: usize,
    mut f: impl FnMut(usize, usize),
) {
    match mask {
        Some(m) if !m.complement => {
            let (s, e) = m.view.vector_range(j);
            for pm in s..e {
                if !*m.view.value(pm) {
                    continue;
                }
                let i = m.view.index(pm);
                if let Some(kl) = lt.find_vector(i) {
                    f(i, kl);
                }
            }
        }
        Some(m) => {
            let mut filter = m.filter(j);
            for kl in 0..lt.nvec() {
                let i = lt.vector_id(kl);
                if !filter.test(i) {
                    f(i, kl);
                }
            }
        }
        None => {
            for kl in 0..lt.nvec() {
                f(lt.vector_id(kl), kl);
            }
        }
    }
}

pub(crate) fn dot_product<L, R, Z, F>(
    ctx: &Context,
    prod: &Product<'_, L, R, Z, F>,
    is_csc: bool,
) -> Result<Matrix<Z>>
where
    L: Scalar,
    R: Scalar,
    Z: Scalar,
    F: Fn(&L, &R) -> Z + Sync,
{
    let (lt, rv) = (prod.left, prod.right);
    let mask = prod.mask;
    let ratio = ctx.merge_ratio;

    let per_vector: Vec<usize> = (0..rv.nvec())
        .map(|k| {
            let ncand = match mask {
                Some(m) if !m.complement => {
                    let (s, e) = m.view.vector_range(rv.vector_id(k));
                    e - s
                }
                _ => lt.nvec(),
            };
            (rv.vend(k) - rv.vstart(k) + 1) * ncand
        })
        .collect();
    let work = exclusive_scan(&per_vector);

    let (cp, ci, cx) = two_phase(
        ctx,
        &work,
        || Ok(()),
        |_, k| {
            let rrange = (rv.vstart(k), rv.vend(k));
            let mut n = 0;
            candidates(lt, mask, rv.vector_id(k), |_, kl| {
                let mut found = false;
                visit(lt, (lt.vstart(kl), lt.vend(kl)), rv, rrange, ratio, |_, _| {
                    found = true;
                    false
                });
                n += usize::from(found);
            });
            n
        },
        |_, k, ic, xc| {
            let rrange = (rv.vstart(k), rv.vend(k));
            let mut q = 0;
            candidates(lt, mask, rv.vector_id(k), |i, kl| {
                let mut sum: Option<Z> = None;
                visit(lt, (lt.vstart(kl), lt.vend(kl)), rv, rrange, ratio, |pl, pr| {
                    let t = (prod.mult)(lt.value(pl), rv.value(pr));
                    if let Some(s) = sum.as_mut() {
                        prod.add_into(s, t);
                    } else {
                        sum = Some(t);
                    }
                    sum.as_ref().map_or(true, |s| !prod.add.is_terminal(s))
                });
                if let Some(z) = sum {
                    ic[q] = i;
                    xc[q] = z;
                    q += 1;
                }
            });
            debug_assert_eq!(q, ic.len());
        },
    )?;

    Ok(Matrix::sparse_from_parts(
        lt.vdim,
        rv.vdim,
        is_csc,
        cp,
        rv.is_hyper().then(|| rv.h.to_vec()),
        ci,
        cx,
        false,
    ))
}
