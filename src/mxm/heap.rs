//! Heap-based saxpy
//!
//! Output vector `j` is the merge of the vectors `L(:,k)` for every entry
//! `R(k,j)`. A min-heap keyed by `(index, position in R(:,j))` yields the
//! contributions in index order, and for equal indices in increasing `k`,
//! so sums are formed in the same order as by the other methods. The
//! workspace is O(nnz(R(:,j))) rather than O(cvlen).

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::{two_phase, Product};
use crate::config::Context;
use crate::error::Result;
use crate::matrix::{Matrix, MatrixView};
use crate::types::Scalar;

#[derive(Default)]
struct HeapWorkspace {
    heap: BinaryHeap<Reverse<(usize, usize)>>,
    /// `[next, end)` of each contributing vector of L
    cursor: Vec<(usize, usize)>,
}

impl HeapWorkspace {
    /// Load the vectors of L contributing to output vector `k`
    fn load<L: Scalar, R: Scalar>(
        &mut self,
        lv: &MatrixView<'_, L>,
        rv: &MatrixView<'_, R>,
        k: usize,
    ) {
        self.heap.clear();
        self.cursor.clear();
        for (t, pr) in (rv.vstart(k)..rv.vend(k)).enumerate() {
            let (ls, le) = lv.vector_range(rv.index(pr));
            if ls < le {
                self.heap.push(Reverse((lv.index(ls), t)));
            }
            self.cursor.push((ls, le));
        }
    }

    /// Pop the smallest contribution: its output index, its slot in R(:,j)
    /// and its position in L
    #[inline]
    fn pop<L: Scalar>(&mut self, lv: &MatrixView<'_, L>) -> Option<(usize, usize, usize)> {
        let Reverse((i, t)) = self.heap.pop()?;
        let pl = self.cursor[t].0;
        self.cursor[t].0 += 1;
        if self.cursor[t].0 < self.cursor[t].1 {
            self.heap.push(Reverse((lv.index(self.cursor[t].0), t)));
        }
        Some((i, t, pl))
    }
}

pub(crate) fn heap_product<L, R, Z, F>(
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
    let (lv, rv) = (prod.left, prod.right);
    let mask = prod.mask;

    let (cp, ci, cx) = two_phase(
        ctx,
        flops,
        || Ok(HeapWorkspace::default()),
        |ws, k| {
            ws.load(lv, rv, k);
            let mut filter = mask.map(|m| (m.filter(rv.vector_id(k)), m.complement));
            let mut last = None;
            let mut n = 0;
            while let Some((i, _, _)) = ws.pop(lv) {
                if last != Some(i) {
                    last = Some(i);
                    if filter.as_mut().map_or(true, |(f, comp)| f.test(i) != *comp) {
                        n += 1;
                    }
                }
            }
            n
        },
        |ws, k, ic, xc| {
            ws.load(lv, rv, k);
            let rstart = rv.vstart(k);
            let mut filter = mask.map(|m| (m.filter(rv.vector_id(k)), m.complement));
            let mut last = None;
            let mut open = false;
            let mut q = 0;
            while let Some((i, t, pl)) = ws.pop(lv) {
                if last != Some(i) {
                    last = Some(i);
                    open = filter.as_mut().map_or(true, |(f, comp)| f.test(i) != *comp);
                    if open {
                        ic[q] = i;
                        xc[q] = (prod.mult)(lv.value(pl), rv.value(rstart + t));
                        q += 1;
                    }
                } else if open {
                    let z = (prod.mult)(lv.value(pl), rv.value(rstart + t));
                    prod.add_into(&mut xc[q - 1], z);
                }
            }
            debug_assert_eq!(q, ic.len());
        },
    )?;

    Ok(Matrix::sparse_from_parts(
        prod.cvlen(),
        rv.vdim,
        is_csc,
        cp,
        rv.is_hyper().then(|| rv.h.to_vec()),
        ci,
        cx,
        false,
    ))
}
