//! `C<M> = accum(C, A(I,J))`

use rayon::prelude::*;

use super::Indices;
use crate::config::{burble, Context};
use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::ewise::mask::{accum_mask, ResolvedMask};
use crate::ewise::{check_same_shape, empty_mask_quick_return, shape_of};
use crate::matrix::{Matrix, MatrixView, Operand};
use crate::ops::BinaryOp;
use crate::parallel::assemble_vectors;
use crate::types::{cast_factory, Scalar};

/// `C<M> = accum(C, A(rows, cols))`
///
/// `C(r, c) = A(rows[r], cols[c])`. Index lists may repeat or permute
/// indices. With `desc.transpose_a` the submatrix is taken from A'.
#[allow(clippy::too_many_arguments)]
pub fn extract<C, M, A>(
    ctx: &Context,
    c: &mut Matrix<C>,
    mask: Option<&Matrix<M>>,
    accum: Option<&BinaryOp<C>>,
    a: &Matrix<A>,
    rows: Indices<'_>,
    cols: Indices<'_>,
    desc: &Descriptor,
) -> Result<()>
where
    C: Scalar,
    M: Scalar,
    A: Scalar,
{
    let (anrows, ancols) = shape_of(a, desc.transpose_a);
    rows.check(anrows)?;
    cols.check(ancols)?;
    check_same_shape("extract", "A(I,J)", c, (rows.len(anrows), cols.len(ancols)))?;
    if let Some(m) = mask {
        check_same_shape("extract", "M", c, shape_of(m, false))?;
    }
    cast_factory::<A, C>()?;
    if empty_mask_quick_return(c, mask, desc) {
        return Ok(());
    }

    let is_csc = c.is_csc;
    let oa = Operand::new(a, desc.transpose_a, is_csc)?;
    let av = oa.view();
    // in storage terms: indices select within vectors, the other list picks vectors
    let (ilist, jlist) = if is_csc { (rows, cols) } else { (cols, rows) };
    let ni = ilist.len(av.vlen);
    let nj = jlist.len(av.vdim);
    burble!(ctx, ni, nj, "extract");

    // (index in A, position in the output) sorted by index, for merging
    let inverse: Vec<(usize, usize)> = match ilist {
        Indices::All => Vec::new(),
        Indices::List(list) => {
            let mut inv: Vec<(usize, usize)> = list.iter().copied().zip(0..).collect();
            inv.sort_unstable();
            inv
        }
    };

    let vectors: Vec<(Vec<usize>, Vec<A>)> = ctx.install(|| {
        (0..nj)
            .into_par_iter()
            .map(|jj| extract_vector(&av, av.vector_range(jlist.get(jj)), ilist, &inverse))
            .collect()
    });
    let (p, i, x) = assemble_vectors(vectors)?;
    let t = Matrix::sparse_from_parts(ni, nj, is_csc, p, None, i, x, false);
    let resolved = mask.map(|m| ResolvedMask::new(m, is_csc, desc)).transpose()?;
    accum_mask(ctx, c, resolved.as_ref(), accum, t, desc, false)
}

/// The entries `I` of one vector, renumbered by their position in `I`
fn extract_vector<A: Scalar>(
    av: &MatrixView<'_, A>,
    (s, e): (usize, usize),
    ilist: Indices<'_>,
    inverse: &[(usize, usize)],
) -> (Vec<usize>, Vec<A>) {
    let mut idx = Vec::new();
    let mut val = Vec::new();
    if s == e {
        return (idx, val);
    }
    match ilist {
        Indices::All => {
            idx.extend((s..e).map(|p| av.index(p)));
            val.extend((s..e).map(|p| av.value(p).clone()));
        }
        Indices::List(list) if av.is_full() || list.len() < e - s => {
            // look every requested index up: output comes out in order
            for (ii, &i) in list.iter().enumerate() {
                if let Some(p) = av.find_in_vector(s, e, i) {
                    idx.push(ii);
                    val.push(av.value(p).clone());
                }
            }
        }
        Indices::List(_) => {
            // walk the vector against the sorted inverse, then order by output
            let mut hits: Vec<(usize, usize)> = Vec::new();
            let mut q = 0;
            for p in s..e {
                let i = av.index(p);
                while q < inverse.len() && inverse[q].0 < i {
                    q += 1;
                }
                let mut r = q;
                while r < inverse.len() && inverse[r].0 == i {
                    hits.push((inverse[r].1, p));
                    r += 1;
                }
            }
            hits.sort_unstable();
            for (ii, p) in hits {
                idx.push(ii);
                val.push(av.value(p).clone());
            }
        }
    }
    (idx, val)
}
