//! Transposition: O(1) reinterpretation and materialised re-orientation

use tracing::trace;

use super::tuples::{build_from_tuples, Dup};
use super::{Format, Matrix, MatrixView, Sparsity};
use crate::error::Result;
use crate::types::Scalar;
use crate::utils::{cumsum_in_place, try_filled, try_vec};

impl<T: Scalar> Matrix<T> {
    /// Replace the matrix by its transpose in O(1)
    ///
    /// The arrays are left alone and read in the other orientation: a
    /// matrix stored by column becomes its transpose stored by row.
    pub fn transpose_in_place(&mut self) {
        self.is_csc = !self.is_csc;
    }

    /// Store the same matrix in the given orientation
    pub fn set_format(&mut self, format: Format) -> Result<()> {
        if format == self.format() {
            return Ok(());
        }
        self.wait()?;
        if self.sparsity == Sparsity::Bitmap {
            self.convert_to_sparse()?;
        }
        let mut t = transpose_storage(&self.view())?;
        t.copy_settings_from(self);
        *self = t;
        self.conform()
    }
}

/// Re-orient a finished matrix: same logical content, other orientation
///
/// Full matrices are permuted directly. Sparse input is bucketed by its
/// indices with a counting sort, unless the output would have far more
/// vectors than entries, in which case the entries are sorted instead and
/// the result is hypersparse.
pub(crate) fn transpose_storage<T: Scalar>(a: &MatrixView<'_, T>) -> Result<Matrix<T>> {
    let (vlen, vdim) = (a.vdim, a.vlen);
    let is_csc = !a.is_csc;

    if a.is_full() {
        let x = if a.iso {
            vec![a.x[0].clone()]
        } else {
            let mut x = try_vec(vlen * vdim)?;
            for j in 0..vdim {
                for i in 0..vlen {
                    x.push(a.x[i * a.vlen + j].clone());
                }
            }
            x
        };
        return Ok(Matrix::full_from_parts(vlen, vdim, is_csc, x, a.iso));
    }

    let anz = a.nnz();
    if anz.saturating_mul(16) < vdim {
        trace!(anz, vdim, "transpose by sorting");
        let mut ti = try_vec(anz)?;
        let mut tj = try_vec(anz)?;
        let mut tx = try_vec(anz)?;
        for k in 0..a.nvec() {
            let j = a.vector_id(k);
            for pos in a.vstart(k)..a.vend(k) {
                ti.push(j);
                tj.push(a.i[pos]);
                tx.push(a.value(pos).clone());
            }
        }
        let mut t = build_from_tuples(vlen, vdim, is_csc, &ti, &tj, &tx, Dup::Last, false)?;
        if a.iso {
            t.x = vec![a.x[0].clone()];
            t.iso = true;
        }
        return Ok(t);
    }

    trace!(anz, vdim, "transpose by buckets");
    let mut next = try_filled(vdim + 1, 0usize)?;
    for &i in &a.i[..anz] {
        next[i] += 1;
    }
    cumsum_in_place(&mut next);
    let p = next.clone();

    let mut i_new = try_filled(anz, 0usize)?;
    let mut x_new = if a.iso {
        vec![a.x[0].clone()]
    } else {
        try_filled(anz, T::default())?
    };
    for k in 0..a.nvec() {
        let j = a.vector_id(k);
        for pos in a.vstart(k)..a.vend(k) {
            let q = next[a.i[pos]];
            next[a.i[pos]] += 1;
            i_new[q] = j;
            if !a.iso {
                x_new[q] = a.x[pos].clone();
            }
        }
    }
    Ok(Matrix::sparse_from_parts(vlen, vdim, is_csc, p, None, i_new, x_new, a.iso))
}

/// The transpose of a finished matrix, in the same orientation
pub(crate) fn transpose_view<T: Scalar>(a: &MatrixView<'_, T>) -> Result<Matrix<T>> {
    transpose_storage(&a.clone().transposed())
}
