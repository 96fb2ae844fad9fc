//! Building a matrix from tuples, and extracting its tuples

use rayon::prelude::*;

use super::{is_zombie, Matrix, Sparsity};
use crate::error::{Error, Result};
use crate::ops::BinaryOp;
use crate::types::Scalar;
use crate::utils::try_vec;

/// What to do with tuples that share a position
pub(crate) enum Dup<'a, T> {
    /// Keep the last one
    Last,
    /// Fold them left to right with an operator
    Combine(&'a BinaryOp<T>),
    /// Fail with `InvalidValue`
    Reject,
}

impl<T> Clone for Dup<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Dup<'_, T> {}

/// Assemble tuples in storage coordinates into a hypersparse matrix
///
/// Tuples are stably sorted by `(j, i)` unless `presorted`, so duplicates
/// are combined in the order they were given.
pub(crate) fn build_from_tuples<T: Scalar>(
    vlen: usize,
    vdim: usize,
    is_csc: bool,
    ti: &[usize],
    tj: &[usize],
    tx: &[T],
    dup: Dup<'_, T>,
    presorted: bool,
) -> Result<Matrix<T>> {
    let n = ti.len();
    debug_assert!(tj.len() == n && tx.len() == n);

    let mut perm: Vec<usize> = try_vec(n)?;
    perm.extend(0..n);
    if !presorted {
        // stable, so duplicates keep their relative order
        perm.par_sort_by_key(|&t| (tj[t], ti[t]));
    }

    let mut h: Vec<usize> = Vec::new();
    let mut p: Vec<usize> = vec![0];
    let mut i_out: Vec<usize> = try_vec(n)?;
    let mut x_out: Vec<T> = try_vec(n)?;

    let mut t = 0;
    while t < n {
        let (i, j) = (ti[perm[t]], tj[perm[t]]);
        let mut value = tx[perm[t]].clone();
        t += 1;
        while t < n && ti[perm[t]] == i && tj[perm[t]] == j {
            let next = &tx[perm[t]];
            value = match dup {
                Dup::Last => next.clone(),
                Dup::Combine(op) => op.call(&value, next),
                Dup::Reject => {
                    return Err(Error::invalid_value(format!(
                        "duplicate entry at index ({i}, {j})"
                    )))
                }
            };
            t += 1;
        }
        if h.last() != Some(&j) {
            if !h.is_empty() {
                p.push(i_out.len());
            }
            h.push(j);
        }
        i_out.push(i);
        x_out.push(value);
    }
    if !h.is_empty() {
        p.push(i_out.len());
    }

    Ok(Matrix::sparse_from_parts(
        vlen,
        vdim,
        is_csc,
        p,
        Some(h),
        i_out,
        x_out,
        false,
    ))
}

impl<T: Scalar> Matrix<T> {
    /// Fill an empty matrix from `(rows[k], cols[k], vals[k])` tuples
    ///
    /// Duplicates are combined with `dup`; without one they are an error.
    pub fn build(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        vals: &[T],
        dup: Option<&BinaryOp<T>>,
    ) -> Result<()> {
        if rows.len() != cols.len() || rows.len() != vals.len() {
            return Err(Error::invalid_value(format!(
                "tuple arrays differ in length: {}, {}, {}",
                rows.len(),
                cols.len(),
                vals.len()
            )));
        }
        if self.pending.is_some() || self.live_entries() > 0 {
            return Err(Error::invalid_value("output matrix for build is not empty"));
        }
        for (&r, &c) in rows.iter().zip(cols) {
            self.check_indices(r, c)?;
        }
        let (ti, tj) = if self.is_csc { (rows, cols) } else { (cols, rows) };
        let dup = dup.map_or(Dup::Reject, Dup::Combine);
        let mut built = build_from_tuples(
            self.vlen,
            self.vdim,
            self.is_csc,
            ti,
            tj,
            vals,
            dup,
            false,
        )?;
        built.copy_settings_from(self);
        *self = built;
        self.conform()
    }

    /// Create a matrix stored by row from tuples without duplicates
    pub fn from_tuples(
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        vals: &[T],
    ) -> Result<Self> {
        let mut m = Self::new(nrows, ncols);
        m.build(rows, cols, vals, None)?;
        Ok(m)
    }

    /// All entries as `(rows, cols, vals)`, in storage order
    pub fn extract_tuples(&mut self) -> Result<(Vec<usize>, Vec<usize>, Vec<T>)> {
        self.wait()?;
        let n = self.live_entries();
        let mut rows = try_vec(n)?;
        let mut cols = try_vec(n)?;
        let mut vals = try_vec(n)?;
        self.for_each_entry(|row, col, x| {
            rows.push(row);
            cols.push(col);
            vals.push(x.clone());
        });
        Ok((rows, cols, vals))
    }

    /// Visit every live entry as `(row, col, value)`, in storage order
    pub(crate) fn for_each_entry<F: FnMut(usize, usize, &T)>(&self, mut f: F) {
        for k in 0..self.nvec() {
            let j = self.vector_id(k);
            for pos in self.vstart(k)..self.vend(k) {
                let i = match self.sparsity {
                    Sparsity::Full => pos - k * self.vlen,
                    Sparsity::Bitmap => {
                        if !self.b[pos] {
                            continue;
                        }
                        pos - k * self.vlen
                    }
                    _ => {
                        if is_zombie(self.i[pos]) {
                            continue;
                        }
                        self.i[pos]
                    }
                };
                let (row, col) = self.to_logical(i, j);
                f(row, col, self.value_at(pos));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Format;

    #[test]
    fn test_build_and_extract() {
        let mut m = Matrix::<f64>::new_with_format(3, 3, Format::ByCol);
        m.build(&[2, 0, 1], &[0, 0, 2], &[3.0, 1.0, 2.0], None).unwrap();
        let (r, c, v) = m.extract_tuples().unwrap();
        assert_eq!(r, vec![0, 2, 1]);
        assert_eq!(c, vec![0, 0, 2]);
        assert_eq!(v, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_build_duplicates() {
        let mut m = Matrix::<i32>::new(2, 2);
        let err = m.build(&[0, 0], &[1, 1], &[1, 2], None).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));

        let plus = BinaryOp::<i32>::plus();
        m.build(&[0, 0, 1], &[1, 1, 0], &[1, 2, 5], Some(&plus)).unwrap();
        assert_eq!(m.extract_element(0, 1).unwrap(), 3);
        assert_eq!(m.nvals().unwrap(), 2);
    }

    #[test]
    fn test_build_rejects_bad_input() {
        let mut m = Matrix::<i32>::new(2, 2);
        assert!(m.build(&[0], &[0, 1], &[1], None).is_err());
        assert_eq!(
            m.build(&[5], &[0], &[1], None),
            Err(Error::InvalidIndex { index: 5, size: 2 })
        );
        m.build(&[0], &[0], &[1], None).unwrap();
        assert!(m.build(&[1], &[1], &[1], None).is_err());
    }

    #[test]
    fn test_build_from_tuples_keeps_last() {
        let m = build_from_tuples(
            4,
            4,
            true,
            &[1, 1, 3],
            &[2, 2, 0],
            &[10, 20, 30],
            Dup::Last,
            false,
        )
        .unwrap();
        assert_eq!(m.h, vec![0, 2]);
        assert_eq!(m.p, vec![0, 1, 2]);
        assert_eq!(m.i, vec![3, 1]);
        assert_eq!(m.x, vec![30, 20]);
    }
}
