//! Moving matrices in and out of the library
//!
//! Sparse import takes ownership of compressed arrays without copying or
//! scanning them, so it is O(1); the arrays are trusted, and
//! [`Matrix::check`] validates them when that is in doubt. Export consumes
//! the matrix and hands its arrays back. Dense import and export move a
//! full matrix's values in row- or column-major order.

pub mod interop;

use tracing::trace;

use crate::error::{Error, Result};
use crate::matrix::{Format, Matrix, Sparsity};
use crate::types::Scalar;

/// The arrays of a compressed sparse matrix
///
/// Vector `k` holds indices `i[p[k]..p[k+1]]` and values
/// `x[p[k]..p[k+1]]`; vectors are columns for CSC and rows for CSR.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseParts<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub p: Vec<usize>,
    pub i: Vec<usize>,
    pub x: Vec<T>,
}

impl<T: Scalar> Matrix<T> {
    /// Take ownership of CSC arrays
    ///
    /// `jumbled` says the indices within a column may be out of order; they
    /// are sorted by the next [`Matrix::wait`].
    pub fn import_csc(
        nrows: usize,
        ncols: usize,
        p: Vec<usize>,
        i: Vec<usize>,
        x: Vec<T>,
        jumbled: bool,
    ) -> Result<Self> {
        Self::import_sparse(nrows, ncols, Format::ByCol, p, i, x, jumbled)
    }

    /// Take ownership of CSR arrays
    pub fn import_csr(
        nrows: usize,
        ncols: usize,
        p: Vec<usize>,
        i: Vec<usize>,
        x: Vec<T>,
        jumbled: bool,
    ) -> Result<Self> {
        Self::import_sparse(nrows, ncols, Format::ByRow, p, i, x, jumbled)
    }

    fn import_sparse(
        nrows: usize,
        ncols: usize,
        format: Format,
        p: Vec<usize>,
        mut i: Vec<usize>,
        mut x: Vec<T>,
        jumbled: bool,
    ) -> Result<Self> {
        let is_csc = format == Format::ByCol;
        let (vlen, vdim) = if is_csc { (nrows, ncols) } else { (ncols, nrows) };
        if p.len() != vdim + 1 {
            return Err(Error::invalid_value(format!(
                "{} vector pointers for {} vectors",
                p.len(),
                vdim
            )));
        }
        if p[0] != 0 {
            return Err(Error::invalid_value("vector pointers must start at 0"));
        }
        let nnz = p[vdim];
        if i.len() < nnz || x.len() < nnz {
            return Err(Error::invalid_value(format!(
                "{} entries but {} indices and {} values",
                nnz,
                i.len(),
                x.len()
            )));
        }
        i.truncate(nnz);
        x.truncate(nnz);
        trace!(nrows, ncols, nnz, is_csc, jumbled, "import");
        let mut m = Matrix::sparse_from_parts(vlen, vdim, is_csc, p, None, i, x, false);
        m.jumbled = jumbled && nnz > 0;
        Ok(m)
    }

    /// Give up the matrix as CSC arrays
    ///
    /// Pending work is finished, and the matrix is re-oriented, converted to
    /// sparse and iso-expanded as needed.
    pub fn export_csc(self) -> Result<SparseParts<T>> {
        self.export_sparse(Format::ByCol)
    }

    /// Give up the matrix as CSR arrays
    pub fn export_csr(self) -> Result<SparseParts<T>> {
        self.export_sparse(Format::ByRow)
    }

    fn export_sparse(mut self, format: Format) -> Result<SparseParts<T>> {
        self.wait()?;
        self.set_format(format)?;
        self.convert_sparsity(Sparsity::Sparse)?;
        self.expand_iso()?;
        trace!(nrows = self.nrows(), ncols = self.ncols(), nnz = self.i.len(), "export");
        Ok(SparseParts {
            nrows: self.nrows(),
            ncols: self.ncols(),
            p: self.p,
            i: self.i,
            x: self.x,
        })
    }

    /// Take ownership of the values of a full matrix
    ///
    /// `order` is the layout of `x`: [`Format::ByRow`] for row-major,
    /// [`Format::ByCol`] for column-major.
    pub fn import_dense(nrows: usize, ncols: usize, x: Vec<T>, order: Format) -> Result<Self> {
        let slots = nrows.checked_mul(ncols).ok_or(Error::OutOfMemory { size: usize::MAX })?;
        if x.len() != slots {
            return Err(Error::invalid_value(format!(
                "{} values for a {}×{} matrix",
                x.len(),
                nrows,
                ncols
            )));
        }
        let is_csc = order == Format::ByCol;
        let (vlen, vdim) = if is_csc { (nrows, ncols) } else { (ncols, nrows) };
        Ok(Matrix::full_from_parts(vlen, vdim, is_csc, x, false))
    }

    /// Give up the values of a matrix with every entry present, laid out
    /// in `order`
    ///
    /// A matrix with any entry missing is `InvalidValue`.
    pub fn export_dense(mut self, order: Format) -> Result<Vec<T>> {
        self.wait()?;
        let slots = self.dense_slots()?;
        if self.live_entries() != slots {
            return Err(Error::invalid_value(format!(
                "only {} of {} entries present; not a full matrix",
                self.live_entries(),
                slots
            )));
        }
        self.set_format(order)?;
        self.convert_sparsity(Sparsity::Full)?;
        self.expand_iso()?;
        Ok(self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Matrix<f64> {
        // [1 . 2]
        // [. . 3]
        Matrix::from_tuples(2, 3, &[0, 0, 1], &[0, 2, 2], &[1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let parts = sample().export_csc().unwrap();
        assert_eq!(parts.p, vec![0, 1, 1, 3]);
        assert_eq!(parts.i, vec![0, 0, 1]);
        assert_eq!(parts.x, vec![1.0, 2.0, 3.0]);

        let mut back = Matrix::import_csc(
            parts.nrows,
            parts.ncols,
            parts.p,
            parts.i,
            parts.x,
            false,
        )
        .unwrap();
        back.check().unwrap();
        assert_eq!(back.format(), Format::ByCol);
        assert_eq!(back.extract_element(1, 2).unwrap(), 3.0);

        let parts = back.export_csr().unwrap();
        assert_eq!(parts.p, vec![0, 2, 3]);
        assert_eq!(parts.i, vec![0, 2, 2]);
    }

    #[test]
    fn test_import_jumbled_sorts_on_wait() {
        let mut m = Matrix::import_csr(
            2,
            4,
            vec![0, 3, 4],
            vec![3, 0, 1, 2],
            vec![30, 0, 10, 20],
            true,
        )
        .unwrap();
        assert!(m.is_jumbled());
        m.wait().unwrap();
        let (rows, cols, vals) = m.extract_tuples().unwrap();
        assert_eq!(rows, vec![0, 0, 0, 1]);
        assert_eq!(cols, vec![0, 1, 3, 2]);
        assert_eq!(vals, vec![0, 10, 30, 20]);
    }

    #[test]
    fn test_import_length_errors() {
        let r = Matrix::import_csc(2, 2, vec![0, 1], vec![0], vec![1u8], false);
        assert!(matches!(r, Err(Error::InvalidValue(_))));
        let r = Matrix::import_csc(2, 2, vec![0, 1, 3], vec![0, 1], vec![1u8, 2, 3], false);
        assert!(matches!(r, Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_export_iso_expands() {
        let m = Matrix::full_iso(2, 2, 7i32, Format::ByRow);
        let parts = m.export_csr().unwrap();
        assert_eq!(parts.x, vec![7; 4]);
        assert_eq!(parts.i, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_dense_orders() {
        let m = Matrix::import_dense(2, 3, vec![1, 2, 3, 4, 5, 6], Format::ByRow).unwrap();
        assert_eq!(m.clone().export_dense(Format::ByRow).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(m.export_dense(Format::ByCol).unwrap(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_export_dense_needs_every_entry() {
        let r = sample().export_dense(Format::ByRow);
        assert!(matches!(r, Err(Error::InvalidValue(_))));
        let r = Matrix::import_dense(2, 2, vec![1, 2, 3], Format::ByCol);
        assert!(matches!(r, Err(Error::InvalidValue(_))));
    }
}
