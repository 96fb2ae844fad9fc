//! Conversions to and from `sprs` and `ndarray`

use ndarray::{Array2, ArrayView2};
use sprs::CsMat;

use crate::error::Result;
use crate::matrix::{Format, Matrix};
use crate::types::Scalar;

impl<T: Scalar> Matrix<T> {
    /// Copy into a `sprs` matrix of the same orientation
    pub fn to_sprs(&self) -> Result<CsMat<T>> {
        let format = self.format();
        let parts = match format {
            Format::ByCol => self.clone().export_csc()?,
            Format::ByRow => self.clone().export_csr()?,
        };
        let shape = (parts.nrows, parts.ncols);
        Ok(match format {
            Format::ByCol => CsMat::new_csc(shape, parts.p, parts.i, parts.x),
            Format::ByRow => CsMat::new(shape, parts.p, parts.i, parts.x),
        })
    }

    /// Take over the arrays of a `sprs` matrix, keeping its orientation
    pub fn from_sprs(m: CsMat<T>) -> Result<Self> {
        let (nrows, ncols) = m.shape();
        let is_csc = m.is_csc();
        let (p, i, x) = m.into_raw_storage();
        if is_csc {
            Matrix::import_csc(nrows, ncols, p, i, x, false)
        } else {
            Matrix::import_csr(nrows, ncols, p, i, x, false)
        }
    }

    /// Copy into a dense array; missing entries read `T::default()`
    pub fn to_ndarray(&self) -> Result<Array2<T>> {
        let ready = self.prepare()?;
        let mut a = Array2::from_elem((self.nrows(), self.ncols()), T::default());
        ready.for_each_entry(|i, j, x| a[[i, j]] = x.clone());
        Ok(a)
    }

    /// A full matrix stored by row holding every element of `a`
    pub fn from_ndarray(a: ArrayView2<'_, T>) -> Result<Self> {
        let (nrows, ncols) = a.dim();
        let x: Vec<T> = a.iter().cloned().collect();
        Matrix::import_dense(nrows, ncols, x, Format::ByRow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sprs_round_trip() {
        let m = Matrix::from_tuples(
            3,
            3,
            &[0, 1, 2, 2],
            &[1, 1, 0, 2],
            &[1.5, 2.5, 3.5, 4.5],
        )
        .unwrap();
        let s = m.to_sprs().unwrap();
        assert!(s.is_csr());
        assert_eq!(s.nnz(), 4);
        assert_eq!(s.get(2, 0), Some(&3.5));

        let mut back = Matrix::from_sprs(s.to_csc()).unwrap();
        assert_eq!(back.format(), Format::ByCol);
        assert_eq!(back.extract_element(1, 1).unwrap(), 2.5);
        assert!(back.extract_element(0, 0).unwrap_err().is_no_value());
        assert_eq!(back.nvals().unwrap(), 4);
    }

    #[test]
    fn test_ndarray_round_trip() {
        let a = array![[1, 2, 3], [4, 5, 6]];
        let m = Matrix::from_ndarray(a.view()).unwrap();
        assert!(m.is_finished());
        assert_eq!(m.to_ndarray().unwrap(), a);

        let mut sparse = Matrix::<i32>::new(2, 2);
        sparse.set_element(1, 0, 9).unwrap();
        assert_eq!(sparse.to_ndarray().unwrap(), array![[0, 0], [9, 0]]);
    }
}
