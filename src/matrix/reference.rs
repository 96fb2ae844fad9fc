//! Reference implementations on dense matrices of optional entries
//!
//! These are deliberately naive triple loops, independent of every
//! sparse kernel, and serve as the baseline for correctness tests.

use crate::error::{Error, Result};
use crate::ops::{BinaryOp, Semiring};
use crate::types::Scalar;

use super::Matrix;

/// A row-major dense matrix in which every entry may be absent
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<Option<T>>,
}

impl<T: Clone> DenseMatrix<T> {
    /// A matrix with no entries
    pub fn empty(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![None; nrows * ncols],
        }
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        self.data[i * self.ncols + j].as_ref()
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.ncols + j] = Some(value);
    }

    /// Number of entries present
    pub fn nvals(&self) -> usize {
        self.data.iter().filter(|v| v.is_some()).count()
    }
}

/// Copy any matrix into a [`DenseMatrix`]
pub fn dense_reference<T: Scalar>(a: &Matrix<T>) -> Result<DenseMatrix<T>> {
    let a = a.prepare()?;
    let mut d = DenseMatrix::empty(a.nrows(), a.ncols());
    a.for_each_entry(|i, j, x| d.set(i, j, x.clone()));
    Ok(d)
}

/// `C = A ∪ B` (`union`) or `C = A ∩ B` with `op` on the overlap
///
/// In a union, entries present in only one input are copied.
pub fn reference_ewise<T: Scalar>(
    a: &DenseMatrix<T>,
    b: &DenseMatrix<T>,
    op: &BinaryOp<T>,
    union: bool,
) -> Result<DenseMatrix<T>> {
    if (a.nrows, a.ncols) != (b.nrows, b.ncols) {
        return Err(Error::dimension_mismatch(
            "reference_ewise",
            format!("{}×{} and {}×{}", a.nrows, a.ncols, b.nrows, b.ncols),
        ));
    }
    let data = a
        .data
        .iter()
        .zip(&b.data)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(op.call(x, y)),
            (Some(x), None) if union => Some(x.clone()),
            (None, Some(y)) if union => Some(y.clone()),
            _ => None,
        })
        .collect();
    Ok(DenseMatrix {
        nrows: a.nrows,
        ncols: a.ncols,
        data,
    })
}

/// `C = A*B` over `semiring`, summing products in increasing `k`
pub fn reference_mxm<X: Scalar, Y: Scalar, Z: Scalar>(
    a: &DenseMatrix<X>,
    b: &DenseMatrix<Y>,
    semiring: &Semiring<X, Y, Z>,
) -> Result<DenseMatrix<Z>> {
    if a.ncols != b.nrows {
        return Err(Error::dimension_mismatch(
            "reference_mxm",
            format!("{}×{} times {}×{}", a.nrows, a.ncols, b.nrows, b.ncols),
        ));
    }
    let add = semiring.add();
    let mult = semiring.multiply();
    let mut c = DenseMatrix::empty(a.nrows, b.ncols);
    for i in 0..a.nrows {
        for j in 0..b.ncols {
            let mut sum: Option<Z> = None;
            for k in 0..a.ncols {
                if let (Some(x), Some(y)) = (a.get(i, k), b.get(k, j)) {
                    let t = mult.call(x, y);
                    sum = Some(match sum {
                        Some(s) => add.call(&s, &t),
                        None => t,
                    });
                }
            }
            if let Some(s) = sum {
                c.set(i, j, s);
            }
        }
    }
    Ok(c)
}
