//! Read-only views of finished matrices
//!
//! A [`MatrixView`] borrows the pattern arrays of a [`Matrix`] and either
//! borrows or owns its values. Kernels read their inputs through views, which
//! makes three things O(1) in the pattern: viewing the transpose (flip the
//! orientation), typecasting (convert only the values) and applying a unary
//! operator (map only the values).

use std::borrow::Cow;
use std::fmt;

use super::hyper::{bisect, HyperHash};
use super::transpose::{transpose_storage, transpose_view};
use super::{Matrix, Sparsity};
use crate::error::Result;
use crate::ops::UnaryOp;
use crate::types::{cast_factory, Scalar};

/// A borrowed, finished matrix in full, sparse or hypersparse format
#[derive(Clone)]
pub struct MatrixView<'a, T: Clone> {
    pub(crate) vlen: usize,
    pub(crate) vdim: usize,
    pub(crate) is_csc: bool,
    pub(crate) sparsity: Sparsity,
    pub(crate) p: &'a [usize],
    pub(crate) h: &'a [usize],
    pub(crate) i: &'a [usize],
    pub(crate) x: Cow<'a, [T]>,
    pub(crate) iso: bool,
    pub(crate) hyper_hash: Option<&'a HyperHash>,
}

impl<T: Scalar> Matrix<T> {
    /// A kernel-ready version of this matrix
    ///
    /// Borrowed when the matrix is finished and not a bitmap; otherwise a
    /// temporary copy is finished and converted to sparse. Call
    /// [`Matrix::wait`] beforehand to avoid the copy.
    pub fn prepare(&self) -> Result<Cow<'_, Matrix<T>>> {
        if self.is_finished() && self.sparsity != Sparsity::Bitmap {
            return Ok(Cow::Borrowed(self));
        }
        let mut copy = self.clone();
        copy.wait()?;
        if copy.sparsity == Sparsity::Bitmap {
            copy.convert_to_sparse()?;
        }
        Ok(Cow::Owned(copy))
    }

    /// View a finished, non-bitmap matrix
    pub fn view(&self) -> MatrixView<'_, T> {
        debug_assert!(self.is_finished(), "view of a matrix with pending work");
        debug_assert!(self.sparsity != Sparsity::Bitmap, "view of a bitmap");
        let hyper_hash = (self.sparsity == Sparsity::Hypersparse
            && self.h.len() >= self.hyper_hash_min.max(1))
        .then(|| self.hyper_hash.get_or_init(|| HyperHash::build(&self.h)));
        MatrixView {
            vlen: self.vlen,
            vdim: self.vdim,
            is_csc: self.is_csc,
            sparsity: self.sparsity,
            p: &self.p,
            h: &self.h,
            i: &self.i,
            x: Cow::Borrowed(&self.x),
            iso: self.iso,
            hyper_hash,
        }
    }
}

impl<'a, T: Scalar> MatrixView<'a, T> {
    pub fn nrows(&self) -> usize {
        if self.is_csc {
            self.vlen
        } else {
            self.vdim
        }
    }

    pub fn ncols(&self) -> usize {
        if self.is_csc {
            self.vdim
        } else {
            self.vlen
        }
    }

    pub fn is_full(&self) -> bool {
        self.sparsity == Sparsity::Full
    }

    pub fn is_hyper(&self) -> bool {
        self.sparsity == Sparsity::Hypersparse
    }

    /// Number of vectors held
    #[inline]
    pub fn nvec(&self) -> usize {
        match self.sparsity {
            Sparsity::Hypersparse => self.h.len(),
            _ => self.vdim,
        }
    }

    /// Number of entries
    pub fn nnz(&self) -> usize {
        match self.sparsity {
            Sparsity::Full => self.vlen * self.vdim,
            _ => self.p.last().copied().unwrap_or(0),
        }
    }

    #[inline]
    pub fn vstart(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Full => k * self.vlen,
            _ => self.p[k],
        }
    }

    #[inline]
    pub fn vend(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Full => (k + 1) * self.vlen,
            _ => self.p[k + 1],
        }
    }

    /// Vector id of the `k`-th held vector
    #[inline]
    pub fn vector_id(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Hypersparse => self.h[k],
            _ => k,
        }
    }

    /// Index within its vector of the entry at `pos`
    #[inline]
    pub fn index(&self, pos: usize) -> usize {
        match self.sparsity {
            Sparsity::Full => pos % self.vlen,
            _ => self.i[pos],
        }
    }

    #[inline]
    pub fn value(&self, pos: usize) -> &T {
        if self.iso {
            &self.x[0]
        } else {
            &self.x[pos]
        }
    }

    /// Position `k` of vector `j`, if held
    #[inline]
    pub fn find_vector(&self, j: usize) -> Option<usize> {
        match self.sparsity {
            Sparsity::Hypersparse => match self.hyper_hash {
                Some(hash) => hash.get(j),
                None => bisect(self.h, j),
            },
            _ => (j < self.vdim).then_some(j),
        }
    }

    /// Entry range of vector `j`; empty if it is not held
    #[inline]
    pub fn vector_range(&self, j: usize) -> (usize, usize) {
        match self.find_vector(j) {
            Some(k) => (self.vstart(k), self.vend(k)),
            None => (0, 0),
        }
    }

    /// Position of entry `i` within the entry range `[start, end)`
    #[inline]
    pub fn find_in_vector(&self, start: usize, end: usize, i: usize) -> Option<usize> {
        if start >= end {
            return None;
        }
        match self.sparsity {
            Sparsity::Full => Some(start + i),
            _ => {
                let slice = &self.i[start..end];
                slice.binary_search(&i).ok().map(|off| start + off)
            }
        }
    }

    /// The transpose, by reinterpreting the orientation
    pub fn transposed(mut self) -> Self {
        self.is_csc = !self.is_csc;
        self
    }

    /// Typecast the values, sharing the pattern
    pub fn cast<D: Scalar>(&self) -> Result<MatrixView<'a, D>> {
        let f = cast_factory::<T, D>()?;
        Ok(self.with_values(self.x.iter().map(f).collect()))
    }

    /// Apply `op` to every value, sharing the pattern
    pub fn apply<Z: Scalar>(&self, op: &UnaryOp<T, Z>) -> MatrixView<'a, Z> {
        self.with_values(self.x.iter().map(|v| op.call(v)).collect())
    }

    /// The pattern alone, every entry reading `true`
    pub fn structure(&self) -> MatrixView<'a, bool> {
        let mut v = self.with_values(vec![true]);
        v.iso = true;
        v
    }

    pub(crate) fn with_values<D: Scalar>(&self, x: Vec<D>) -> MatrixView<'a, D> {
        MatrixView {
            vlen: self.vlen,
            vdim: self.vdim,
            is_csc: self.is_csc,
            sparsity: self.sparsity,
            p: self.p,
            h: self.h,
            i: self.i,
            x: Cow::Owned(x),
            iso: self.iso,
            hyper_hash: self.hyper_hash,
        }
    }

    /// Copy into an owned matrix
    pub fn to_matrix(&self) -> Matrix<T> {
        match self.sparsity {
            Sparsity::Full => Matrix::full_from_parts(
                self.vlen,
                self.vdim,
                self.is_csc,
                self.x.to_vec(),
                self.iso,
            ),
            _ => Matrix::sparse_from_parts(
                self.vlen,
                self.vdim,
                self.is_csc,
                self.p.to_vec(),
                self.is_hyper().then(|| self.h.to_vec()),
                self.i.to_vec(),
                self.x.to_vec(),
                self.iso,
            ),
        }
    }
}

/// A kernel input: finished, not a bitmap, and stored in the orientation of
/// the output
///
/// An input already in that orientation, or in the other one but used
/// transposed, is borrowed and viewed in O(1). Otherwise it is transposed
/// into an owned copy.
pub(crate) struct Operand<'a, T: Scalar> {
    matrix: Cow<'a, Matrix<T>>,
    flip: bool,
}

impl<'a, T: Scalar> Operand<'a, T> {
    pub(crate) fn new(m: &'a Matrix<T>, transpose: bool, is_csc: bool) -> Result<Self> {
        let ready = m.prepare()?;
        if ready.is_csc ^ transpose == is_csc {
            return Ok(Self {
                matrix: ready,
                flip: transpose,
            });
        }
        let moved = if transpose {
            transpose_view(&ready.view())?
        } else {
            transpose_storage(&ready.view())?
        };
        Ok(Self {
            matrix: Cow::Owned(moved),
            flip: false,
        })
    }

    pub(crate) fn view(&self) -> MatrixView<'_, T> {
        let v = self.matrix.view();
        if self.flip {
            v.transposed()
        } else {
            v
        }
    }

    /// True if this operand is `m` itself, untransposed
    pub(crate) fn is<U>(&self, m: &Matrix<U>) -> bool {
        !self.flip
            && matches!(self.matrix, Cow::Borrowed(_))
            && std::ptr::eq(
                &*self.matrix as *const Matrix<T> as *const (),
                m as *const Matrix<U> as *const (),
            )
    }
}

impl<T: Scalar> fmt::Debug for MatrixView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("nrows", &self.nrows())
            .field("ncols", &self.ncols())
            .field("sparsity", &self.sparsity)
            .field("is_csc", &self.is_csc)
            .field("nnz", &self.nnz())
            .field("iso", &self.iso)
            .field("owned_values", &matches!(self.x, Cow::Owned(_)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Format, SparsityControl};
    use crate::ops::UnaryOpcode;

    fn small() -> Matrix<i32> {
        let mut m = Matrix::new_with_format(2, 3, Format::ByCol);
        m.set_sparsity_control(SparsityControl::SPARSE).unwrap();
        m.build(&[0, 1, 1], &[0, 0, 2], &[1, 2, 3], None).unwrap();
        m
    }

    #[test]
    fn test_view_accessors() {
        let m = small();
        let v = m.view();
        assert_eq!(v.nnz(), 3);
        assert_eq!(v.nvec(), 3);
        assert_eq!(v.vector_range(2), (2, 3));
        assert_eq!(v.index(2), 1);
        assert_eq!(*v.value(2), 3);
        assert_eq!(v.find_in_vector(0, 2, 1), Some(1));
        assert_eq!(v.find_in_vector(2, 2, 0), None);
    }

    #[test]
    fn test_transposed_view_swaps_shape() {
        let m = small();
        let t = m.view().transposed();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        let mut owned = t.to_matrix();
        assert_eq!(owned.extract_element(2, 1).unwrap(), 3);
        assert_eq!(owned.extract_element(0, 1).unwrap(), 2);
    }

    #[test]
    fn test_shallow_cast_and_apply() {
        let m = small();
        let v = m.view();
        let as_f64 = v.cast::<f64>().unwrap();
        assert_eq!(*as_f64.value(1), 2.0);
        assert!(std::ptr::eq(as_f64.i, v.i));
        let negated = v.apply(&UnaryOp::builtin(UnaryOpcode::Ainv).unwrap());
        assert_eq!(*negated.value(0), -1);
    }

    #[test]
    fn test_operand_orientation() {
        let m = small();
        // same orientation: borrowed
        let op = Operand::new(&m, false, true).unwrap();
        assert!(op.is(&m));
        // transposed into the other orientation: an O(1) flip
        let op = Operand::new(&m, true, false).unwrap();
        let v = op.view();
        assert!(!v.is_csc);
        assert_eq!((v.nrows(), v.ncols()), (3, 2));
        // other orientation, untransposed: materialised
        let op = Operand::new(&m, false, false).unwrap();
        let mut owned = op.view().to_matrix();
        assert_eq!(owned.format(), Format::ByRow);
        assert_eq!(owned.extract_element(1, 2).unwrap(), 3);
    }

    #[test]
    fn test_structure_is_iso_true() {
        let m = small();
        let s = m.view().structure();
        assert!(s.iso);
        assert!(*s.value(2));
        assert_eq!(s.nnz(), 3);
    }

    #[test]
    fn test_prepare_finishes_a_copy() {
        let mut m = small();
        m.set_element(0, 1, 9).unwrap();
        let ready = m.prepare().unwrap();
        assert!(matches!(ready, Cow::Owned(_)));
        assert_eq!(ready.view().nnz(), 4);
        assert!(m.has_pending());
        m.wait().unwrap();
        assert!(matches!(m.prepare().unwrap(), Cow::Borrowed(_)));
    }
}
