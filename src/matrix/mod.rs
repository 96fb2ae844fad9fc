//! Sparse matrix storage
//!
//! A [`Matrix`] is a collection of `vdim` sparse vectors of length `vlen`.
//! Stored by column (CSC), the vectors are columns: `vlen = nrows` and
//! `vdim = ncols`. Stored by row (CSR), they are rows. The same arrays are
//! interpreted in one of four sparsity formats:
//!
//! - **full**: `x` holds all `vlen * vdim` values, no index arrays
//! - **bitmap**: `b` flags which of the `vlen * vdim` slots of `x` are present
//! - **sparse**: `p[vdim + 1]` vector pointers, `i[nnz]` indices, `x[nnz]`
//! - **hypersparse**: sparse over only the `nvec` vectors listed in `h`
//!
//! Sparse and hypersparse matrices can carry deferred work: pending tuples
//! (insertions not yet merged in), zombies (entries marked for deletion,
//! their index flipped) and jumbled vectors (indices not yet sorted).
//! [`Matrix::wait`] finishes all of it.

pub mod check;
pub mod convert;
pub mod hyper;
pub mod pending;
pub mod reference;
pub mod transpose;
pub mod tuples;
pub mod view;
pub mod wait;

use std::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;

use crate::config::{DEFAULT_BITMAP_SWITCH, DEFAULT_HYPER_HASH_MIN, DEFAULT_HYPER_SWITCH};
use crate::error::{Error, Result};
use crate::types::{Scalar, Type};

pub use hyper::HyperHash;
pub use pending::Pending;
pub use reference::{dense_reference, reference_ewise, reference_mxm, DenseMatrix};
pub use view::MatrixView;
pub(crate) use view::Operand;

/// Storage orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Compressed sparse row: each vector is a row
    #[default]
    ByRow,
    /// Compressed sparse column: each vector is a column
    ByCol,
}

/// Current sparsity format of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sparsity {
    Hypersparse,
    Sparse,
    Bitmap,
    Full,
}

bitflags! {
    /// Sparsity formats a matrix is allowed to take
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SparsityControl: u8 {
        const HYPERSPARSE = 1;
        const SPARSE = 2;
        const BITMAP = 4;
        const FULL = 8;
        const AUTO = Self::HYPERSPARSE.bits() | Self::SPARSE.bits()
            | Self::BITMAP.bits() | Self::FULL.bits();
    }
}

impl SparsityControl {
    /// Whether `sparsity` is among the allowed formats
    pub fn allows(self, sparsity: Sparsity) -> bool {
        self.contains(match sparsity {
            Sparsity::Hypersparse => SparsityControl::HYPERSPARSE,
            Sparsity::Sparse => SparsityControl::SPARSE,
            Sparsity::Bitmap => SparsityControl::BITMAP,
            Sparsity::Full => SparsityControl::FULL,
        })
    }
}

impl Default for SparsityControl {
    fn default() -> Self {
        SparsityControl::AUTO
    }
}

/// Mark an index as a zombie
#[inline]
pub(crate) const fn flip(i: usize) -> usize {
    !i
}

/// True if a stored index belongs to a zombie
#[inline]
pub(crate) const fn is_zombie(i: usize) -> bool {
    i > (usize::MAX >> 1)
}

/// The live index of a possibly-zombie entry
#[inline]
pub(crate) const fn unflip(i: usize) -> usize {
    if is_zombie(i) {
        flip(i)
    } else {
        i
    }
}

/// A sparse matrix over the element type `T`
#[derive(Clone)]
pub struct Matrix<T> {
    /// Length of each vector
    pub(crate) vlen: usize,
    /// Number of vectors
    pub(crate) vdim: usize,
    /// Vectors are columns
    pub(crate) is_csc: bool,
    pub(crate) sparsity: Sparsity,
    pub(crate) control: SparsityControl,

    /// Vector pointers (sparse and hypersparse), `nvec + 1` entries
    pub(crate) p: Vec<usize>,
    /// Non-empty vector ids (hypersparse), strictly increasing
    pub(crate) h: Vec<usize>,
    /// Presence flags (bitmap)
    pub(crate) b: Vec<bool>,
    /// Indices within each vector (sparse and hypersparse)
    pub(crate) i: Vec<usize>,
    /// Values; a single value when `iso`
    pub(crate) x: Vec<T>,

    pub(crate) iso: bool,
    /// Number of entries of a bitmap
    pub(crate) nvals: usize,
    pub(crate) nzombies: usize,
    pub(crate) pending: Option<Pending<T>>,
    pub(crate) jumbled: bool,

    pub(crate) hyper_switch: f64,
    pub(crate) bitmap_switch: f64,
    pub(crate) hyper_hash_min: usize,
    pub(crate) hyper_hash: OnceLock<HyperHash>,
}

impl<T: Scalar> Matrix<T> {
    /// Creates an empty `nrows × ncols` matrix stored by row
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self::new_with_format(nrows, ncols, Format::ByRow)
    }

    /// Creates an empty matrix with the given storage orientation
    pub fn new_with_format(nrows: usize, ncols: usize, format: Format) -> Self {
        let is_csc = format == Format::ByCol;
        let (vlen, vdim) = if is_csc { (nrows, ncols) } else { (ncols, nrows) };
        Self::empty_shaped(vlen, vdim, is_csc)
    }

    /// Creates a full matrix whose every entry is `value`, stored once
    pub fn full_iso(nrows: usize, ncols: usize, value: T, format: Format) -> Self {
        let is_csc = format == Format::ByCol;
        let (vlen, vdim) = if is_csc { (nrows, ncols) } else { (ncols, nrows) };
        Self::full_from_parts(vlen, vdim, is_csc, vec![value], true)
    }

    /// An empty hypersparse matrix in storage terms
    pub(crate) fn empty_shaped(vlen: usize, vdim: usize, is_csc: bool) -> Self {
        Self {
            vlen,
            vdim,
            is_csc,
            sparsity: Sparsity::Hypersparse,
            control: SparsityControl::AUTO,
            p: vec![0],
            h: Vec::new(),
            b: Vec::new(),
            i: Vec::new(),
            x: Vec::new(),
            iso: false,
            nvals: 0,
            nzombies: 0,
            pending: None,
            jumbled: false,
            hyper_switch: DEFAULT_HYPER_SWITCH,
            bitmap_switch: DEFAULT_BITMAP_SWITCH,
            hyper_hash_min: DEFAULT_HYPER_HASH_MIN,
            hyper_hash: OnceLock::new(),
        }
    }

    /// A sparse (`h == None`) or hypersparse matrix from its arrays
    pub(crate) fn sparse_from_parts(
        vlen: usize,
        vdim: usize,
        is_csc: bool,
        p: Vec<usize>,
        h: Option<Vec<usize>>,
        i: Vec<usize>,
        x: Vec<T>,
        iso: bool,
    ) -> Self {
        let mut m = Self::empty_shaped(vlen, vdim, is_csc);
        m.sparsity = if h.is_some() {
            Sparsity::Hypersparse
        } else {
            Sparsity::Sparse
        };
        m.p = p;
        m.h = h.unwrap_or_default();
        m.i = i;
        m.x = x;
        m.iso = iso;
        debug_assert_eq!(m.p.len(), m.nvec() + 1);
        m
    }

    /// A full matrix from its values
    pub(crate) fn full_from_parts(
        vlen: usize,
        vdim: usize,
        is_csc: bool,
        x: Vec<T>,
        iso: bool,
    ) -> Self {
        let mut m = Self::empty_shaped(vlen, vdim, is_csc);
        m.sparsity = Sparsity::Full;
        m.p = Vec::new();
        m.x = x;
        m.iso = iso;
        m
    }

    /// A bitmap matrix from its flags and values
    pub(crate) fn bitmap_from_parts(
        vlen: usize,
        vdim: usize,
        is_csc: bool,
        b: Vec<bool>,
        x: Vec<T>,
        nvals: usize,
        iso: bool,
    ) -> Self {
        let mut m = Self::empty_shaped(vlen, vdim, is_csc);
        m.sparsity = Sparsity::Bitmap;
        m.p = Vec::new();
        m.b = b;
        m.x = x;
        m.nvals = nvals;
        m.iso = iso;
        m
    }

    /// An empty matrix with this one's shape, orientation and settings
    pub(crate) fn empty_like(&self) -> Self {
        let mut m = Self::empty_shaped(self.vlen, self.vdim, self.is_csc);
        m.copy_settings_from(self);
        m
    }

    pub(crate) fn copy_settings_from<U>(&mut self, other: &Matrix<U>) {
        self.control = other.control;
        self.hyper_switch = other.hyper_switch;
        self.bitmap_switch = other.bitmap_switch;
        self.hyper_hash_min = other.hyper_hash_min;
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        if self.is_csc {
            self.vlen
        } else {
            self.vdim
        }
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        if self.is_csc {
            self.vdim
        } else {
            self.vlen
        }
    }

    /// Storage orientation
    pub fn format(&self) -> Format {
        if self.is_csc {
            Format::ByCol
        } else {
            Format::ByRow
        }
    }

    pub fn sparsity(&self) -> Sparsity {
        self.sparsity
    }

    pub fn sparsity_control(&self) -> SparsityControl {
        self.control
    }

    pub fn is_iso(&self) -> bool {
        self.iso
    }

    pub fn is_jumbled(&self) -> bool {
        self.jumbled
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn nzombies(&self) -> usize {
        self.nzombies
    }

    /// True if the matrix has no pending work of any kind
    pub fn is_finished(&self) -> bool {
        self.pending.is_none() && self.nzombies == 0 && !self.jumbled
    }

    /// Type descriptor of the entries
    pub fn type_desc(&self) -> Type {
        T::type_desc()
    }

    /// Set the hypersparsity switch used when this matrix conforms
    pub fn set_hyper_switch(&mut self, switch: f64) {
        self.hyper_switch = switch;
    }

    /// Set the bitmap switch used when this matrix conforms
    pub fn set_bitmap_switch(&mut self, switch: f64) {
        self.bitmap_switch = switch;
    }

    /// Set the smallest hyperlist that gets a hyper hash
    pub fn set_hyper_hash_min(&mut self, min: usize) {
        self.hyper_hash_min = min;
        self.invalidate_hyper_hash();
    }

    /// Number of entries, finishing pending insertions first
    pub fn nvals(&mut self) -> Result<usize> {
        if self.pending.is_some() {
            self.wait()?;
        }
        Ok(self.live_entries())
    }

    /// Remove every entry, keeping shape, orientation and settings
    pub fn clear(&mut self) {
        let cleared = self.empty_like();
        *self = cleared;
    }

    /// Store every value explicitly
    pub fn expand_iso(&mut self) -> Result<()> {
        if !self.iso {
            return Ok(());
        }
        let n = self.stored_slots();
        let value = self.x.first().cloned().unwrap_or_default();
        self.x = crate::utils::try_filled(n, value)?;
        self.iso = false;
        Ok(())
    }

    /// Change the dimensions, dropping entries outside the new bounds
    pub fn resize(&mut self, nrows: usize, ncols: usize) -> Result<()> {
        self.wait()?;
        if matches!(self.sparsity, Sparsity::Full | Sparsity::Bitmap) {
            self.convert_to_sparse()?;
        }
        let (new_vlen, new_vdim) = if self.is_csc { (nrows, ncols) } else { (ncols, nrows) };

        // drop whole vectors beyond the new vdim
        if self.sparsity == Sparsity::Hypersparse {
            let keep = crate::utils::lower_bound(&self.h, new_vdim);
            self.h.truncate(keep);
            self.p.truncate(keep + 1);
        } else if new_vdim <= self.vdim {
            self.p.truncate(new_vdim + 1);
        } else {
            let last = self.p[self.vdim];
            self.p.resize(new_vdim + 1, last);
        }
        let nnz = self.p[self.p.len() - 1];
        self.i.truncate(nnz);
        if !self.iso {
            self.x.truncate(nnz);
        }

        // drop entries beyond the new vlen
        if new_vlen < self.vlen {
            let nvec = self.p.len() - 1;
            let mut pnew = 0;
            for k in 0..nvec {
                let (start, end) = (self.p[k], self.p[k + 1]);
                self.p[k] = pnew;
                for pos in start..end {
                    if self.i[pos] < new_vlen {
                        self.i[pnew] = self.i[pos];
                        if !self.iso {
                            self.x.swap(pnew, pos);
                        }
                        pnew += 1;
                    }
                }
            }
            self.p[nvec] = pnew;
            self.i.truncate(pnew);
            if !self.iso {
                self.x.truncate(pnew);
            }
        }
        self.vlen = new_vlen;
        self.vdim = new_vdim;
        self.invalidate_hyper_hash();
        self.conform()
    }

    /// Map a (row, column) pair to (index within vector, vector id)
    #[inline]
    pub(crate) fn to_storage(&self, row: usize, col: usize) -> (usize, usize) {
        if self.is_csc {
            (row, col)
        } else {
            (col, row)
        }
    }

    /// Map (index within vector, vector id) back to (row, column)
    #[inline]
    pub(crate) fn to_logical(&self, i: usize, j: usize) -> (usize, usize) {
        if self.is_csc {
            (i, j)
        } else {
            (j, i)
        }
    }

    pub(crate) fn check_indices(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.nrows() {
            return Err(Error::InvalidIndex {
                index: row,
                size: self.nrows(),
            });
        }
        if col >= self.ncols() {
            return Err(Error::InvalidIndex {
                index: col,
                size: self.ncols(),
            });
        }
        Ok(())
    }

    /// Number of vectors held in `p`
    #[inline]
    pub(crate) fn nvec(&self) -> usize {
        match self.sparsity {
            Sparsity::Hypersparse => self.h.len(),
            _ => self.vdim,
        }
    }

    #[inline]
    pub(crate) fn vstart(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Full | Sparsity::Bitmap => k * self.vlen,
            _ => self.p[k],
        }
    }

    #[inline]
    pub(crate) fn vend(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Full | Sparsity::Bitmap => (k + 1) * self.vlen,
            _ => self.p[k + 1],
        }
    }

    #[inline]
    pub(crate) fn vector_id(&self, k: usize) -> usize {
        match self.sparsity {
            Sparsity::Hypersparse => self.h[k],
            _ => k,
        }
    }

    #[inline]
    pub(crate) fn value_at(&self, pos: usize) -> &T {
        if self.iso {
            &self.x[0]
        } else {
            &self.x[pos]
        }
    }

    /// Number of value slots the arrays describe, zombies included
    pub(crate) fn stored_slots(&self) -> usize {
        match self.sparsity {
            Sparsity::Full | Sparsity::Bitmap => self.vlen * self.vdim,
            _ => self.p.last().copied().unwrap_or(0),
        }
    }

    /// Number of live entries, ignoring pending tuples
    pub(crate) fn live_entries(&self) -> usize {
        match self.sparsity {
            Sparsity::Full => self.vlen * self.vdim,
            Sparsity::Bitmap => self.nvals,
            _ => self.stored_slots() - self.nzombies,
        }
    }

    /// Number of vectors with at least one entry
    pub(crate) fn nvec_nonempty(&self) -> usize {
        match self.sparsity {
            Sparsity::Full => {
                if self.vlen == 0 {
                    0
                } else {
                    self.vdim
                }
            }
            Sparsity::Bitmap => (0..self.vdim)
                .filter(|&j| self.b[j * self.vlen..(j + 1) * self.vlen].iter().any(|&f| f))
                .count(),
            _ => (0..self.nvec()).filter(|&k| self.p[k + 1] > self.p[k]).count(),
        }
    }

    pub(crate) fn invalidate_hyper_hash(&mut self) {
        self.hyper_hash = OnceLock::new();
    }
}

impl<T: Scalar> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix<{}> {{", T::type_desc())?;
        writeln!(f, "  dimensions: {} × {}", self.nrows(), self.ncols())?;
        writeln!(
            f,
            "  format: {:?}, {:?}{}{}",
            self.format(),
            self.sparsity,
            if self.iso { ", iso" } else { "" },
            if self.jumbled { ", jumbled" } else { "" }
        )?;
        writeln!(f, "  entries: {}", self.live_entries())?;
        if self.nzombies > 0 {
            writeln!(f, "  zombies: {}", self.nzombies)?;
        }
        if let Some(pending) = &self.pending {
            writeln!(f, "  pending: {}", pending.len())?;
        }

        // Print a sample of the matrix content
        let vector = if self.is_csc { "col" } else { "row" };
        let nvec = self.nvec();
        let max_vectors_to_print = 5.min(nvec);

        if max_vectors_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for k in 0..max_vectors_to_print {
                write!(f, "    {} {}: ", vector, self.vector_id(k))?;
                let (start, end) = (self.vstart(k), self.vend(k));
                let present: Vec<usize> = (start..end)
                    .filter(|&pos| match self.sparsity {
                        Sparsity::Bitmap => self.b[pos],
                        Sparsity::Full => true,
                        _ => !is_zombie(self.i[pos]),
                    })
                    .collect();

                if present.is_empty() {
                    writeln!(f, "(empty)")?;
                    continue;
                }
                let max_elements = 5.min(present.len());
                for &pos in &present[..max_elements] {
                    let index = match self.sparsity {
                        Sparsity::Full | Sparsity::Bitmap => pos % self.vlen,
                        _ => self.i[pos],
                    };
                    write!(f, "({}, {:?}) ", index, self.value_at(pos))?;
                }
                if present.len() > max_elements {
                    write!(f, "... ({} more)", present.len() - max_elements)?;
                }
                writeln!(f)?;
            }

            if nvec > max_vectors_to_print {
                writeln!(f, "    ... ({} more {}s)", nvec - max_vectors_to_print, vector)?;
            }
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_matrix() {
        let m = Matrix::<f64>::new(3, 4);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 4);
        assert_eq!(m.format(), Format::ByRow);
        assert_eq!(m.sparsity(), Sparsity::Hypersparse);
        assert_eq!(m.live_entries(), 0);
        assert!(m.is_finished());

        let m = Matrix::<i32>::new_with_format(3, 4, Format::ByCol);
        assert_eq!(m.vlen, 3);
        assert_eq!(m.vdim, 4);
    }

    #[test]
    fn test_zombie_flip() {
        for i in [0, 1, 17, usize::MAX >> 1] {
            assert!(!is_zombie(i));
            assert!(is_zombie(flip(i)));
            assert_eq!(flip(flip(i)), i);
            assert_eq!(unflip(flip(i)), i);
        }
    }

    #[test]
    fn test_full_iso() {
        let mut m = Matrix::full_iso(2, 3, 7u8, Format::ByCol);
        assert_eq!(m.sparsity(), Sparsity::Full);
        assert!(m.is_iso());
        assert_eq!(m.nvals().unwrap(), 6);
        m.expand_iso().unwrap();
        assert!(!m.is_iso());
        assert_eq!(m.x, vec![7; 6]);
    }

    #[test]
    fn test_resize_drops_entries() {
        let mut m = Matrix::<i64>::new(4, 4);
        for k in 0..4 {
            m.set_element(k, k, k as i64 + 1).unwrap();
            m.set_element(k, 3 - k, 10).unwrap();
        }
        m.wait().unwrap();
        m.resize(2, 3).unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m.extract_element(0, 0).unwrap(), 1);
        assert_eq!(m.extract_element(1, 1).unwrap(), 2);
        assert_eq!(m.extract_element(1, 2).unwrap(), 10);
        assert_eq!(m.nvals().unwrap(), 3);
    }

    #[test]
    fn test_debug_output() {
        let mut m = Matrix::<f32>::new(2, 2);
        m.set_element(0, 1, 2.5).unwrap();
        m.wait().unwrap();
        let s = format!("{:?}", m);
        assert!(s.contains("dimensions: 2 × 2"));
        assert!(s.contains("(1, 2.5)"));
    }

    #[test]
    fn test_sparsity_control() {
        let c = SparsityControl::SPARSE | SparsityControl::FULL;
        assert!(c.allows(Sparsity::Full));
        assert!(!c.allows(Sparsity::Bitmap));
        assert!(SparsityControl::default().allows(Sparsity::Hypersparse));
    }
}
