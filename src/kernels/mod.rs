//! # Auxiliary operations
//!
//! Each operation computes a result `T` from its input and writes it
//! through the same `C<M> = accum(C, T)` step as the element-wise and
//! multiply engines. They share the entry-level task slicing of
//! [`ek_slice`](crate::parallel::ek_slice).

pub mod apply;
pub mod assign;
pub mod extract;
pub mod reduce;
pub mod select;
pub mod transpose;

pub use apply::{apply, apply_index};
pub use assign::{assign, assign_scalar};
pub use extract::extract;
pub use reduce::{reduce_to_scalar, reduce_to_vector};
pub use select::select;
pub use transpose::transpose;

use crate::config::Context;
use crate::error::{Error, Result};
use crate::matrix::MatrixView;
use crate::parallel::{ek_slice, EntryTask};
use crate::types::Scalar;

/// A list of row or column indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indices<'a> {
    /// Every index `0..n`, in order
    All,
    /// The given indices, in the given order
    List(&'a [usize]),
}

impl Indices<'_> {
    /// Number of indices when the dimension is `n`
    pub fn len(&self, n: usize) -> usize {
        match self {
            Indices::All => n,
            Indices::List(list) => list.len(),
        }
    }

    /// The `k`-th index
    #[inline]
    pub fn get(&self, k: usize) -> usize {
        match self {
            Indices::All => k,
            Indices::List(list) => list[k],
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Indices::All)
    }

    /// Fail with `InvalidIndex` unless every index is below `n`
    pub(crate) fn check(&self, n: usize) -> Result<()> {
        if let Indices::List(list) = self {
            if let Some(&bad) = list.iter().find(|&&i| i >= n) {
                return Err(Error::InvalidIndex { index: bad, size: n });
            }
        }
        Ok(())
    }
}

/// Entry tasks over the entries of `view`
pub(crate) fn entry_tasks<T: Scalar>(
    ctx: &Context,
    view: &MatrixView<'_, T>,
) -> Result<Vec<EntryTask>> {
    let (nvec, anz) = (view.nvec(), view.nnz());
    let nthreads = ctx.nthreads_for(anz);
    let ntasks = ctx.ntasks_for(nthreads, anz);
    ek_slice(
        nvec,
        anz,
        |k| if k == nvec { anz } else { view.vstart(k) },
        ntasks,
    )
}

/// Logical `(row, col)` of storage index `i` in vector `j`
#[inline]
pub(crate) fn logical(is_csc: bool, i: usize, j: usize) -> (usize, usize) {
    if is_csc {
        (i, j)
    } else {
        (j, i)
    }
}
