//! Vector lookup in hypersparse matrices
//!
//! The hyperlist `h` is searched by bisection. Once it holds at least
//! `hyper_hash_min` vectors, the first lookup builds a hash from vector id to
//! position in `h`, kept until the next structural change.

use hashbrown::HashMap;

use super::{Matrix, Sparsity};
use crate::types::Scalar;

/// Map from vector id `j` to its position `k` in the hyperlist
#[derive(Debug, Clone, Default)]
pub struct HyperHash {
    map: HashMap<usize, usize>,
}

impl HyperHash {
    /// Build the hash of a hyperlist
    pub fn build(h: &[usize]) -> Self {
        let mut map = HashMap::with_capacity(h.len());
        for (k, &j) in h.iter().enumerate() {
            map.insert(j, k);
        }
        Self { map }
    }

    #[inline]
    pub fn get(&self, j: usize) -> Option<usize> {
        self.map.get(&j).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True if the hash maps exactly `h[k] -> k`
    pub fn matches(&self, h: &[usize]) -> bool {
        self.map.len() == h.len() && h.iter().enumerate().all(|(k, &j)| self.get(j) == Some(k))
    }
}

/// Find `j` in a strictly increasing hyperlist
#[inline]
pub(crate) fn bisect(h: &[usize], j: usize) -> Option<usize> {
    h.binary_search(&j).ok()
}

impl<T: Scalar> Matrix<T> {
    /// Position `k` of vector `j` in `p`, if it is present
    pub(crate) fn find_vector(&self, j: usize) -> Option<usize> {
        match self.sparsity {
            Sparsity::Hypersparse => {
                if self.h.len() >= self.hyper_hash_min.max(1) {
                    self.hyper_hash
                        .get_or_init(|| HyperHash::build(&self.h))
                        .get(j)
                } else {
                    bisect(&self.h, j)
                }
            }
            _ => (j < self.vdim).then_some(j),
        }
    }

    /// The hyper hash, if it has been built
    pub fn hyper_hash(&self) -> Option<&HyperHash> {
        self.hyper_hash.get()
    }

    /// Entry range `[start, end)` of vector `j`; empty if absent
    pub(crate) fn vector_range(&self, j: usize) -> (usize, usize) {
        match self.find_vector(j) {
            Some(k) => (self.vstart(k), self.vend(k)),
            None => (0, 0),
        }
    }
}
