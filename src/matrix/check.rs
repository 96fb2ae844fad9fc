//! Structural validation

use super::{is_zombie, unflip, Matrix, Sparsity};
use crate::error::{Error, Result};
use crate::types::Scalar;

impl<T: Scalar> Matrix<T> {
    /// Verify every structural invariant, returning `InvalidObject` on the
    /// first violation found
    ///
    /// This is O(nnz) and meant for tests and debugging.
    pub fn check(&self) -> Result<()> {
        let bad = |msg: String| Err(Error::invalid_object(msg));

        if self.iso && self.x.len() != 1 {
            return bad(format!("iso matrix holds {} values", self.x.len()));
        }

        match self.sparsity {
            Sparsity::Full | Sparsity::Bitmap => {
                let slots = self.dense_slots()?;
                if !self.iso && self.x.len() != slots {
                    return bad(format!("{} values for {} slots", self.x.len(), slots));
                }
                if self.nzombies != 0 || self.jumbled {
                    return bad("dense matrix with zombies or jumbled".into());
                }
                if self.sparsity == Sparsity::Bitmap {
                    if self.b.len() != slots {
                        return bad(format!("bitmap of {} flags for {} slots", self.b.len(), slots));
                    }
                    let count = self.b.iter().filter(|&&f| f).count();
                    if count != self.nvals {
                        return bad(format!(
                            "bitmap counts {} entries, nvals is {}",
                            count, self.nvals
                        ));
                    }
                }
                Ok(())
            }
            Sparsity::Sparse | Sparsity::Hypersparse => self.check_sparse(),
        }
    }

    fn check_sparse(&self) -> Result<()> {
        let bad = |msg: String| Err(Error::invalid_object(msg));
        let nvec = self.nvec();

        if self.p.len() != nvec + 1 || self.p[0] != 0 {
            return bad(format!("vector pointers malformed: {} for {} vectors", self.p.len(), nvec));
        }
        if self.p.windows(2).any(|w| w[0] > w[1]) {
            return bad("vector pointers decrease".into());
        }
        let nnz = self.p[nvec];
        if self.i.len() != nnz {
            return bad(format!("{} indices for {} entries", self.i.len(), nnz));
        }
        if !self.iso && self.x.len() != nnz {
            return bad(format!("{} values for {} entries", self.x.len(), nnz));
        }

        if self.sparsity == Sparsity::Hypersparse {
            if self.h.windows(2).any(|w| w[0] >= w[1]) {
                return bad("hyperlist not strictly increasing".into());
            }
            if self.h.last().is_some_and(|&j| j >= self.vdim) {
                return bad("hyperlist holds a vector out of range".into());
            }
            if let Some(hash) = self.hyper_hash.get() {
                if !hash.matches(&self.h) {
                    return bad("hyper hash does not match the hyperlist".into());
                }
            }
        }

        let mut zombies = 0;
        for k in 0..nvec {
            let mut last: Option<usize> = None;
            for pos in self.p[k]..self.p[k + 1] {
                let i = unflip(self.i[pos]);
                if is_zombie(self.i[pos]) {
                    zombies += 1;
                }
                if i >= self.vlen {
                    return bad(format!("index {} out of range in vector {}", i, self.vector_id(k)));
                }
                if !self.jumbled {
                    if let Some(prev) = last {
                        if i <= prev {
                            return bad(format!("indices unsorted in vector {}", self.vector_id(k)));
                        }
                    }
                }
                last = Some(i);
            }
        }
        if zombies != self.nzombies {
            return bad(format!("{} zombies found, {} recorded", zombies, self.nzombies));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_matrix_passes() {
        let mut m = Matrix::<i32>::new(4, 4);
        m.set_element(1, 2, 3).unwrap();
        m.wait().unwrap();
        m.check().unwrap();
        m.remove_element(1, 2).unwrap();
        m.check().unwrap();
    }

    #[test]
    fn test_unsorted_indices_rejected() {
        let m = Matrix::<i32>::sparse_from_parts(
            4,
            1,
            true,
            vec![0, 2],
            None,
            vec![3, 1],
            vec![1, 2],
            false,
        );
        assert!(matches!(m.check(), Err(Error::InvalidObject(_))));
    }

    #[test]
    fn test_bad_pointers_rejected() {
        let m = Matrix::<i32>::sparse_from_parts(
            4,
            2,
            true,
            vec![0, 2, 1],
            None,
            vec![0],
            vec![1],
            false,
        );
        assert!(m.check().is_err());
    }

    #[test]
    fn test_zombie_count_mismatch_rejected() {
        let mut m = Matrix::<i32>::sparse_from_parts(
            4,
            1,
            true,
            vec![0, 2],
            None,
            vec![0, 2],
            vec![1, 2],
            false,
        );
        m.nzombies = 1;
        assert!(m.check().is_err());
    }

    #[test]
    fn test_bitmap_count_rejected() {
        let mut m = Matrix::<u8>::bitmap_from_parts(
            2,
            1,
            true,
            vec![true, false],
            vec![1, 0],
            1,
            false,
        );
        m.check().unwrap();
        m.nvals = 2;
        assert!(m.check().is_err());
    }
}
