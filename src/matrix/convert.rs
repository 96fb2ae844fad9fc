//! Conversion among full, bitmap, sparse and hypersparse formats

use tracing::trace;

use super::{is_zombie, Matrix, Sparsity, SparsityControl};
use crate::error::{Error, Result};
use crate::types::Scalar;
use crate::utils::{try_filled, try_vec};

impl<T: Scalar> Matrix<T> {
    /// Number of slots of a bitmap or full matrix of this shape
    pub(crate) fn dense_slots(&self) -> Result<usize> {
        self.vlen.checked_mul(self.vdim).ok_or(Error::OutOfMemory {
            size: usize::MAX,
        })
    }

    /// Restrict the formats this matrix may take, and conform to them
    pub fn set_sparsity_control(&mut self, control: SparsityControl) -> Result<()> {
        if control.is_empty() {
            return Err(Error::invalid_value("sparsity control allows no format"));
        }
        self.control = control;
        self.wait()
    }

    /// Choose the format dictated by the sparsity control and switches
    ///
    /// Bitmap and hypersparse decisions have hysteresis: a matrix enters the
    /// format at one threshold and leaves it at half (bitmap) or twice
    /// (hypersparse) of it.
    pub(crate) fn preferred_sparsity(&self) -> Sparsity {
        let c = self.control;
        let slots = self.vlen as f64 * self.vdim as f64;
        let nnz = self.live_entries();
        let all_present = (nnz as f64) == slots;

        if all_present && c.allows(Sparsity::Full) {
            return Sparsity::Full;
        }
        let sparse_allowed = c.intersects(SparsityControl::SPARSE | SparsityControl::HYPERSPARSE);
        if c.allows(Sparsity::Bitmap) {
            let dense_enough = match self.sparsity {
                Sparsity::Bitmap | Sparsity::Full => nnz as f64 >= self.bitmap_switch / 2.0 * slots,
                _ => nnz as f64 > self.bitmap_switch * slots,
            };
            if dense_enough || !sparse_allowed {
                return Sparsity::Bitmap;
            }
        }
        if !sparse_allowed {
            // only full is allowed but some entries are missing
            return Sparsity::Bitmap;
        }

        let nonempty = self.nvec_nonempty() as f64;
        let vdim = self.vdim as f64;
        let want_hyper = if self.sparsity == Sparsity::Hypersparse {
            nonempty <= 2.0 * self.hyper_switch * vdim
        } else {
            nonempty <= self.hyper_switch * vdim
        };
        let hyper_ok = c.allows(Sparsity::Hypersparse) && self.vdim > 1;
        if hyper_ok && (want_hyper || !c.allows(Sparsity::Sparse)) {
            Sparsity::Hypersparse
        } else if c.allows(Sparsity::Sparse) {
            Sparsity::Sparse
        } else {
            Sparsity::Hypersparse
        }
    }

    /// Move to the preferred format; a no-op while work is pending
    pub fn conform(&mut self) -> Result<()> {
        if !self.is_finished() {
            return Ok(());
        }
        let target = self.preferred_sparsity();
        self.convert_sparsity(target)
    }

    /// Re-encode in `target` format
    ///
    /// Converting to full fails with `InvalidValue` unless every entry is
    /// present.
    pub fn convert_sparsity(&mut self, target: Sparsity) -> Result<()> {
        if target == self.sparsity {
            return Ok(());
        }
        trace!(from = ?self.sparsity, to = ?target, "convert sparsity");
        match target {
            Sparsity::Sparse => self.convert_to_sparse(),
            Sparsity::Hypersparse => self.convert_to_hyper(),
            Sparsity::Bitmap => self.convert_to_bitmap(),
            Sparsity::Full => self.convert_to_full(),
        }
    }

    pub(crate) fn convert_to_sparse(&mut self) -> Result<()> {
        match self.sparsity {
            Sparsity::Sparse => Ok(()),
            Sparsity::Hypersparse => {
                let mut p = try_vec(self.vdim + 1)?;
                let mut k = 0;
                p.push(0);
                for j in 0..self.vdim {
                    if k < self.h.len() && self.h[k] == j {
                        k += 1;
                    }
                    p.push(self.p[k]);
                }
                self.p = p;
                self.h = Vec::new();
                self.sparsity = Sparsity::Sparse;
                self.invalidate_hyper_hash();
                Ok(())
            }
            Sparsity::Bitmap | Sparsity::Full => {
                let full = self.sparsity == Sparsity::Full;
                let nnz = self.live_entries();
                let mut p = try_vec(self.vdim + 1)?;
                let mut i = try_vec(nnz)?;
                let mut x = try_vec(if self.iso { 1 } else { nnz })?;
                p.push(0);
                for j in 0..self.vdim {
                    for row in 0..self.vlen {
                        let pos = j * self.vlen + row;
                        if full || self.b[pos] {
                            i.push(row);
                            if !self.iso {
                                x.push(self.x[pos].clone());
                            }
                        }
                    }
                    p.push(i.len());
                }
                if self.iso {
                    x.extend(self.x.first().cloned());
                }
                self.p = p;
                self.i = i;
                self.x = x;
                self.b = Vec::new();
                self.nvals = 0;
                self.sparsity = Sparsity::Sparse;
                Ok(())
            }
        }
    }

    pub(crate) fn convert_to_hyper(&mut self) -> Result<()> {
        match self.sparsity {
            Sparsity::Hypersparse => Ok(()),
            Sparsity::Sparse => {
                let nonempty = self.nvec_nonempty();
                let mut h = try_vec(nonempty)?;
                let mut p = try_vec(nonempty + 1)?;
                for j in 0..self.vdim {
                    if self.p[j + 1] > self.p[j] {
                        h.push(j);
                        p.push(self.p[j]);
                    }
                }
                p.push(self.p[self.vdim]);
                self.p = p;
                self.h = h;
                self.sparsity = Sparsity::Hypersparse;
                self.invalidate_hyper_hash();
                Ok(())
            }
            Sparsity::Bitmap | Sparsity::Full => {
                self.convert_to_sparse()?;
                self.convert_to_hyper()
            }
        }
    }

    pub(crate) fn convert_to_bitmap(&mut self) -> Result<()> {
        match self.sparsity {
            Sparsity::Bitmap => Ok(()),
            Sparsity::Full => {
                let slots = self.dense_slots()?;
                self.b = try_filled(slots, true)?;
                self.nvals = slots;
                self.sparsity = Sparsity::Bitmap;
                Ok(())
            }
            Sparsity::Sparse | Sparsity::Hypersparse => {
                if !self.is_finished() {
                    self.wait()?;
                    if self.sparsity == Sparsity::Bitmap {
                        return Ok(());
                    }
                    if matches!(self.sparsity, Sparsity::Full) {
                        return self.convert_to_bitmap();
                    }
                }
                let slots = self.dense_slots()?;
                let mut b = try_filled(slots, false)?;
                let mut x = if self.iso {
                    try_vec(1)?
                } else {
                    try_filled(slots, T::default())?
                };
                let mut nvals = 0;
                for k in 0..self.nvec() {
                    let j = self.vector_id(k);
                    for pos in self.p[k]..self.p[k + 1] {
                        let row = self.i[pos];
                        debug_assert!(!is_zombie(row));
                        let dst = j * self.vlen + row;
                        b[dst] = true;
                        if !self.iso {
                            x[dst] = self.x[pos].clone();
                        }
                        nvals += 1;
                    }
                }
                if self.iso {
                    x.extend(self.x.first().cloned());
                }
                self.b = b;
                self.x = x;
                self.nvals = nvals;
                self.p = Vec::new();
                self.h = Vec::new();
                self.i = Vec::new();
                self.sparsity = Sparsity::Bitmap;
                self.invalidate_hyper_hash();
                Ok(())
            }
        }
    }

    pub(crate) fn convert_to_full(&mut self) -> Result<()> {
        if self.sparsity == Sparsity::Full {
            return Ok(());
        }
        if !self.is_finished() {
            self.wait()?;
        }
        let slots = self.dense_slots()?;
        if self.live_entries() != slots {
            return Err(Error::invalid_value(format!(
                "matrix with {} of {} entries cannot be full",
                self.live_entries(),
                slots
            )));
        }
        if matches!(self.sparsity, Sparsity::Sparse | Sparsity::Hypersparse) {
            // every vector is complete, so entries are already in dense order
            self.p = Vec::new();
            self.h = Vec::new();
            self.i = Vec::new();
            self.invalidate_hyper_hash();
        } else {
            self.b = Vec::new();
            self.nvals = 0;
        }
        self.sparsity = Sparsity::Full;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Format;

    fn sample() -> Matrix<i32> {
        // 3 × 4, stored by column
        let mut m = Matrix::new_with_format(3, 4, Format::ByCol);
        m.set_sparsity_control(SparsityControl::SPARSE).unwrap();
        m.build(&[0, 2, 1], &[0, 0, 3], &[1, 2, 3], None).unwrap();
        m
    }

    fn entries(m: &mut Matrix<i32>) -> Vec<(usize, usize, i32)> {
        let (r, c, v) = m.extract_tuples().unwrap();
        r.into_iter().zip(c).zip(v).map(|((r, c), v)| (r, c, v)).collect()
    }

    #[test]
    fn test_round_trip_through_every_format() {
        let mut m = sample();
        let expected = entries(&mut m);
        for target in [
            Sparsity::Hypersparse,
            Sparsity::Bitmap,
            Sparsity::Sparse,
            Sparsity::Bitmap,
            Sparsity::Hypersparse,
        ] {
            m.convert_sparsity(target).unwrap();
            assert_eq!(m.sparsity(), target);
            assert_eq!(entries(&mut m), expected);
            m.check().unwrap();
        }
    }

    #[test]
    fn test_hyper_lists_nonempty_vectors() {
        let mut m = sample();
        m.convert_sparsity(Sparsity::Hypersparse).unwrap();
        assert_eq!(m.h, vec![0, 3]);
        assert_eq!(m.p, vec![0, 2, 3]);
    }

    #[test]
    fn test_full_requires_all_entries() {
        let mut m = sample();
        assert!(matches!(
            m.convert_sparsity(Sparsity::Full),
            Err(Error::InvalidValue(_))
        ));
        let mut d = Matrix::<i32>::new(2, 2);
        d.set_sparsity_control(SparsityControl::SPARSE).unwrap();
        d.build(&[0, 0, 1, 1], &[0, 1, 0, 1], &[1, 2, 3, 4], None).unwrap();
        d.convert_sparsity(Sparsity::Full).unwrap();
        assert_eq!(d.x, vec![1, 2, 3, 4]);
        assert_eq!(d.extract_element(1, 0).unwrap(), 3);
    }

    #[test]
    fn test_conform_auto() {
        let mut m = Matrix::<f64>::new(100, 100);
        m.set_element(3, 4, 1.0).unwrap();
        m.wait().unwrap();
        assert_eq!(m.sparsity(), Sparsity::Hypersparse);

        let mut d = Matrix::<f64>::new(2, 2);
        for (r, c) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            d.set_element(r, c, 1.0).unwrap();
        }
        d.wait().unwrap();
        assert_eq!(d.sparsity(), Sparsity::Full);
        d.remove_element(0, 0).unwrap();
        d.wait().unwrap();
        assert_eq!(d.sparsity(), Sparsity::Bitmap);
    }
}
