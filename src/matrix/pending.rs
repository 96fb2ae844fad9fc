//! Single-entry updates: pending tuples and zombies
//!
//! Writing an entry that already exists (live or zombie) updates it in
//! place. Writing a new entry into a sparse or hypersparse matrix appends a
//! pending tuple instead, and deleting one turns it into a zombie. Both are
//! resolved in bulk by [`Matrix::wait`].

use super::{flip, is_zombie, unflip, Matrix, Sparsity};
use crate::error::{Error, Result};
use crate::ops::BinaryOp;
use crate::types::Scalar;

/// Insertions not yet merged into a matrix, in storage coordinates
#[derive(Clone)]
pub struct Pending<T> {
    /// Index within the vector
    pub(crate) i: Vec<usize>,
    /// Vector id
    pub(crate) j: Vec<usize>,
    pub(crate) x: Vec<T>,
    /// Combines duplicates; `None` keeps the last one
    pub(crate) dup: Option<BinaryOp<T>>,
    /// Tuples were appended in `(j, i)` order
    pub(crate) sorted: bool,
}

impl<T: Scalar> Pending<T> {
    pub(crate) fn new(dup: Option<BinaryOp<T>>) -> Self {
        Self {
            i: Vec::new(),
            j: Vec::new(),
            x: Vec::new(),
            dup,
            sorted: true,
        }
    }

    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    fn push(&mut self, i: usize, j: usize, x: T) -> Result<()> {
        let grow = |v: &mut Vec<usize>| {
            v.try_reserve(1)
                .map_err(|_| Error::out_of_memory::<usize>(v.len() + 1))
        };
        grow(&mut self.i)?;
        grow(&mut self.j)?;
        self.x
            .try_reserve(1)
            .map_err(|_| Error::out_of_memory::<T>(self.x.len() + 1))?;
        if let (Some(&li), Some(&lj)) = (self.i.last(), self.j.last()) {
            if (lj, li) > (j, i) {
                self.sorted = false;
            }
        }
        self.i.push(i);
        self.j.push(j);
        self.x.push(x);
        Ok(())
    }

    fn same_dup(&self, dup: Option<&BinaryOp<T>>) -> bool {
        match (&self.dup, dup) {
            (None, None) => true,
            (Some(a), Some(b)) => a.opcode() == b.opcode() && a.name() == b.name(),
            _ => false,
        }
    }
}

impl<T: Scalar> Matrix<T> {
    /// Set `A(row, col) = value`
    ///
    /// An existing entry is overwritten in place, and a zombie at that
    /// position is brought back to life. A new entry in a sparse or
    /// hypersparse matrix becomes a pending tuple until the next
    /// [`Matrix::wait`].
    pub fn set_element(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.write_element(row, col, value, None)
    }

    /// Set `A(row, col) = op(A(row, col), value)`, or `value` if absent
    ///
    /// Pending tuples written this way are combined with `op` when they
    /// collide.
    pub fn accumulate_element(
        &mut self,
        row: usize,
        col: usize,
        value: T,
        op: &BinaryOp<T>,
    ) -> Result<()> {
        self.write_element(row, col, value, Some(op))
    }

    fn write_element(
        &mut self,
        row: usize,
        col: usize,
        value: T,
        accum: Option<&BinaryOp<T>>,
    ) -> Result<()> {
        self.check_indices(row, col)?;
        let (i, j) = self.to_storage(row, col);

        match self.sparsity {
            Sparsity::Full | Sparsity::Bitmap => {
                let pos = j * self.vlen + i;
                let present = self.sparsity == Sparsity::Full || self.b[pos];
                let value = match accum {
                    Some(op) if present => op.call(self.value_at(pos), &value),
                    _ => value,
                };
                self.store_value(pos, value)?;
                if !present {
                    self.b[pos] = true;
                    self.nvals += 1;
                }
                Ok(())
            }
            _ => {
                if self.jumbled {
                    self.wait()?;
                    return self.write_element(row, col, value, accum);
                }
                if let Some(pos) = self.find_entry(i, j) {
                    if is_zombie(self.i[pos]) {
                        self.i[pos] = i;
                        self.nzombies -= 1;
                        return self.store_value(pos, value);
                    }
                    let value = match accum {
                        Some(op) => op.call(self.value_at(pos), &value),
                        None => value,
                    };
                    return self.store_value(pos, value);
                }

                // a new entry: pending tuples must share one dup operator
                if let Some(pending) = &self.pending {
                    if !pending.same_dup(accum) {
                        self.wait()?;
                        return self.write_element(row, col, value, accum);
                    }
                }
                let pending = self
                    .pending
                    .get_or_insert_with(|| Pending::new(accum.cloned()));
                pending.push(i, j, value)
            }
        }
    }

    /// Overwrite the value at `pos`, expanding an iso matrix if needed
    fn store_value(&mut self, pos: usize, value: T) -> Result<()> {
        if self.iso {
            if self.x[0] == value {
                return Ok(());
            }
            self.expand_iso()?;
        }
        self.x[pos] = value;
        Ok(())
    }

    /// Delete `A(row, col)` if present
    ///
    /// A sparse entry becomes a zombie; a full matrix turns into a bitmap.
    pub fn remove_element(&mut self, row: usize, col: usize) -> Result<()> {
        self.check_indices(row, col)?;
        if self.pending.is_some() || self.jumbled {
            self.wait()?;
        }
        let (i, j) = self.to_storage(row, col);
        match self.sparsity {
            Sparsity::Full => {
                self.convert_to_bitmap()?;
                self.remove_element(row, col)
            }
            Sparsity::Bitmap => {
                let pos = j * self.vlen + i;
                if self.b[pos] {
                    self.b[pos] = false;
                    self.nvals -= 1;
                }
                Ok(())
            }
            _ => {
                if let Some(pos) = self.find_entry(i, j) {
                    if !is_zombie(self.i[pos]) {
                        self.i[pos] = flip(i);
                        self.nzombies += 1;
                    }
                }
                Ok(())
            }
        }
    }

    /// Return `A(row, col)`, or `Error::NoValue` if there is no entry
    pub fn extract_element(&mut self, row: usize, col: usize) -> Result<T> {
        self.check_indices(row, col)?;
        if self.pending.is_some() || self.jumbled {
            self.wait()?;
        }
        let (i, j) = self.to_storage(row, col);
        self.get_stored(i, j).cloned().ok_or(Error::NoValue)
    }

    /// The live value at storage position `(i, j)` of a finished matrix
    pub(crate) fn get_stored(&self, i: usize, j: usize) -> Option<&T> {
        match self.sparsity {
            Sparsity::Full => Some(self.value_at(j * self.vlen + i)),
            Sparsity::Bitmap => {
                let pos = j * self.vlen + i;
                self.b[pos].then(|| self.value_at(pos))
            }
            _ => {
                let pos = self.find_entry(i, j)?;
                (!is_zombie(self.i[pos])).then(|| self.value_at(pos))
            }
        }
    }

    /// Position of entry `(i, j)`, live or zombie, in a sorted sparse matrix
    pub(crate) fn find_entry(&self, i: usize, j: usize) -> Option<usize> {
        let k = self.find_vector(j)?;
        let (start, end) = (self.p[k], self.p[k + 1]);
        let slice = &self.i[start..end];
        let offset = slice.partition_point(|&x| unflip(x) < i);
        (offset < slice.len() && unflip(slice[offset]) == i).then_some(start + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Format;

    #[test]
    fn test_set_then_extract() {
        let mut m = Matrix::<f64>::new(3, 3);
        m.set_element(1, 2, 4.0).unwrap();
        assert!(m.has_pending());
        assert_eq!(m.extract_element(1, 2).unwrap(), 4.0);
        assert!(!m.has_pending());
        assert_eq!(m.extract_element(0, 0), Err(Error::NoValue));
    }

    #[test]
    fn test_existing_entry_updated_in_place() {
        let mut m = Matrix::<i32>::new(2, 2);
        m.set_element(0, 0, 1).unwrap();
        m.wait().unwrap();
        m.set_element(0, 0, 5).unwrap();
        assert!(!m.has_pending());
        assert_eq!(m.extract_element(0, 0).unwrap(), 5);
    }

    #[test]
    fn test_zombie_resurrection() {
        let mut m = Matrix::<i32>::new_with_format(3, 3, Format::ByCol);
        m.set_element(2, 1, 9).unwrap();
        m.wait().unwrap();
        m.remove_element(2, 1).unwrap();
        assert_eq!(m.nzombies(), 1);
        assert_eq!(m.extract_element(2, 1), Err(Error::NoValue));
        m.set_element(2, 1, 3).unwrap();
        assert_eq!(m.nzombies(), 0);
        assert!(!m.has_pending());
        assert_eq!(m.extract_element(2, 1).unwrap(), 3);
    }

    #[test]
    fn test_accumulate_combines_duplicates() {
        let plus = BinaryOp::<i64>::plus();
        let mut m = Matrix::<i64>::new(2, 2);
        m.accumulate_element(1, 1, 2, &plus).unwrap();
        m.accumulate_element(1, 1, 3, &plus).unwrap();
        assert_eq!(m.extract_element(1, 1).unwrap(), 5);
        m.accumulate_element(1, 1, 10, &plus).unwrap();
        assert_eq!(m.extract_element(1, 1).unwrap(), 15);
    }

    #[test]
    fn test_set_last_wins() {
        let mut m = Matrix::<u8>::new(2, 2);
        m.set_element(0, 1, 1).unwrap();
        m.set_element(0, 1, 2).unwrap();
        assert_eq!(m.nvals().unwrap(), 1);
        assert_eq!(m.extract_element(0, 1).unwrap(), 2);
    }

    #[test]
    fn test_remove_from_full_goes_bitmap() {
        let mut m = Matrix::full_iso(2, 2, 1.0f32, Format::ByRow);
        m.remove_element(1, 0).unwrap();
        assert_eq!(m.sparsity(), Sparsity::Bitmap);
        assert_eq!(m.nvals().unwrap(), 3);
        assert_eq!(m.extract_element(1, 0), Err(Error::NoValue));
    }

    #[test]
    fn test_out_of_range_index() {
        let mut m = Matrix::<f64>::new(2, 3);
        assert_eq!(
            m.set_element(2, 0, 1.0),
            Err(Error::InvalidIndex { index: 2, size: 2 })
        );
        assert!(m.remove_element(0, 3).is_err());
    }
}
