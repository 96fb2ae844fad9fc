//! Index-unary operators `z = f(x, i, j)` with a bound thunk

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::IndexUnaryOpcode;
use crate::error::{Error, Result};
use crate::types::{Builtin, Scalar};

type IndexFn<X, Z> = Arc<dyn Fn(&X, usize, usize) -> Z + Send + Sync>;

/// An operator on an entry's value and its (row, column) position
///
/// The thunk of the GraphBLAS interface is bound at construction.
pub struct IndexUnaryOp<X, Z = bool> {
    opcode: IndexUnaryOpcode,
    name: Cow<'static, str>,
    func: IndexFn<X, Z>,
}

impl<X, Z> Clone for IndexUnaryOp<X, Z> {
    fn clone(&self) -> Self {
        Self {
            opcode: self.opcode,
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<X, Z> fmt::Debug for IndexUnaryOp<X, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexUnaryOp")
            .field("opcode", &self.opcode)
            .field("name", &self.name)
            .finish()
    }
}

impl<X: Scalar, Z: Scalar> IndexUnaryOp<X, Z> {
    /// Create a user-defined operator
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&X, usize, usize) -> Z + Send + Sync + 'static,
    {
        Self {
            opcode: IndexUnaryOpcode::User,
            name: name.into(),
            func: Arc::new(f),
        }
    }

    /// Apply to the entry `x` at row `i`, column `j`
    #[inline]
    pub fn call(&self, x: &X, i: usize, j: usize) -> Z {
        (self.func)(x, i, j)
    }

    pub fn opcode(&self) -> IndexUnaryOpcode {
        self.opcode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn builtin<F>(opcode: IndexUnaryOpcode, name: &'static str, f: F) -> Self
    where
        F: Fn(&X, usize, usize) -> Z + Send + Sync + 'static,
    {
        Self {
            opcode,
            name: Cow::Borrowed(name),
            func: Arc::new(f),
        }
    }
}

impl<X: Scalar> IndexUnaryOp<X, bool> {
    /// Keep entries on or below diagonal `k`: `j <= i + k`
    pub fn tril(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::Tril, "tril", move |_, i, j| {
            (j as i64) <= (i as i64) + k
        })
    }

    /// Keep entries on or above diagonal `k`: `j >= i + k`
    pub fn triu(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::Triu, "triu", move |_, i, j| {
            (j as i64) >= (i as i64) + k
        })
    }

    /// Keep entries on diagonal `k`
    pub fn diag(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::Diag, "diag", move |_, i, j| {
            (j as i64) == (i as i64) + k
        })
    }

    /// Keep entries off diagonal `k`
    pub fn offdiag(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::Offdiag, "offdiag", move |_, i, j| {
            (j as i64) != (i as i64) + k
        })
    }
}

impl<X: Scalar> IndexUnaryOp<X, i64> {
    /// `z = i + k`
    pub fn rowindex(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::RowIndex, "rowindex", move |_, i, _| {
            i as i64 + k
        })
    }

    /// `z = j + k`
    pub fn colindex(k: i64) -> Self {
        Self::builtin(IndexUnaryOpcode::ColIndex, "colindex", move |_, _, j| {
            j as i64 + k
        })
    }
}

impl<T: Builtin> IndexUnaryOp<T, bool> {
    /// Compare each value against `thunk`
    ///
    /// `opcode` is one of the `Value*` opcodes; ordering comparisons fail
    /// with `DomainMismatch` on complex types.
    pub fn value_cmp(opcode: IndexUnaryOpcode, thunk: T) -> Result<Self> {
        use IndexUnaryOpcode::*;
        if matches!(opcode, ValueGt | ValueGe | ValueLt | ValueLe) && !T::ORDERED {
            return Err(Error::domain_mismatch(format!(
                "ordered comparison is not defined for {}",
                T::type_desc()
            )));
        }
        let op = match opcode {
            ValueEq => Self::builtin(opcode, "valueeq", move |x: &T, _, _| *x == thunk),
            ValueNe => Self::builtin(opcode, "valuene", move |x: &T, _, _| *x != thunk),
            ValueGt => Self::builtin(opcode, "valuegt", move |x: &T, _, _| T::gt(*x, thunk)),
            ValueGe => Self::builtin(opcode, "valuege", move |x: &T, _, _| T::ge(*x, thunk)),
            ValueLt => Self::builtin(opcode, "valuelt", move |x: &T, _, _| T::lt(*x, thunk)),
            ValueLe => Self::builtin(opcode, "valuele", move |x: &T, _, _| T::le(*x, thunk)),
            other => {
                return Err(Error::invalid_value(format!(
                    "{other:?} is not a value comparison"
                )))
            }
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_predicates() {
        let tril = IndexUnaryOp::<f64>::tril(0);
        assert!(tril.call(&1.0, 2, 1));
        assert!(tril.call(&1.0, 2, 2));
        assert!(!tril.call(&1.0, 1, 2));

        let triu = IndexUnaryOp::<f64>::triu(1);
        assert!(triu.call(&0.0, 0, 1));
        assert!(!triu.call(&0.0, 1, 1));

        assert!(IndexUnaryOp::<i8>::diag(-1).call(&0, 3, 2));
        assert!(IndexUnaryOp::<i8>::offdiag(0).call(&0, 3, 2));
        assert!(IndexUnaryOpcode::Tril.is_positional());
    }

    #[test]
    fn test_index_values() {
        assert_eq!(IndexUnaryOp::<u8, i64>::rowindex(1).call(&0, 4, 9), 5);
        assert_eq!(IndexUnaryOp::<u8, i64>::colindex(-2).call(&0, 4, 9), 7);
    }

    #[test]
    fn test_value_comparisons() {
        let gt = IndexUnaryOp::<i32>::value_cmp(IndexUnaryOpcode::ValueGt, 3).unwrap();
        assert!(gt.call(&4, 0, 0));
        assert!(!gt.call(&3, 0, 0));
        let bad = IndexUnaryOp::<num_complex::Complex<f32>>::value_cmp(
            IndexUnaryOpcode::ValueLt,
            num_complex::Complex::new(0.0, 0.0),
        );
        assert!(bad.is_err());
        assert!(IndexUnaryOp::<i32>::value_cmp(IndexUnaryOpcode::Tril, 0).is_err());
    }
}
