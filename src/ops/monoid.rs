//! Monoids: associative, commutative operators with an identity

use super::{BinaryOp, BinaryOpcode};
use crate::error::{Error, Result};
use crate::types::{Builtin, Scalar, TypeCode};

/// A monoid over `T`
///
/// The terminal value, when present, absorbs: `op(terminal, x) == terminal`.
/// Reductions stop early once they reach it.
#[derive(Debug, Clone)]
pub struct Monoid<T> {
    op: BinaryOp<T>,
    identity: T,
    terminal: Option<T>,
}

impl<T: Scalar> Monoid<T> {
    /// Create a monoid from an operator and its identity
    ///
    /// Fails with `InvalidValue` if `op(identity, identity) != identity`, or if
    /// `op` is a built-in operator that does not form a monoid.
    pub fn new(op: BinaryOp<T>, identity: T, terminal: Option<T>) -> Result<Self> {
        if op.is_builtin() && !op.opcode().is_monoid() {
            return Err(Error::invalid_value(format!(
                "operator {} is not associative and commutative",
                op.name()
            )));
        }
        if op.call(&identity, &identity) != identity {
            return Err(Error::invalid_value(format!(
                "{:?} is not an identity of {}",
                identity,
                op.name()
            )));
        }
        Ok(Self {
            op,
            identity,
            terminal,
        })
    }

    pub fn op(&self) -> &BinaryOp<T> {
        &self.op
    }

    pub fn identity(&self) -> &T {
        &self.identity
    }

    pub fn terminal(&self) -> Option<&T> {
        self.terminal.as_ref()
    }

    /// True if `z` absorbs every further operand
    #[inline]
    pub fn is_terminal(&self, z: &T) -> bool {
        match &self.terminal {
            Some(t) => t == z,
            None => self.op.opcode() == BinaryOpcode::Any,
        }
    }

    /// True if the monoid stops at the first value it sees
    pub fn is_any(&self) -> bool {
        self.op.opcode() == BinaryOpcode::Any
    }

    /// Combine two values
    #[inline]
    pub fn call(&self, x: &T, y: &T) -> T {
        self.op.call(x, y)
    }
}

impl<T: Builtin> Monoid<T> {
    /// A built-in monoid
    ///
    /// `opcode` is renamed first when `T` is `bool`, so `Plus` gives the
    /// `lor` monoid on booleans.
    pub fn builtin(opcode: BinaryOpcode) -> Result<Self> {
        let op = BinaryOp::<T>::builtin(opcode)?;
        let (identity, terminal) = match op.opcode() {
            BinaryOpcode::Plus => (T::zero(), None),
            BinaryOpcode::Times => match T::CODE {
                // 0 absorbs only where no NaN exists
                c if c.is_float() => (T::one(), None),
                _ => (T::one(), Some(T::zero())),
            },
            BinaryOpcode::Min => (T::highest(), Some(T::lowest())),
            BinaryOpcode::Max => (T::lowest(), Some(T::highest())),
            BinaryOpcode::Any => (T::zero(), None),
            BinaryOpcode::Lor => (T::zero(), Some(T::one())),
            BinaryOpcode::Land => (T::one(), Some(T::zero())),
            BinaryOpcode::Lxor => (T::zero(), None),
            BinaryOpcode::Eq if T::CODE == TypeCode::Bool => (T::one(), None),
            other => {
                return Err(Error::invalid_value(format!(
                    "{} is not a built-in monoid on {}",
                    other.name(),
                    T::type_desc()
                )))
            }
        };
        Self::new(op, identity, terminal)
    }

    pub fn plus() -> Self {
        Self {
            op: BinaryOp::plus(),
            identity: T::zero(),
            terminal: if T::CODE == TypeCode::Bool {
                Some(T::one())
            } else {
                None
            },
        }
    }

    pub fn times() -> Self {
        Self {
            op: BinaryOp::times(),
            identity: T::one(),
            terminal: if T::CODE.is_float() {
                None
            } else {
                Some(T::zero())
            },
        }
    }
}
