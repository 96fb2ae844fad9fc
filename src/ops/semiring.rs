//! Semirings: an additive monoid and a multiplicative operator

use super::{BinaryOp, BinaryOpcode, Monoid};
use crate::error::Result;
use crate::types::{Builtin, Scalar};

/// A semiring with multiply `Z = X * Y` and add over `Z`
#[derive(Debug, Clone)]
pub struct Semiring<X, Y = X, Z = X> {
    add: Monoid<Z>,
    multiply: BinaryOp<X, Y, Z>,
}

impl<X: Scalar, Y: Scalar, Z: Scalar> Semiring<X, Y, Z> {
    /// Combine a monoid and an operator; the types line up statically
    pub fn new(add: Monoid<Z>, multiply: BinaryOp<X, Y, Z>) -> Self {
        Self { add, multiply }
    }

    pub fn add(&self) -> &Monoid<Z> {
        &self.add
    }

    pub fn multiply(&self) -> &BinaryOp<X, Y, Z> {
        &self.multiply
    }

    /// The semiring computing `B'*A'` products: multiply takes `(y, x)`
    pub fn flip(&self) -> Semiring<Y, X, Z> {
        Semiring {
            add: self.add.clone(),
            multiply: self.multiply.flip(),
        }
    }

    /// Name in `add.multiply` form
    pub fn name(&self) -> String {
        format!("{}.{}", self.add.op().name(), self.multiply.name())
    }
}

impl<T: Builtin> Semiring<T> {
    /// A built-in semiring from two opcodes
    ///
    /// Both are renamed when `T` is `bool`, so `plus_times` is `lor_land`.
    pub fn builtin(add: BinaryOpcode, multiply: BinaryOpcode) -> Result<Self> {
        Ok(Self {
            add: Monoid::builtin(add)?,
            multiply: BinaryOp::builtin(multiply)?,
        })
    }

    /// The conventional `plus_times` semiring
    pub fn plus_times() -> Self {
        Self {
            add: Monoid::plus(),
            multiply: BinaryOp::times(),
        }
    }
}
