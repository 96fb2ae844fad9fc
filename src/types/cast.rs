//! Typecasting between built-in types
//!
//! Every built-in value can be lifted into [`Value`] and lowered into any
//! other built-in type with C-like conversion rules: integers wrap, floats
//! saturate into integers (NaN becomes 0), anything becomes `bool` by testing
//! against zero, complex values lose their imaginary part when cast to a real
//! type. User-defined types only cast to themselves.

use std::any::Any;
use std::any::TypeId;

use num_complex::Complex;

use super::{Scalar, TypeCode};
use crate::error::{Error, Result};

/// A built-in value of any type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Fp32(f32),
    Fp64(f64),
    Fc32(Complex<f32>),
    Fc64(Complex<f64>),
}

/// Lower a [`Value`] into a real primitive with `as` semantics
macro_rules! value_as {
    ($v:expr, $t:ty) => {
        match $v {
            Value::Bool(b) => b as u8 as $t,
            Value::Int8(x) => x as $t,
            Value::Int16(x) => x as $t,
            Value::Int32(x) => x as $t,
            Value::Int64(x) => x as $t,
            Value::UInt8(x) => x as $t,
            Value::UInt16(x) => x as $t,
            Value::UInt32(x) => x as $t,
            Value::UInt64(x) => x as $t,
            Value::Fp32(x) => x as $t,
            Value::Fp64(x) => x as $t,
            Value::Fc32(c) => c.re as $t,
            Value::Fc64(c) => c.re as $t,
        }
    };
}

pub(crate) use value_as;

impl Value {
    /// Type code of the held value
    pub fn code(&self) -> TypeCode {
        match self {
            Value::Bool(_) => TypeCode::Bool,
            Value::Int8(_) => TypeCode::Int8,
            Value::Int16(_) => TypeCode::Int16,
            Value::Int32(_) => TypeCode::Int32,
            Value::Int64(_) => TypeCode::Int64,
            Value::UInt8(_) => TypeCode::UInt8,
            Value::UInt16(_) => TypeCode::UInt16,
            Value::UInt32(_) => TypeCode::UInt32,
            Value::UInt64(_) => TypeCode::UInt64,
            Value::Fp32(_) => TypeCode::Fp32,
            Value::Fp64(_) => TypeCode::Fp64,
            Value::Fc32(_) => TypeCode::Fc32,
            Value::Fc64(_) => TypeCode::Fc64,
        }
    }

    /// The value tested against zero
    pub fn as_bool(self) -> bool {
        match self {
            Value::Bool(b) => b,
            Value::Fp32(x) => x != 0.0,
            Value::Fp64(x) => x != 0.0,
            Value::Fc32(c) => c.re != 0.0 || c.im != 0.0,
            Value::Fc64(c) => c.re != 0.0 || c.im != 0.0,
            other => value_as!(other, i128) != 0,
        }
    }

    /// The value as a double-precision complex number
    pub fn as_fc64(self) -> Complex<f64> {
        match self {
            Value::Fc32(c) => Complex::new(c.re as f64, c.im as f64),
            Value::Fc64(c) => c,
            other => Complex::new(value_as!(other, f64), 0.0),
        }
    }

    /// The value as a single-precision complex number
    pub fn as_fc32(self) -> Complex<f32> {
        match self {
            Value::Fc32(c) => c,
            Value::Fc64(c) => Complex::new(c.re as f32, c.im as f32),
            other => Complex::new(value_as!(other, f32), 0.0),
        }
    }
}

/// A typecasting function from `S` to `D`
pub type CastFn<S, D> = fn(&S) -> D;

fn cast_identity<S: Scalar, D: Scalar>(s: &S) -> D {
    // only selected when S and D are the same type
    (s as &dyn Any)
        .downcast_ref::<D>()
        .cloned()
        .unwrap_or_default()
}

fn cast_builtin<S: Scalar, D: Scalar>(s: &S) -> D {
    s.to_value().and_then(D::from_value).unwrap_or_default()
}

/// Return the function casting `S` into `D`
///
/// Fails with `DomainMismatch` when the two types are not compatible, which
/// is the case whenever a user-defined type meets any other type.
pub fn cast_factory<S: Scalar, D: Scalar>() -> Result<CastFn<S, D>> {
    if TypeId::of::<S>() == TypeId::of::<D>() {
        return Ok(cast_identity::<S, D>);
    }
    let (from, to) = (S::type_desc(), D::type_desc());
    if from.is_builtin() && to.is_builtin() {
        Ok(cast_builtin::<S, D>)
    } else {
        Err(Error::domain_mismatch(format!(
            "cannot typecast {from} to {to}"
        )))
    }
}

/// Cast a single value
pub fn cast<S: Scalar, D: Scalar>(s: &S) -> Result<D> {
    Ok(cast_factory::<S, D>()?(s))
}

/// Check that `S` can be cast into `D` without building the function
pub fn check_castable<S: Scalar, D: Scalar>(what: &str) -> Result<()> {
    let (from, to) = (S::type_desc(), D::type_desc());
    if from.compatible(&to) {
        Ok(())
    } else {
        Err(Error::domain_mismatch(format!(
            "{what}: {from} is not compatible with {to}"
        )))
    }
}
