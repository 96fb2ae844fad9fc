//! The 13 built-in scalar types
//!
//! Besides [`Scalar`], each built-in type implements [`Builtin`], which holds
//! the arithmetic the built-in operators are made of. Integer arithmetic
//! wraps, and integer division by zero saturates (`x/0` is the largest value
//! of the sign of `x`, `0/0` is zero).

use num_complex::Complex;
use num_traits::{Bounded, Float};

use super::cast::value_as;
use super::{Scalar, Type, TypeCode, Value};

/// Arithmetic shared by the built-in operators
pub trait Builtin: Scalar + Copy {
    /// The type code of this built-in
    const CODE: TypeCode;

    /// Whether `<`, `min` and `max` are defined
    const ORDERED: bool;

    fn zero() -> Self;
    fn one() -> Self;
    fn from_bool(b: bool) -> Self;
    fn is_nonzero(self) -> bool;

    fn plus(x: Self, y: Self) -> Self;
    fn minus(x: Self, y: Self) -> Self;
    fn times(x: Self, y: Self) -> Self;
    fn div(x: Self, y: Self) -> Self;
    fn min(x: Self, y: Self) -> Self;
    fn max(x: Self, y: Self) -> Self;

    fn ainv(x: Self) -> Self;
    fn minv(x: Self) -> Self;
    fn abs(x: Self) -> Self;

    fn lt(x: Self, y: Self) -> bool;

    /// Smallest value, the identity of `max` and terminal of `min`
    fn lowest() -> Self;

    /// Largest value, the identity of `min` and terminal of `max`
    fn highest() -> Self;

    fn gt(x: Self, y: Self) -> bool {
        Self::lt(y, x)
    }
    fn le(x: Self, y: Self) -> bool {
        !Self::lt(y, x)
    }
    fn ge(x: Self, y: Self) -> bool {
        !Self::lt(x, y)
    }
}

macro_rules! impl_scalar_real {
    ($t:ty, $code:ident, $variant:ident) => {
        impl Scalar for $t {
            fn type_desc() -> Type {
                Type::builtin(TypeCode::$code)
            }
            fn to_value(&self) -> Option<Value> {
                Some(Value::$variant(*self))
            }
            fn from_value(value: Value) -> Option<Self> {
                Some(value_as!(value, $t))
            }
        }
    };
}

macro_rules! impl_builtin_int {
    (@body $t:ty, $code:ident, $div:expr, $abs:expr) => {
        impl Builtin for $t {
            const CODE: TypeCode = TypeCode::$code;
            const ORDERED: bool = true;

            fn zero() -> Self { 0 }
            fn one() -> Self { 1 }
            fn from_bool(b: bool) -> Self { b as $t }
            fn is_nonzero(self) -> bool { self != 0 }

            fn plus(x: Self, y: Self) -> Self { x.wrapping_add(y) }
            fn minus(x: Self, y: Self) -> Self { x.wrapping_sub(y) }
            fn times(x: Self, y: Self) -> Self { x.wrapping_mul(y) }
            fn div(x: Self, y: Self) -> Self { ($div)(x, y) }
            fn min(x: Self, y: Self) -> Self { std::cmp::min(x, y) }
            fn max(x: Self, y: Self) -> Self { std::cmp::max(x, y) }

            fn ainv(x: Self) -> Self { x.wrapping_neg() }
            fn minv(x: Self) -> Self { Self::div(1, x) }
            fn abs(x: Self) -> Self { ($abs)(x) }

            fn lt(x: Self, y: Self) -> bool { x < y }
            fn lowest() -> Self { <$t as Bounded>::min_value() }
            fn highest() -> Self { <$t as Bounded>::max_value() }
        }
    };
    ($t:ty, $code:ident, $variant:ident, signed) => {
        impl_scalar_real!($t, $code, $variant);
        impl_builtin_int!(@body $t, $code,
            |x: $t, y: $t| {
                if y == 0 {
                    if x == 0 { 0 } else if x > 0 { <$t>::MAX } else { <$t>::MIN }
                } else {
                    x.wrapping_div(y)
                }
            },
            |x: $t| x.wrapping_abs());
    };
    ($t:ty, $code:ident, $variant:ident, unsigned) => {
        impl_scalar_real!($t, $code, $variant);
        impl_builtin_int!(@body $t, $code,
            |x: $t, y: $t| {
                if y == 0 {
                    if x == 0 { 0 } else { <$t>::MAX }
                } else {
                    x / y
                }
            },
            |x: $t| x);
    };
}

impl_builtin_int!(i8, Int8, Int8, signed);
impl_builtin_int!(i16, Int16, Int16, signed);
impl_builtin_int!(i32, Int32, Int32, signed);
impl_builtin_int!(i64, Int64, Int64, signed);
impl_builtin_int!(u8, UInt8, UInt8, unsigned);
impl_builtin_int!(u16, UInt16, UInt16, unsigned);
impl_builtin_int!(u32, UInt32, UInt32, unsigned);
impl_builtin_int!(u64, UInt64, UInt64, unsigned);

macro_rules! impl_builtin_float {
    ($t:ty, $code:ident, $variant:ident) => {
        impl_scalar_real!($t, $code, $variant);

        impl Builtin for $t {
            const CODE: TypeCode = TypeCode::$code;
            const ORDERED: bool = true;

            fn zero() -> Self { 0.0 }
            fn one() -> Self { 1.0 }
            fn from_bool(b: bool) -> Self { if b { 1.0 } else { 0.0 } }
            fn is_nonzero(self) -> bool { self != 0.0 }

            fn plus(x: Self, y: Self) -> Self { x + y }
            fn minus(x: Self, y: Self) -> Self { x - y }
            fn times(x: Self, y: Self) -> Self { x * y }
            fn div(x: Self, y: Self) -> Self { x / y }
            // NaN loses to any number
            fn min(x: Self, y: Self) -> Self { Float::min(x, y) }
            fn max(x: Self, y: Self) -> Self { Float::max(x, y) }

            fn ainv(x: Self) -> Self { -x }
            fn minv(x: Self) -> Self { 1.0 / x }
            fn abs(x: Self) -> Self { Float::abs(x) }

            fn lt(x: Self, y: Self) -> bool { x < y }
            fn lowest() -> Self { <$t as Float>::neg_infinity() }
            fn highest() -> Self { <$t as Float>::infinity() }
        }
    };
}

impl_builtin_float!(f32, Fp32, Fp32);
impl_builtin_float!(f64, Fp64, Fp64);

macro_rules! impl_builtin_complex {
    ($f:ty, $code:ident, $variant:ident, $lower:ident) => {
        impl Scalar for Complex<$f> {
            fn type_desc() -> Type {
                Type::builtin(TypeCode::$code)
            }
            fn to_value(&self) -> Option<Value> {
                Some(Value::$variant(*self))
            }
            fn from_value(value: Value) -> Option<Self> {
                Some(value.$lower())
            }
        }

        impl Builtin for Complex<$f> {
            const CODE: TypeCode = TypeCode::$code;
            const ORDERED: bool = false;

            fn zero() -> Self { Complex::new(0.0, 0.0) }
            fn one() -> Self { Complex::new(1.0, 0.0) }
            fn from_bool(b: bool) -> Self { Complex::new(if b { 1.0 } else { 0.0 }, 0.0) }
            fn is_nonzero(self) -> bool { self.re != 0.0 || self.im != 0.0 }

            fn plus(x: Self, y: Self) -> Self { x + y }
            fn minus(x: Self, y: Self) -> Self { x - y }
            fn times(x: Self, y: Self) -> Self { x * y }
            fn div(x: Self, y: Self) -> Self { x / y }
            // unordered; the registry never builds min/max for complex types
            fn min(x: Self, _y: Self) -> Self { x }
            fn max(x: Self, _y: Self) -> Self { x }

            fn ainv(x: Self) -> Self { -x }
            fn minv(x: Self) -> Self { Self::one() / x }
            fn abs(x: Self) -> Self { Complex::new(x.norm(), 0.0) }

            fn lt(_x: Self, _y: Self) -> bool { false }
            fn lowest() -> Self { Self::zero() }
            fn highest() -> Self { Self::zero() }
        }
    };
}

impl_builtin_complex!(f32, Fc32, Fc32, as_fc32);
impl_builtin_complex!(f64, Fc64, Fc64, as_fc64);

impl Scalar for bool {
    fn type_desc() -> Type {
        Type::builtin(TypeCode::Bool)
    }
    fn to_value(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }
    fn from_value(value: Value) -> Option<Self> {
        Some(value.as_bool())
    }
    fn is_true(&self) -> Option<bool> {
        Some(*self)
    }
}

impl Builtin for bool {
    const CODE: TypeCode = TypeCode::Bool;
    const ORDERED: bool = true;

    fn zero() -> Self {
        false
    }
    fn one() -> Self {
        true
    }
    fn from_bool(b: bool) -> Self {
        b
    }
    fn is_nonzero(self) -> bool {
        self
    }

    fn plus(x: Self, y: Self) -> Self {
        x || y
    }
    fn minus(x: Self, y: Self) -> Self {
        x != y
    }
    fn times(x: Self, y: Self) -> Self {
        x && y
    }
    fn div(x: Self, _y: Self) -> Self {
        x
    }
    fn min(x: Self, y: Self) -> Self {
        x && y
    }
    fn max(x: Self, y: Self) -> Self {
        x || y
    }

    fn ainv(x: Self) -> Self {
        x
    }
    fn minv(_x: Self) -> Self {
        true
    }
    fn abs(x: Self) -> Self {
        x
    }

    fn lt(x: Self, y: Self) -> bool {
        !x & y
    }
    fn lowest() -> Self {
        false
    }
    fn highest() -> Self {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_division_by_zero() {
        assert_eq!(<i32 as Builtin>::div(5, 0), i32::MAX);
        assert_eq!(<i32 as Builtin>::div(-5, 0), i32::MIN);
        assert_eq!(<i32 as Builtin>::div(0, 0), 0);
        assert_eq!(<u8 as Builtin>::div(3, 0), u8::MAX);
        assert_eq!(<i8 as Builtin>::div(i8::MIN, -1), i8::MIN);
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(<u8 as Builtin>::plus(250, 10), 4);
        assert_eq!(<i8 as Builtin>::ainv(i8::MIN), i8::MIN);
        assert_eq!(<u16 as Builtin>::minv(0), u16::MAX);
    }

    #[test]
    fn test_float_min_ignores_nan() {
        assert_eq!(<f64 as Builtin>::min(f64::NAN, 2.0), 2.0);
        assert_eq!(<f64 as Builtin>::lowest(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_bool_arithmetic_is_logical() {
        assert!(<bool as Builtin>::plus(true, false));
        assert!(!<bool as Builtin>::times(true, false));
        assert!(!<bool as Builtin>::minus(true, true));
        assert!(<bool as Builtin>::lt(false, true));
        assert!(!<bool as Builtin>::lt(true, true));
    }

    #[test]
    fn test_complex_abs() {
        let z = Complex::new(3.0f64, 4.0);
        assert_eq!(<Complex<f64> as Builtin>::abs(z), Complex::new(5.0, 0.0));
        assert!(!<Complex<f64> as Builtin>::ORDERED);
    }
}
