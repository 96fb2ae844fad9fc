//! Scalar types and type descriptors
//!
//! Matrices are generic over their element type `T: Scalar`. The 13 built-in
//! types carry a [`TypeCode`] that lets the registry typecast between them;
//! user-defined types implement [`Scalar`] with [`TypeCode::UserDefined`] and
//! a name, and can only be combined with themselves.

pub mod builtin;
pub mod cast;

use std::borrow::Cow;
use std::fmt;

use num_complex::Complex;

pub use builtin::Builtin;
pub use cast::{cast, cast_factory, CastFn, Value};

/// Single-precision complex built-in type
pub type Complex32 = Complex<f32>;

/// Double-precision complex built-in type
pub type Complex64 = Complex<f64>;

/// Identifies a built-in type, or marks a user-defined one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCode {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Fp32,
    Fp64,
    Fc32,
    Fc64,
    UserDefined,
}

impl TypeCode {
    /// All built-in codes, in registry order
    pub const BUILTIN: [TypeCode; 13] = [
        TypeCode::Bool,
        TypeCode::Int8,
        TypeCode::Int16,
        TypeCode::Int32,
        TypeCode::Int64,
        TypeCode::UInt8,
        TypeCode::UInt16,
        TypeCode::UInt32,
        TypeCode::UInt64,
        TypeCode::Fp32,
        TypeCode::Fp64,
        TypeCode::Fc32,
        TypeCode::Fc64,
    ];

    /// Canonical name of a built-in type
    pub fn name(self) -> &'static str {
        match self {
            TypeCode::Bool => "bool",
            TypeCode::Int8 => "int8_t",
            TypeCode::Int16 => "int16_t",
            TypeCode::Int32 => "int32_t",
            TypeCode::Int64 => "int64_t",
            TypeCode::UInt8 => "uint8_t",
            TypeCode::UInt16 => "uint16_t",
            TypeCode::UInt32 => "uint32_t",
            TypeCode::UInt64 => "uint64_t",
            TypeCode::Fp32 => "float",
            TypeCode::Fp64 => "double",
            TypeCode::Fc32 => "float complex",
            TypeCode::Fc64 => "double complex",
            TypeCode::UserDefined => "user-defined",
        }
    }

    /// Size in bytes of one value
    pub fn size(self) -> usize {
        match self {
            TypeCode::Bool | TypeCode::Int8 | TypeCode::UInt8 => 1,
            TypeCode::Int16 | TypeCode::UInt16 => 2,
            TypeCode::Int32 | TypeCode::UInt32 | TypeCode::Fp32 => 4,
            TypeCode::Int64 | TypeCode::UInt64 | TypeCode::Fp64 | TypeCode::Fc32 => 8,
            TypeCode::Fc64 => 16,
            TypeCode::UserDefined => 0,
        }
    }

    /// Resolve a type name as written in operator strings
    ///
    /// Accepts the canonical names plus the short forms `int8`, `uint64`,
    /// `single`, `fp32`, `fp64`, `logical`, `single complex`, `fc32`, `fc64`.
    pub fn parse(name: &str) -> Option<TypeCode> {
        let code = match name.trim() {
            "bool" | "logical" => TypeCode::Bool,
            "int8" | "int8_t" => TypeCode::Int8,
            "int16" | "int16_t" => TypeCode::Int16,
            "int32" | "int32_t" => TypeCode::Int32,
            "int64" | "int64_t" => TypeCode::Int64,
            "uint8" | "uint8_t" => TypeCode::UInt8,
            "uint16" | "uint16_t" => TypeCode::UInt16,
            "uint32" | "uint32_t" => TypeCode::UInt32,
            "uint64" | "uint64_t" => TypeCode::UInt64,
            "single" | "float" | "fp32" => TypeCode::Fp32,
            "double" | "fp64" => TypeCode::Fp64,
            "single complex" | "float complex" | "fc32" => TypeCode::Fc32,
            "double complex" | "complex" | "fc64" => TypeCode::Fc64,
            _ => return None,
        };
        Some(code)
    }

    /// True for the real and complex floating-point codes
    pub fn is_float(self) -> bool {
        matches!(
            self,
            TypeCode::Fp32 | TypeCode::Fp64 | TypeCode::Fc32 | TypeCode::Fc64
        )
    }
}

/// Runtime descriptor of an element type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    code: TypeCode,
    size: usize,
    name: Cow<'static, str>,
}

impl Type {
    /// Descriptor of a built-in type
    pub fn builtin(code: TypeCode) -> Self {
        Self {
            code,
            size: code.size(),
            name: Cow::Borrowed(code.name()),
        }
    }

    /// Descriptor of a user-defined type
    pub fn user(name: impl Into<Cow<'static, str>>, size: usize) -> Self {
        Self {
            code: TypeCode::UserDefined,
            size,
            name: name.into(),
        }
    }

    /// The type code
    pub fn code(&self) -> TypeCode {
        self.code
    }

    /// Size of one value in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// The type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for the 13 built-in types
    pub fn is_builtin(&self) -> bool {
        self.code != TypeCode::UserDefined
    }

    /// Whether values of `self` can be typecast to `other`
    ///
    /// All built-in types cast to each other; a user-defined type only
    /// "casts" to itself.
    pub fn compatible(&self, other: &Type) -> bool {
        if self.is_builtin() && other.is_builtin() {
            true
        } else {
            self == other
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An element type usable in a matrix
///
/// Built-in types implement this in [`builtin`]. A user-defined type supplies
/// its own descriptor and leaves the value conversions at their defaults:
///
/// ```
/// use grblas::types::{Scalar, Type};
///
/// #[derive(Debug, Clone, Copy, Default, PartialEq)]
/// struct Gauss { real: i32, imag: i32 }
///
/// impl Scalar for Gauss {
///     fn type_desc() -> Type {
///         Type::user("gauss", std::mem::size_of::<Gauss>())
///     }
/// }
/// assert_eq!(Gauss::type_desc().name(), "gauss");
/// ```
pub trait Scalar: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime descriptor of this type
    fn type_desc() -> Type;

    /// Convert to the built-in value model, if this is a built-in type
    fn to_value(&self) -> Option<Value> {
        None
    }

    /// Convert from any built-in value, if this is a built-in type
    fn from_value(_value: Value) -> Option<Self> {
        None
    }

    /// Truth value of this entry when used in a valued mask
    fn is_true(&self) -> Option<bool> {
        self.to_value().map(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Pair(i32, i32);

    impl Scalar for Pair {
        fn type_desc() -> Type {
            Type::user("pair", 8)
        }
    }

    #[test]
    fn test_builtin_descriptors() {
        assert_eq!(f64::type_desc().name(), "double");
        assert_eq!(f64::type_desc().size(), 8);
        assert_eq!(Complex64::type_desc().size(), 16);
        assert_eq!(bool::type_desc().code(), TypeCode::Bool);
        assert!(u16::type_desc().is_builtin());
    }

    #[test]
    fn test_compatibility() {
        assert!(i32::type_desc().compatible(&f64::type_desc()));
        assert!(Pair::type_desc().compatible(&Pair::type_desc()));
        assert!(!Pair::type_desc().compatible(&f64::type_desc()));
        assert!(!f64::type_desc().compatible(&Pair::type_desc()));
        assert_eq!(Pair::default().is_true(), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(TypeCode::parse("double"), Some(TypeCode::Fp64));
        assert_eq!(TypeCode::parse("single"), Some(TypeCode::Fp32));
        assert_eq!(TypeCode::parse("uint8"), Some(TypeCode::UInt8));
        assert_eq!(TypeCode::parse("logical"), Some(TypeCode::Bool));
        assert_eq!(TypeCode::parse("quaternion"), None);
    }
}
