//! Unary operators `z = f(x)`

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::UnaryOpcode;
use crate::error::{Error, Result};
use crate::types::{cast_factory, Builtin, Scalar, TypeCode};

enum UnaryFn<X, Z> {
    Native(fn(&X) -> Z),
    User(Arc<dyn Fn(&X) -> Z + Send + Sync>),
}

/// A unary operator with domain `X` and range `Z`
pub struct UnaryOp<X, Z = X> {
    opcode: UnaryOpcode,
    name: Cow<'static, str>,
    func: UnaryFn<X, Z>,
}

impl<X, Z> Clone for UnaryOp<X, Z> {
    fn clone(&self) -> Self {
        let func = match &self.func {
            UnaryFn::Native(f) => UnaryFn::Native(*f),
            UnaryFn::User(f) => UnaryFn::User(Arc::clone(f)),
        };
        Self {
            opcode: self.opcode,
            name: self.name.clone(),
            func,
        }
    }
}

impl<X, Z> fmt::Debug for UnaryOp<X, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOp")
            .field("opcode", &self.opcode)
            .field("name", &self.name)
            .finish()
    }
}

impl<X: Scalar, Z: Scalar> UnaryOp<X, Z> {
    /// Create a user-defined operator
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&X) -> Z + Send + Sync + 'static,
    {
        Self {
            opcode: UnaryOpcode::User,
            name: name.into(),
            func: UnaryFn::User(Arc::new(f)),
        }
    }

    /// The identity operator typecasting `X` to `Z`
    pub fn identity_cast() -> Result<Self> {
        let cast = cast_factory::<X, Z>()?;
        Ok(Self {
            opcode: UnaryOpcode::Identity,
            name: Cow::Borrowed("identity"),
            func: UnaryFn::Native(cast),
        })
    }

    #[inline]
    pub fn call(&self, x: &X) -> Z {
        match &self.func {
            UnaryFn::Native(f) => f(x),
            UnaryFn::User(f) => f(x),
        }
    }

    pub fn opcode(&self) -> UnaryOpcode {
        self.opcode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        self.opcode != UnaryOpcode::User
    }
}

impl<T: Builtin> UnaryOp<T> {
    /// A built-in unary operator on `T`
    pub fn builtin(opcode: UnaryOpcode) -> Result<Self> {
        let opcode = if T::CODE == TypeCode::Bool {
            opcode.boolean_rename()
        } else {
            opcode
        };
        let f: fn(&T) -> T = match opcode {
            UnaryOpcode::Identity => |x| *x,
            UnaryOpcode::Ainv => |x| T::ainv(*x),
            UnaryOpcode::Minv => |x| T::minv(*x),
            UnaryOpcode::Lnot => |x| T::from_bool(!x.is_nonzero()),
            UnaryOpcode::One => |_| T::one(),
            UnaryOpcode::Abs => |x| T::abs(*x),
            UnaryOpcode::User => {
                return Err(Error::invalid_value(
                    "user-defined unary operators are created with UnaryOp::new",
                ))
            }
        };
        let name = match opcode {
            UnaryOpcode::Identity => "identity",
            UnaryOpcode::Ainv => "ainv",
            UnaryOpcode::Minv => "minv",
            UnaryOpcode::Lnot => "lnot",
            UnaryOpcode::One => "one",
            UnaryOpcode::Abs => "abs",
            UnaryOpcode::User => "user",
        };
        Ok(Self {
            opcode,
            name: Cow::Borrowed(name),
            func: UnaryFn::Native(f),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_unary() {
        let ainv = UnaryOp::<i16>::builtin(UnaryOpcode::Ainv).unwrap();
        assert_eq!(ainv.call(&7), -7);
        let minv = UnaryOp::<f64>::builtin(UnaryOpcode::Minv).unwrap();
        assert_eq!(minv.call(&4.0), 0.25);
        let lnot = UnaryOp::<u8>::builtin(UnaryOpcode::Lnot).unwrap();
        assert_eq!(lnot.call(&0), 1);
        assert_eq!(lnot.call(&9), 0);
    }

    #[test]
    fn test_bool_minv_is_one() {
        let minv = UnaryOp::<bool>::builtin(UnaryOpcode::Minv).unwrap();
        assert_eq!(minv.opcode(), UnaryOpcode::One);
        assert!(minv.call(&false));
    }

    #[test]
    fn test_identity_cast_and_user() {
        let cast = UnaryOp::<f64, i32>::identity_cast().unwrap();
        assert_eq!(cast.call(&3.9), 3);
        let square = UnaryOp::<i64>::new("square", |x| x * x);
        assert_eq!(square.call(&-3), 9);
        assert!(!square.is_builtin());
    }
}
