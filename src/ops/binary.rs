//! Binary operators `z = f(x, y)`

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::BinaryOpcode;
use crate::error::{Error, Result};
use crate::types::{Builtin, Scalar, Type, TypeCode};

type UserFn<X, Y, Z> = Arc<dyn Fn(&X, &Y) -> Z + Send + Sync>;

enum BinaryFn<X, Y, Z> {
    Native(fn(&X, &Y) -> Z),
    User(UserFn<X, Y, Z>),
}

impl<X, Y, Z> Clone for BinaryFn<X, Y, Z> {
    fn clone(&self) -> Self {
        match self {
            BinaryFn::Native(f) => BinaryFn::Native(*f),
            BinaryFn::User(f) => BinaryFn::User(Arc::clone(f)),
        }
    }
}

/// A binary operator with domains `X`, `Y` and range `Z`
pub struct BinaryOp<X, Y = X, Z = X> {
    opcode: BinaryOpcode,
    name: Cow<'static, str>,
    func: BinaryFn<X, Y, Z>,
}

impl<X, Y, Z> Clone for BinaryOp<X, Y, Z> {
    fn clone(&self) -> Self {
        Self {
            opcode: self.opcode,
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<X, Y, Z> fmt::Debug for BinaryOp<X, Y, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOp")
            .field("opcode", &self.opcode)
            .field("name", &self.name)
            .finish()
    }
}

impl<X: Scalar, Y: Scalar, Z: Scalar> BinaryOp<X, Y, Z> {
    /// Create a user-defined operator
    pub fn new<F>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&X, &Y) -> Z + Send + Sync + 'static,
    {
        Self {
            opcode: BinaryOpcode::User,
            name: name.into(),
            func: BinaryFn::User(Arc::new(f)),
        }
    }

    /// Apply the operator
    #[inline]
    pub fn call(&self, x: &X, y: &Y) -> Z {
        match &self.func {
            BinaryFn::Native(f) => f(x, y),
            BinaryFn::User(f) => f(x, y),
        }
    }

    /// The opcode (`User` for user-defined operators)
    pub fn opcode(&self) -> BinaryOpcode {
        self.opcode
    }

    /// The operator name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_builtin(&self) -> bool {
        self.opcode != BinaryOpcode::User
    }

    pub fn xtype(&self) -> Type {
        X::type_desc()
    }

    pub fn ytype(&self) -> Type {
        Y::type_desc()
    }

    pub fn ztype(&self) -> Type {
        Z::type_desc()
    }

    /// The operator with its arguments swapped: `g(y, x) = f(x, y)`
    pub fn flip(&self) -> BinaryOp<Y, X, Z> {
        let name = match self.opcode {
            BinaryOpcode::User => Cow::Owned(format!("flip({})", self.name)),
            op => Cow::Borrowed(op.flipped().name()),
        };
        let func = match &self.func {
            BinaryFn::Native(f) => {
                let f = *f;
                BinaryFn::User(Arc::new(move |y: &Y, x: &X| f(x, y)) as UserFn<Y, X, Z>)
            }
            BinaryFn::User(f) => {
                let f = Arc::clone(f);
                BinaryFn::User(Arc::new(move |y: &Y, x: &X| f(x, y)) as UserFn<Y, X, Z>)
            }
        };
        BinaryOp {
            opcode: self.opcode.flipped(),
            name,
            func,
        }
    }

    /// True if `f(x, y)` ignores `x`
    pub fn ignores_x(&self) -> bool {
        matches!(
            self.opcode,
            BinaryOpcode::Second | BinaryOpcode::Pair | BinaryOpcode::Any
        )
    }

    /// True if `f(x, y)` ignores `y`
    pub fn ignores_y(&self) -> bool {
        matches!(self.opcode, BinaryOpcode::First | BinaryOpcode::Pair)
    }
}

impl<X: Scalar, Y: Scalar> BinaryOp<X, Y, X> {
    /// `f(x, y) = x`, defined for every type
    pub fn first() -> Self {
        Self {
            opcode: BinaryOpcode::First,
            name: Cow::Borrowed("first"),
            func: BinaryFn::Native(|x: &X, _: &Y| x.clone()),
        }
    }
}

impl<X: Scalar, Y: Scalar> BinaryOp<X, Y, Y> {
    /// `f(x, y) = y`, defined for every type
    pub fn second() -> Self {
        Self {
            opcode: BinaryOpcode::Second,
            name: Cow::Borrowed("second"),
            func: BinaryFn::Native(|_: &X, y: &Y| y.clone()),
        }
    }
}

fn native<T: Builtin>(opcode: BinaryOpcode) -> Option<fn(&T, &T) -> T> {
    use BinaryOpcode::*;
    let ordered = T::ORDERED;
    let f: fn(&T, &T) -> T = match opcode {
        First => |x, _| *x,
        Second | Any => |_, y| *y,
        Pair => |_, _| T::one(),
        Plus => |x, y| T::plus(*x, *y),
        Minus => |x, y| T::minus(*x, *y),
        Rminus => |x, y| T::minus(*y, *x),
        Times => |x, y| T::times(*x, *y),
        Div => |x, y| T::div(*x, *y),
        Rdiv => |x, y| T::div(*y, *x),
        Min if ordered => |x, y| T::min(*x, *y),
        Max if ordered => |x, y| T::max(*x, *y),
        Iseq | Eq => |x, y| T::from_bool(x == y),
        Isne | Ne => |x, y| T::from_bool(x != y),
        Isgt | Gt if ordered => |x, y| T::from_bool(T::gt(*x, *y)),
        Islt | Lt if ordered => |x, y| T::from_bool(T::lt(*x, *y)),
        Isge | Ge if ordered => |x, y| T::from_bool(T::ge(*x, *y)),
        Isle | Le if ordered => |x, y| T::from_bool(T::le(*x, *y)),
        Lor => |x, y| T::from_bool(x.is_nonzero() || y.is_nonzero()),
        Land => |x, y| T::from_bool(x.is_nonzero() && y.is_nonzero()),
        Lxor => |x, y| T::from_bool(x.is_nonzero() != y.is_nonzero()),
        _ => return None,
    };
    Some(f)
}

fn native_predicate<T: Builtin>(opcode: BinaryOpcode) -> Option<fn(&T, &T) -> bool> {
    use BinaryOpcode::*;
    let ordered = T::ORDERED;
    let f: fn(&T, &T) -> bool = match opcode {
        Eq => |x, y| x == y,
        Ne => |x, y| x != y,
        Gt if ordered => |x, y| T::gt(*x, *y),
        Lt if ordered => |x, y| T::lt(*x, *y),
        Ge if ordered => |x, y| T::ge(*x, *y),
        Le if ordered => |x, y| T::le(*x, *y),
        _ => return None,
    };
    Some(f)
}

impl<T: Builtin> BinaryOp<T> {
    /// A built-in operator on `T`
    ///
    /// On `bool` the opcode is renamed to its canonical boolean equivalent.
    /// Comparison opcodes produce `T::from_bool(x op y)`; use
    /// [`BinaryOp::predicate`] for a `bool`-valued comparison.
    pub fn builtin(opcode: BinaryOpcode) -> Result<Self> {
        let is_bool = T::CODE == TypeCode::Bool;
        let opcode = if is_bool {
            opcode.boolean_rename()
        } else {
            // comparisons on T are their "is" forms unless T is bool
            match opcode {
                BinaryOpcode::Eq => BinaryOpcode::Iseq,
                BinaryOpcode::Ne => BinaryOpcode::Isne,
                BinaryOpcode::Gt => BinaryOpcode::Isgt,
                BinaryOpcode::Lt => BinaryOpcode::Islt,
                BinaryOpcode::Ge => BinaryOpcode::Isge,
                BinaryOpcode::Le => BinaryOpcode::Isle,
                other => other,
            }
        };
        let f = native::<T>(opcode).ok_or_else(|| {
            Error::domain_mismatch(format!(
                "operator {} is not defined for {}",
                opcode.name(),
                T::type_desc()
            ))
        })?;
        Ok(Self {
            opcode,
            name: Cow::Borrowed(opcode.name()),
            func: BinaryFn::Native(f),
        })
    }

    pub fn plus() -> Self {
        Self::native_unchecked(BinaryOpcode::Plus, |x, y| T::plus(*x, *y))
    }

    pub fn times() -> Self {
        Self::native_unchecked(BinaryOpcode::Times, |x, y| T::times(*x, *y))
    }

    pub fn minus() -> Self {
        Self::native_unchecked(BinaryOpcode::Minus, |x, y| T::minus(*x, *y))
    }

    pub fn pair() -> Self {
        Self::native_unchecked(BinaryOpcode::Pair, |_, _| T::one())
    }

    fn native_unchecked(opcode: BinaryOpcode, f: fn(&T, &T) -> T) -> Self {
        let opcode = if T::CODE == TypeCode::Bool {
            opcode.boolean_rename()
        } else {
            opcode
        };
        Self {
            opcode,
            name: Cow::Borrowed(opcode.name()),
            func: BinaryFn::Native(f),
        }
    }
}

impl<T: Builtin> BinaryOp<T, T, bool> {
    /// A built-in comparison producing `bool`
    pub fn predicate(opcode: BinaryOpcode) -> Result<Self> {
        let f = native_predicate::<T>(opcode).ok_or_else(|| {
            Error::domain_mismatch(format!(
                "comparison {} is not defined for {}",
                opcode.name(),
                T::type_desc()
            ))
        })?;
        Ok(Self {
            opcode,
            name: Cow::Borrowed(opcode.name()),
            func: BinaryFn::Native(f),
        })
    }
}
