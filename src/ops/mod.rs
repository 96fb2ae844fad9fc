//! Operators, monoids and semirings
//!
//! Operators are immutable values carrying an opcode and a function object.
//! Built-in operators hold a plain `fn` pointer instantiated for their type;
//! user-defined operators hold an `Arc<dyn Fn>`. Kernels are generic over the
//! operator they receive, and call it through [`BinaryOp::call`] and friends.

pub mod binary;
pub mod index_unary;
pub mod monoid;
pub mod parse;
pub mod semiring;
pub mod unary;

pub use binary::BinaryOp;
pub use index_unary::IndexUnaryOp;
pub use monoid::Monoid;
pub use parse::parse_predicate;
pub use semiring::Semiring;
pub use unary::UnaryOp;

/// Opcode of a unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOpcode {
    Identity,
    Ainv,
    Minv,
    Lnot,
    One,
    Abs,
    User,
}

impl UnaryOpcode {
    /// Boolean equivalent of this opcode
    pub fn boolean_rename(self) -> Self {
        match self {
            UnaryOpcode::Ainv | UnaryOpcode::Abs => UnaryOpcode::Identity,
            UnaryOpcode::Minv => UnaryOpcode::One,
            other => other,
        }
    }
}

/// Opcode of a binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOpcode {
    First,
    Second,
    Any,
    Pair,
    Plus,
    Minus,
    Rminus,
    Times,
    Div,
    Rdiv,
    Min,
    Max,
    Iseq,
    Isne,
    Isgt,
    Islt,
    Isge,
    Isle,
    Lor,
    Land,
    Lxor,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    User,
}

impl BinaryOpcode {
    /// Boolean equivalent of this opcode
    ///
    /// On `bool` several operators coincide, so they are reduced to a
    /// canonical few before a kernel is chosen.
    pub fn boolean_rename(self) -> Self {
        use BinaryOpcode::*;
        match self {
            Div => First,
            Rdiv => Second,
            Min | Times => Land,
            Max | Plus => Lor,
            Ne | Isne | Minus | Rminus => Lxor,
            Iseq => Eq,
            Isgt => Gt,
            Islt => Lt,
            Isge => Ge,
            Isle => Le,
            other => other,
        }
    }

    /// Opcode computing `f(y, x)` when this one computes `f(x, y)`
    pub fn flipped(self) -> Self {
        use BinaryOpcode::*;
        match self {
            First => Second,
            Second => First,
            Gt => Lt,
            Lt => Gt,
            Ge => Le,
            Le => Ge,
            Isgt => Islt,
            Islt => Isgt,
            Isge => Isle,
            Isle => Isge,
            Div => Rdiv,
            Rdiv => Div,
            Minus => Rminus,
            Rminus => Minus,
            other => other,
        }
    }

    /// True if `f(x, y) == f(y, x)` for every input
    pub fn is_commutative(self) -> bool {
        use BinaryOpcode::*;
        matches!(
            self,
            Any | Pair | Plus | Times | Min | Max | Iseq | Isne | Lor | Land | Lxor | Eq | Ne
        )
    }

    /// True if the result is `bool` regardless of the input type
    pub fn is_predicate(self) -> bool {
        use BinaryOpcode::*;
        matches!(self, Eq | Ne | Gt | Lt | Ge | Le)
    }

    /// True if a built-in monoid can be formed from this opcode
    pub fn is_monoid(self) -> bool {
        use BinaryOpcode::*;
        matches!(self, Any | Plus | Times | Min | Max | Lor | Land | Lxor | Eq)
    }

    /// Canonical lower-case name
    pub fn name(self) -> &'static str {
        use BinaryOpcode::*;
        match self {
            First => "first",
            Second => "second",
            Any => "any",
            Pair => "pair",
            Plus => "plus",
            Minus => "minus",
            Rminus => "rminus",
            Times => "times",
            Div => "div",
            Rdiv => "rdiv",
            Min => "min",
            Max => "max",
            Iseq => "iseq",
            Isne => "isne",
            Isgt => "isgt",
            Islt => "islt",
            Isge => "isge",
            Isle => "isle",
            Lor => "lor",
            Land => "land",
            Lxor => "lxor",
            Eq => "eq",
            Ne => "ne",
            Gt => "gt",
            Lt => "lt",
            Ge => "ge",
            Le => "le",
            User => "user",
        }
    }
}

/// Opcode of an index-unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexUnaryOpcode {
    Tril,
    Triu,
    Diag,
    Offdiag,
    RowIndex,
    ColIndex,
    ValueEq,
    ValueNe,
    ValueGt,
    ValueGe,
    ValueLt,
    ValueLe,
    User,
}

impl IndexUnaryOpcode {
    /// True if the operator depends only on the position of an entry
    pub fn is_positional(self) -> bool {
        use IndexUnaryOpcode::*;
        matches!(self, Tril | Triu | Diag | Offdiag | RowIndex | ColIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_rename_table() {
        use BinaryOpcode::*;
        assert_eq!(Div.boolean_rename(), First);
        assert_eq!(Rdiv.boolean_rename(), Second);
        assert_eq!(Min.boolean_rename(), Land);
        assert_eq!(Times.boolean_rename(), Land);
        assert_eq!(Max.boolean_rename(), Lor);
        assert_eq!(Plus.boolean_rename(), Lor);
        assert_eq!(Rminus.boolean_rename(), Lxor);
        assert_eq!(Isne.boolean_rename(), Lxor);
        assert_eq!(Isge.boolean_rename(), Ge);
        assert_eq!(Pair.boolean_rename(), Pair);
    }

    #[test]
    fn test_flip_is_an_involution() {
        use BinaryOpcode::*;
        for op in [First, Minus, Div, Gt, Isle, Plus, Lxor] {
            assert_eq!(op.flipped().flipped(), op);
        }
        assert_eq!(Minus.flipped(), Rminus);
        assert_eq!(Plus.flipped(), Plus);
    }

    #[test]
    fn test_unary_boolean_rename() {
        assert_eq!(UnaryOpcode::Minv.boolean_rename(), UnaryOpcode::One);
        assert_eq!(UnaryOpcode::Ainv.boolean_rename(), UnaryOpcode::Identity);
        assert_eq!(UnaryOpcode::Lnot.boolean_rename(), UnaryOpcode::Lnot);
    }
}
