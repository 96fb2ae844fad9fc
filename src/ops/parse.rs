//! String resolution of operators, monoids and semirings
//!
//! Accepts the symbolic and named forms used by the MATLAB interface of
//! GraphBLAS: `"+"`, `"max"`, `"+.*"`, `"min.plus.double"`. A trailing type
//! name is optional; when present it must name `T`.

use super::{BinaryOp, BinaryOpcode, Monoid, Semiring};
use crate::error::{Error, Result};
use crate::types::{Builtin, TypeCode};

/// Resolve an operator name to its opcode
pub fn opcode_from_name(name: &str) -> Result<BinaryOpcode> {
    use BinaryOpcode::*;
    let opcode = match name.trim() {
        "+" | "plus" => Plus,
        "-" | "minus" => Minus,
        "rminus" => Rminus,
        "*" | "times" => Times,
        "/" | "div" => Div,
        "\\" | "rdiv" => Rdiv,
        "min" => Min,
        "max" => Max,
        "1st" | "first" => First,
        "2nd" | "second" => Second,
        "pair" | "oneb" => Pair,
        "any" => Any,
        "iseq" => Iseq,
        "isne" => Isne,
        "isgt" => Isgt,
        "islt" => Islt,
        "isge" => Isge,
        "isle" => Isle,
        "|" | "||" | "or" | "lor" => Lor,
        "&" | "&&" | "and" | "land" => Land,
        "xor" | "lxor" => Lxor,
        "==" | "eq" => Eq,
        "~=" | "!=" | "ne" => Ne,
        ">" | "gt" => Gt,
        "<" | "lt" => Lt,
        ">=" | "ge" => Ge,
        "<=" | "le" => Le,
        other => {
            return Err(Error::invalid_value(format!(
                "unknown operator \"{other}\""
            )))
        }
    };
    Ok(opcode)
}

/// Split off an optional trailing type name and check it against `T`
///
/// Operator names never contain a `.`, so after splitting on `.` the parts
/// beyond the expected count must be a type.
fn split_typed<'a, T: Builtin>(s: &'a str, nparts: usize) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() == nparts {
        return Ok(parts);
    }
    if parts.len() != nparts + 1 {
        return Err(Error::invalid_value(format!(
            "\"{s}\" does not name an operator"
        )));
    }
    let type_name = parts[nparts];
    let code = TypeCode::parse(type_name)
        .ok_or_else(|| Error::invalid_value(format!("unknown type \"{type_name}\"")))?;
    if code != T::CODE {
        return Err(Error::domain_mismatch(format!(
            "\"{s}\" is typed {}, expected {}",
            code.name(),
            T::type_desc()
        )));
    }
    Ok(parts[..nparts].to_vec())
}

impl<T: Builtin> BinaryOp<T> {
    /// Resolve `"op"` or `"op.type"`
    pub fn parse(s: &str) -> Result<Self> {
        let parts = split_typed::<T>(s, 1)?;
        BinaryOp::builtin(opcode_from_name(parts[0])?)
    }
}

impl<T: Builtin> Monoid<T> {
    /// Resolve `"op"` or `"op.type"` to a built-in monoid
    pub fn parse(s: &str) -> Result<Self> {
        let parts = split_typed::<T>(s, 1)?;
        Monoid::builtin(opcode_from_name(parts[0])?)
    }
}

impl<T: Builtin> Semiring<T> {
    /// Resolve `"add.multiply"` or `"add.multiply.type"`
    pub fn parse(s: &str) -> Result<Self> {
        let parts = split_typed::<T>(s, 2)?;
        let add = opcode_from_name(parts[0])?;
        let multiply = opcode_from_name(parts[1])?;
        Semiring::builtin(add, multiply)
    }
}

/// Resolve a comparison (`== ~= != > < >= <=`, or its name) to a predicate
pub fn parse_predicate<T: Builtin>(s: &str) -> Result<BinaryOp<T, T, bool>> {
    let parts = split_typed::<T>(s, 1)?;
    let opcode = opcode_from_name(parts[0])?;
    if !opcode.is_predicate() {
        return Err(Error::invalid_value(format!(
            "\"{s}\" is not a comparison"
        )));
    }
    BinaryOp::predicate(opcode)
}
