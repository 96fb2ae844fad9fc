//! # grblas: sparse linear algebra over semirings
//!
//! grblas implements the GraphBLAS model of computation: sparse matrices
//! whose entries may be absent, and algebraic operations on them in which
//! "add" and "multiply" are any monoid and binary operator. Plain arithmetic
//! is the `plus_times` semiring; shortest paths run on `min_plus`,
//! reachability on `lor_land`.
//!
//! ## Overview
//!
//! - **Types and operators** ([`types`], [`ops`]): the built-in scalar types,
//!   user-defined types, and unary, binary, index-unary, monoid and semiring
//!   operators over them.
//! - **Matrices** ([`matrix`]): one [`Matrix`] type held in CSR or CSC
//!   orientation and in full, bitmap, sparse or hypersparse format, with
//!   deferred insertions and deletions finished by [`Matrix::wait`].
//! - **Element-wise operations** ([`ewise`]): `A ∪ B` and `A ∩ B` under any
//!   binary operator.
//! - **Multiplication** ([`mxm`]): `A*B` by dot products, Gustavson's
//!   method or a heap merge, chosen automatically or by [`Descriptor`].
//! - **Other operations** ([`kernels`]): apply, select, reduce, extract,
//!   assign and transpose.
//! - **Import and export** ([`io`]): moving CSR, CSC and dense arrays in and
//!   out, and conversion to `sprs` and `ndarray`.
//!
//! Every operation writes its result as `C<M> = accum(C, T)`: an optional
//! mask `M` limits which entries of C change and an optional accumulator
//! combines the result with what C already holds.
//!
//! ## Usage
//!
//! ```
//! use grblas::{mxm, Context, Descriptor, Matrix, Semiring, NO_MASK};
//!
//! let ctx = Context::default();
//! let a = Matrix::from_tuples(2, 2, &[0, 1], &[1, 0], &[2.0f64, 3.0]).unwrap();
//! let mut c = Matrix::<f64>::new(2, 2);
//! let plus_times = Semiring::<f64>::plus_times();
//! mxm(&ctx, &mut c, NO_MASK, None, &plus_times, &a, &a, &Descriptor::default()).unwrap();
//! assert_eq!(c.extract_element(0, 0).unwrap(), 6.0);
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod ewise;
pub mod io;
pub mod kernels;
pub mod matrix;
pub mod mxm;
pub mod ops;
pub mod parallel;
pub mod types;
pub mod utils;

pub use config::{Context, SystemParameters};
pub use descriptor::{AxbMethod, Descriptor};
pub use error::{Error, Result};
pub use ewise::{ewise_add, ewise_mult, NO_MASK};
pub use io::SparseParts;
pub use kernels::{
    apply, apply_index, assign, assign_scalar, extract, reduce_to_scalar, reduce_to_vector, select,
    transpose, Indices,
};
pub use matrix::{Format, Matrix, MatrixView, Sparsity, SparsityControl};
pub use mxm::mxm;
pub use ops::{
    BinaryOp, BinaryOpcode, IndexUnaryOp, IndexUnaryOpcode, Monoid, Semiring, UnaryOp, UnaryOpcode,
};
pub use types::{Builtin, Scalar, Type, TypeCode};

/// Version of the grblas library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
