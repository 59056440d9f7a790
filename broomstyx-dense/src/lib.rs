//! Dense linear algebra kernel
//! ==========================
//!
//! Owned, dynamically sized [`Vector`] and [`Matrix`] value types used for cell-level
//! computations throughout broomstyx. Storage and the numerical kernels are provided by
//! `nalgebra`; this crate adds checked shape semantics and an operator set in which owned
//! operands are reused, so that chained expressions like `(a + b) - c * 2.0` allocate at most
//! once.
//!
//! Shape errors are reported through [`LinAlgError`]. The arithmetic operators panic with the
//! error message, mirroring the behavior of `nalgebra`, while the `try_*` methods return the
//! error to the caller.

mod error;
mod inverse;
mod matrix;
mod ops;
mod vector;

pub mod compare;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub use error::{LinAlgError, Position, Shape};
pub use inverse::inv;
pub use matrix::{trp, Matrix};
pub use vector::Vector;

pub extern crate nalgebra;
