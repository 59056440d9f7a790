//! Domain topology and degree-of-freedom management for multi-stage finite element analysis.
//!
//! The [`domain::DomainManager`] owns all nodes and cells of a mesh and derives the attachment
//! and neighbor relations between cells. The [`dof::DofManager`] owns the DOF schema and
//! partitions the DOFs of every solution stage into active and inactive sets. Both are held by
//! the [`model::AnalysisModel`], which is passed explicitly to the solution driver in
//! [`solution`].

pub mod config;
pub mod dof;
pub mod domain;
pub mod error;
pub mod mesh;
pub mod model;
pub mod numerics;
pub mod solution;

pub mod dense {
    pub use broomstyx_dense::*;
}

pub extern crate broomstyx_dense;
