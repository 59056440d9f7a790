//! Degrees of freedom and their bookkeeping.
use crate::mesh::{CellHandle, NodeHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

mod manager;

pub use manager::DofManager;

/// Identifies a DOF by the slot that owns it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DofHandle {
    Nodal { node: NodeHandle, slot: usize },
    Cell { cell: CellHandle, slot: usize },
    /// A free-standing DOF created on request of a numerics implementation.
    Free(usize),
}

impl Display for DofHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DofHandle::Nodal { node, slot } => write!(f, "{} of {}", slot, node),
            DofHandle::Cell { cell, slot } => write!(f, "{} of {}", slot, cell),
            DofHandle::Free(index) => write!(f, "free DOF #{}", index),
        }
    }
}

/// Selects which value of a primary variable is read or updated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Current,
    /// Current value relative to the converged value.
    Incremental,
    Converged,
    Correction,
    /// Replaces the most recent correction. Write-only.
    ReplacementCorrection,
}

/// One scalar unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct Dof {
    pub(crate) group: usize,
    pub(crate) current: f64,
    pub(crate) converged: f64,
    pub(crate) correction: f64,
    pub(crate) secondary: f64,
    pub(crate) is_constrained: bool,
    pub(crate) master: Option<DofHandle>,
    pub(crate) stage: Option<usize>,
    pub(crate) equation_number: Option<usize>,
}

impl Dof {
    pub(crate) fn new(group: usize) -> Self {
        Self {
            group,
            current: 0.0,
            converged: 0.0,
            correction: 0.0,
            secondary: 0.0,
            is_constrained: false,
            master: None,
            stage: None,
            equation_number: None,
        }
    }

    /// The group tag of the DOF itself. Use [`DofManager::group_number_for`] to read through a
    /// master.
    pub fn group(&self) -> usize {
        self.group
    }

    pub fn is_constrained(&self) -> bool {
        self.is_constrained
    }

    pub fn is_slave(&self) -> bool {
        self.master.is_some()
    }

    pub fn master(&self) -> Option<DofHandle> {
        self.master
    }

    pub fn stage(&self) -> Option<usize> {
        self.stage
    }

    /// Whether the DOF takes part in the equation system of its stage.
    pub fn is_active(&self) -> bool {
        self.stage.is_some() && !self.is_constrained && !self.is_slave()
    }

    /// The current value of the DOF itself, without following its master.
    pub fn current_value(&self) -> f64 {
        self.current
    }

    pub fn converged_value(&self) -> f64 {
        self.converged
    }

    pub fn secondary_variable(&self) -> f64 {
        self.secondary
    }

    pub(crate) fn update(&mut self, value: f64, value_type: ValueType) {
        match value_type {
            ValueType::Current => {
                self.correction = value - self.current;
                self.current = value;
            }
            ValueType::Incremental => {
                self.correction = value - self.current + self.converged;
                self.current = value + self.converged;
            }
            ValueType::Converged => {
                self.correction = 0.0;
                self.converged = value;
                self.current = value;
            }
            ValueType::Correction => {
                self.correction = value;
                self.current += value;
            }
            ValueType::ReplacementCorrection => {
                self.current += value - self.correction;
                self.correction = value;
            }
        }
    }

    pub(crate) fn value(&self, value_type: ValueType) -> Option<f64> {
        match value_type {
            ValueType::Current => Some(self.current),
            ValueType::Incremental => Some(self.current - self.converged),
            ValueType::Converged => Some(self.converged),
            ValueType::Correction => Some(self.correction),
            ValueType::ReplacementCorrection => None,
        }
    }
}

/// Schema entry for a nodal or cell DOF.
///
/// Field numbers refer to the 1-based output fields of a node; 0 means no output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DofInfo {
    pub tag: String,
    #[serde(default)]
    pub dim: usize,
    pub group: usize,
    #[serde(default)]
    pub primary_field: usize,
    #[serde(default)]
    pub secondary_field: usize,
}

/// A rule binding DOFs of one region to a DOF of another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiFreedomConstraint {
    /// Enslaves the nodal DOF `slave_dof` at every node of the cells tagged `slave_tag` to the
    /// nodal DOF `master_dof` at the single node of the cell tagged `master_tag`.
    NodalDofSlave {
        master_tag: String,
        master_dof: usize,
        slave_tag: String,
        slave_dof: usize,
    },
}

/// Decoded multi-freedom constraint, with DOFs referred to by tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiFreedomConstraintRecord {
    pub kind: String,
    pub master_tag: String,
    pub master_dof: String,
    pub slave_tag: String,
    pub slave_dof: String,
}
