//! Error types for setup and bookkeeping failures.
//!
//! All of these are fatal to an analysis run. The driver layer converts them into
//! [`eyre::Report`] with `?`.
use crate::dof::{DofHandle, ValueType};
use crate::mesh::CellHandle;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Inconsistent or unrecognized configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    UnknownNodalDof(String),
    UnknownCellDof(String),
    InvalidCellDofDimension {
        tag: String,
        dim: usize,
    },
    UnknownConstraintType(String),
    UnknownPhysicalEntity(String),
    UnknownPhysicalEntityNumber(usize),
    DuplicatePhysicalEntity(usize),
    InvalidPhysicalEntityDimension {
        name: String,
        dim: usize,
    },
    InvalidStage {
        stage: usize,
        number_of_stages: usize,
    },
    DuplicateNumerics {
        domain: String,
        stage: usize,
    },
    DuplicateMaterialSet {
        domain: String,
        stage: usize,
    },
    MissingMaterialSet {
        domain: String,
        stage: usize,
    },
    MaterialCountMismatch {
        domain: String,
        expected: usize,
        found: usize,
    },
    UnknownNumerics(usize),
    UnknownMaterial(usize),
    DuplicateNumericsLabel(usize),
    DuplicateMaterialLabel(usize),
    UnknownClass(String),
    MultipleMasterNodes(String),
    MissingMasterNode(String),
    InvalidFieldNumber {
        tag: String,
        field: usize,
        fields_per_node: usize,
    },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use ConfigurationError::*;
        match self {
            UnknownNodalDof(tag) => write!(f, "Nodal DOF '{}' not recognized", tag),
            UnknownCellDof(tag) => write!(f, "Cell DOF '{}' not recognized", tag),
            InvalidCellDofDimension { tag, dim } => {
                write!(f, "Invalid cell dimension {} for cell DOF '{}'", dim, tag)
            }
            UnknownConstraintType(kind) => {
                write!(f, "Unrecognized multi-freedom constraint type '{}'", kind)
            }
            UnknownPhysicalEntity(name) => {
                write!(f, "Failed to find physical entity number corresponding to '{}'", name)
            }
            UnknownPhysicalEntityNumber(number) => {
                write!(f, "Failed to find name corresponding to physical entity number '{}'", number)
            }
            DuplicatePhysicalEntity(number) => write!(f, "Physical entity number '{}' is already defined", number),
            InvalidPhysicalEntityDimension { name, dim } => {
                write!(f, "Invalid dimension {} for physical entity '{}'", dim, name)
            }
            InvalidStage { stage, number_of_stages } => write!(
                f,
                "Stage {} is outside of the valid range 1..={}",
                stage, number_of_stages
            ),
            DuplicateNumerics { domain, stage } => write!(
                f,
                "Multiple declaration of numerics for label '{}' at stage {}",
                domain, stage
            ),
            DuplicateMaterialSet { domain, stage } => write!(
                f,
                "Multiple declaration of material sets for label '{}' at stage {}",
                domain, stage
            ),
            MissingMaterialSet { domain, stage } => {
                write!(f, "No Material set defined for '{}' at stage {}", domain, stage)
            }
            MaterialCountMismatch { domain, expected, found } => write!(
                f,
                "Numerics assigned to '{}' requires {} materials, but {} were given",
                domain, expected, found
            ),
            UnknownNumerics(label) => write!(f, "No numerics with label {} has been defined", label),
            UnknownMaterial(label) => write!(f, "No material with label {} has been defined", label),
            DuplicateNumericsLabel(label) => write!(f, "Numerics label {} is already in use", label),
            DuplicateMaterialLabel(label) => write!(f, "Material label {} is already in use", label),
            UnknownClass(name) => write!(f, "No factory registered for class '{}'", name),
            MultipleMasterNodes(tag) => write!(
                f,
                "Detected more than one master node in 'NodalDofSlaveConstraint' assignment for '{}'",
                tag
            ),
            MissingMasterNode(tag) => write!(
                f,
                "No master node found in 'NodalDofSlaveConstraint' assignment for '{}'",
                tag
            ),
            InvalidFieldNumber {
                tag,
                field,
                fields_per_node,
            } => write!(
                f,
                "Nodal DOF '{}' writes to field {}, but nodes only have {} fields",
                tag, field, fields_per_node
            ),
        }
    }
}

impl Error for ConfigurationError {}

/// Inconsistent mesh topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    InvalidCoordinateDimension(usize),
    InvalidCellDimension(usize),
    UnknownNode(usize),
    UnknownElementType(usize),
    NodeCountMismatch {
        cell: CellHandle,
        element_type: usize,
        expected: usize,
        found: usize,
    },
    FaceCountMismatch {
        cell: CellHandle,
        expected: usize,
        found: usize,
    },
    FaceNodeOutOfRange {
        cell: CellHandle,
        face: usize,
        local_node: usize,
    },
    PermutationLengthMismatch {
        expected: usize,
        found: usize,
    },
    InvalidPermutationIndex {
        index: usize,
        len: usize,
    },
    DuplicatePermutationIndex(usize),
}

impl Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use TopologyError::*;
        match self {
            InvalidCoordinateDimension(dim) => {
                write!(f, "Invalid size {} of vector input for nodal coordinates", dim)
            }
            InvalidCellDimension(dim) => write!(f, "Invalid cell dimension {}", dim),
            UnknownNode(id) => write!(f, "No counted node with id {}", id),
            UnknownElementType(el_type) => write!(f, "Element type {} is not known to the mesh reader", el_type),
            NodeCountMismatch {
                cell,
                element_type,
                expected,
                found,
            } => write!(
                f,
                "Cell {} of element type {} has {} nodes, but {} were expected",
                cell, element_type, found, expected
            ),
            FaceCountMismatch { cell, expected, found } => write!(
                f,
                "Cell {} has {} neighbor slots, but its element type has {} faces",
                cell, found, expected
            ),
            FaceNodeOutOfRange { cell, face, local_node } => write!(
                f,
                "Face {} of cell {} refers to local node {}, which is out of range",
                face, cell, local_node
            ),
            PermutationLengthMismatch { expected, found } => write!(
                f,
                "Number of original and reordered cell nodes do not match: {} != {}",
                expected, found
            ),
            InvalidPermutationIndex { index, len } => {
                write!(f, "Permutation index {} is out of range for {} nodes", index, len)
            }
            DuplicatePermutationIndex(index) => {
                write!(f, "Permutation index {} occurs more than once", index)
            }
        }
    }
}

impl Error for TopologyError {}

/// Violation of the DOF bookkeeping rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DofError {
    CyclicConstraint { target: DofHandle, master: DofHandle },
    StageConflict {
        dof: DofHandle,
        assigned: usize,
        requested: usize,
    },
    InvalidStage(usize),
    UnreadableValueType(ValueType),
}

impl Display for DofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DofError::CyclicConstraint { target, master } => write!(
                f,
                "Cannot enslave DOF {} to {}: the constraint would be cyclic",
                target, master
            ),
            DofError::StageConflict {
                dof,
                assigned,
                requested,
            } => write!(
                f,
                "Detected conflict in DOF stage assignment! DOF {} with previously assigned stage number of '{}' \
                 is being reassigned a stage number of '{}'",
                dof, assigned, requested
            ),
            DofError::InvalidStage(stage) => write!(f, "Invalid stage number {}, stages are numbered from 1", stage),
            DofError::UnreadableValueType(value_type) => write!(
                f,
                "Cannot request value of type {:?} of primary variable at DOF",
                value_type
            ),
        }
    }
}

impl Error for DofError {}
