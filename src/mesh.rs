//! Mesh entities: nodes and cells of dimension 0 through 3.
//!
//! Nodes and cells are owned by [`DomainManager`](crate::domain::DomainManager) and referred to
//! elsewhere by stable handles. Their topological fields and DOF slots can only be modified
//! from within this crate, by the domain and DOF managers.
use crate::dof::Dof;
use broomstyx_dense::Vector;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Debug, Display};

pub mod reader;

pub use reader::{GmshElementTable, MeshReader};

/// Number of cell dimension buckets (points, lines, surfaces, volumes).
pub const NUM_DIMENSIONS: usize = 4;

/// Index of a node in insertion order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub usize);

/// Index of a cell in the insertion-ordered list of cells with the same dimension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellHandle {
    pub dim: usize,
    pub index: usize,
}

impl CellHandle {
    pub fn new(dim: usize, index: usize) -> Self {
        Self { dim, index }
    }
}

impl Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

impl Display for CellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-D cell #{}", self.dim, self.index)
    }
}

/// Per-dimension sets of cells attached to an entity.
pub type AttachedCells = [BTreeSet<CellHandle>; NUM_DIMENSIONS];

/// Status information that a numerics implementation stores at a cell.
pub trait NumericsStatus: Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn NumericsStatus {
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// A mesh vertex.
#[derive(Debug)]
pub struct Node {
    pub(crate) coordinates: Vector,
    pub(crate) is_active: bool,
    pub(crate) id: Option<usize>,
    pub(crate) attached_cells: AttachedCells,
    pub(crate) dofs: Vec<Dof>,
    pub(crate) field_values: Vector,
}

impl Node {
    pub(crate) fn new(coordinates: Vector, fields_per_node: usize) -> Self {
        Self {
            coordinates,
            is_active: true,
            id: None,
            attached_cells: Default::default(),
            dofs: Vec::new(),
            field_values: Vector::zeros(fields_per_node),
        }
    }

    pub fn coordinates(&self) -> &Vector {
        &self.coordinates
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The id assigned when counting nodes, if the node is active and has been counted.
    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn attached_cells(&self, dim: usize) -> &BTreeSet<CellHandle> {
        &self.attached_cells[dim]
    }

    pub fn dofs(&self) -> &[Dof] {
        &self.dofs
    }

    pub fn field_values(&self) -> &Vector {
        &self.field_values
    }
}

/// A mesh entity of fixed topological dimension.
#[derive(Debug)]
pub struct Cell {
    pub(crate) element_type: usize,
    pub(crate) label: usize,
    pub(crate) dim: usize,
    pub(crate) id: Option<usize>,
    pub(crate) partition: usize,
    pub(crate) nodes: Vec<NodeHandle>,
    pub(crate) attached_cells: AttachedCells,
    pub(crate) neighbors: Vec<Option<CellHandle>>,
    pub(crate) dofs: Vec<Dof>,
    /// Opaque per-cell storage, sized by the number of fields per cell.
    pub cell_data: Vector,
    pub numerics_status: Vec<Box<dyn NumericsStatus>>,
}

impl Cell {
    pub(crate) fn new(element_type: usize, label: usize, dim: usize, fields_per_cell: usize) -> Self {
        Self {
            element_type,
            label,
            dim,
            id: None,
            partition: 0,
            nodes: Vec::new(),
            attached_cells: Default::default(),
            neighbors: Vec::new(),
            dofs: Vec::new(),
            cell_data: Vector::zeros(fields_per_cell),
            numerics_status: Vec::new(),
        }
    }

    pub fn element_type(&self) -> usize {
        self.element_type
    }

    /// The number of the physical entity the cell belongs to.
    pub fn label(&self) -> usize {
        self.label
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn attached_cells(&self, dim: usize) -> &BTreeSet<CellHandle> {
        &self.attached_cells[dim]
    }

    /// Same-dimension neighbors, one slot per local face. `None` marks a domain boundary.
    pub fn neighbors(&self) -> &[Option<CellHandle>] {
        &self.neighbors
    }

    pub fn dofs(&self) -> &[Dof] {
        &self.dofs
    }

    pub fn contains_node(&self, node: NodeHandle) -> bool {
        self.nodes.contains(&node)
    }
}
