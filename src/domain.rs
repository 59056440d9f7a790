//! The domain manager: owner of all nodes and cells, physical entities and numerics assignments.
use crate::dof::{DofHandle, DofManager};
use crate::error::{ConfigurationError, TopologyError};
use crate::mesh::{Cell, CellHandle, Node, NodeHandle, NUM_DIMENSIONS};
use crate::numerics::{Material, MaterialManager, Numerics, NumericsManager};
use crate::solution::TimeData;
use broomstyx_dense::Vector;
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

mod topology;

pub use topology::CellAttachments;

/// Global settings of the domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    pub number_of_stages: usize,
    #[serde(default)]
    pub fields_per_node: usize,
    #[serde(default)]
    pub fields_per_cell: usize,
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            number_of_stages: 1,
            fields_per_node: 0,
            fields_per_cell: 0,
        }
    }
}

/// A named region of the mesh. Cells refer to it through its number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalEntity {
    pub dimension: usize,
    pub number: usize,
    pub name: String,
}

/// Decoded assignment of numerics and materials to a region at a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAssignment {
    pub stage: usize,
    pub domain: String,
    pub numerics: usize,
    #[serde(default)]
    pub material_set: Vec<usize>,
}

/// Numerics and material sets keyed by physical entity number, one map per stage.
#[derive(Default)]
struct Assignments {
    numerics: Vec<FxHashMap<usize, Arc<dyn Numerics>>>,
    material_sets: Vec<FxHashMap<usize, Vec<Arc<dyn Material>>>>,
}

impl Assignments {
    fn with_stages(number_of_stages: usize) -> Self {
        Self {
            numerics: vec![FxHashMap::default(); number_of_stages],
            material_sets: vec![FxHashMap::default(); number_of_stages],
        }
    }

    fn numerics_for(&self, label: usize, stage: usize) -> Option<&Arc<dyn Numerics>> {
        stage
            .checked_sub(1)
            .and_then(|index| self.numerics.get(index))
            .and_then(|by_label| by_label.get(&label))
    }

    fn material_set_for(&self, label: usize, stage: usize) -> Option<&[Arc<dyn Material>]> {
        stage
            .checked_sub(1)
            .and_then(|index| self.material_sets.get(index))
            .and_then(|by_label| by_label.get(&label))
            .map(Vec::as_slice)
    }
}

pub struct DomainManager {
    settings: DomainSettings,
    physical_entities: Vec<PhysicalEntity>,
    assignments: Assignments,
    pub(crate) nodes: Vec<Node>,
    // Active nodes, indexed by node id
    node_table: Vec<NodeHandle>,
    pub(crate) cells: [Vec<Cell>; NUM_DIMENSIONS],
    // All cells, indexed by cell id
    cell_table: Vec<CellHandle>,
    partitions: Vec<Vec<CellHandle>>,
}

impl Default for DomainManager {
    fn default() -> Self {
        Self::new(DomainSettings::default())
    }
}

impl DomainManager {
    pub fn new(settings: DomainSettings) -> Self {
        Self {
            settings,
            physical_entities: Vec::new(),
            assignments: Assignments::with_stages(settings.number_of_stages),
            nodes: Vec::new(),
            node_table: Vec::new(),
            cells: Default::default(),
            cell_table: Vec::new(),
            partitions: Vec::new(),
        }
    }

    pub fn settings(&self) -> &DomainSettings {
        &self.settings
    }

    pub fn number_of_stages(&self) -> usize {
        self.settings.number_of_stages
    }

    fn check_stage(&self, stage: usize) -> Result<(), ConfigurationError> {
        if stage == 0 || stage > self.settings.number_of_stages {
            Err(ConfigurationError::InvalidStage {
                stage,
                number_of_stages: self.settings.number_of_stages,
            })
        } else {
            Ok(())
        }
    }

    // Physical entities

    pub fn create_physical_entity(
        &mut self,
        dimension: usize,
        number: usize,
        name: impl Into<String>,
    ) -> Result<(), ConfigurationError> {
        let name = name.into();
        if dimension >= NUM_DIMENSIONS {
            return Err(ConfigurationError::InvalidPhysicalEntityDimension { name, dim: dimension });
        }
        if self.physical_entities.iter().any(|entity| entity.number == number) {
            return Err(ConfigurationError::DuplicatePhysicalEntity(number));
        }
        self.physical_entities.push(PhysicalEntity {
            dimension,
            number,
            name,
        });
        Ok(())
    }

    /// The `n`-th physical entity in creation order.
    pub fn physical_entity(&self, n: usize) -> Option<&PhysicalEntity> {
        self.physical_entities.get(n)
    }

    pub fn physical_entities(&self) -> &[PhysicalEntity] {
        &self.physical_entities
    }

    pub fn number_of_physical_names(&self) -> usize {
        self.physical_entities.len()
    }

    fn physical_entity_with_number(&self, number: usize) -> Result<&PhysicalEntity, ConfigurationError> {
        self.physical_entities
            .iter()
            .find(|entity| entity.number == number)
            .ok_or(ConfigurationError::UnknownPhysicalEntityNumber(number))
    }

    pub fn dimension_of_physical_entity(&self, number: usize) -> Result<usize, ConfigurationError> {
        self.physical_entity_with_number(number)
            .map(|entity| entity.dimension)
    }

    pub fn name_of_physical_entity(&self, number: usize) -> Result<&str, ConfigurationError> {
        self.physical_entity_with_number(number)
            .map(|entity| entity.name.as_str())
    }

    pub fn physical_entity_number_for(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.physical_entities
            .iter()
            .find(|entity| entity.name == name)
            .map(|entity| entity.number)
            .ok_or_else(|| ConfigurationError::UnknownPhysicalEntity(name.to_string()))
    }

    // Domain assignments

    /// Assigns numerics, and the material set it requires, to a named region at a stage.
    pub fn assign_numerics_to_domain(
        &mut self,
        stage: usize,
        domain: &str,
        numerics: Arc<dyn Numerics>,
        materials: Vec<Arc<dyn Material>>,
    ) -> Result<(), ConfigurationError> {
        self.check_stage(stage)?;
        let label = self.physical_entity_number_for(domain)?;

        let required = numerics.required_number_of_materials();
        if materials.len() != required {
            return Err(ConfigurationError::MaterialCountMismatch {
                domain: domain.to_string(),
                expected: required,
                found: materials.len(),
            });
        }

        match self.assignments.numerics[stage - 1].entry(label) {
            Entry::Occupied(_) => {
                return Err(ConfigurationError::DuplicateNumerics {
                    domain: domain.to_string(),
                    stage,
                })
            }
            Entry::Vacant(entry) => {
                entry.insert(numerics);
            }
        }

        if !materials.is_empty() {
            match self.assignments.material_sets[stage - 1].entry(label) {
                Entry::Occupied(_) => {
                    return Err(ConfigurationError::DuplicateMaterialSet {
                        domain: domain.to_string(),
                        stage,
                    })
                }
                Entry::Vacant(entry) => {
                    entry.insert(materials);
                }
            }
        }
        Ok(())
    }

    pub fn read_domain_assignments_from(
        &mut self,
        assignments: &[DomainAssignment],
        numerics: &NumericsManager,
        materials: &MaterialManager,
    ) -> Result<(), ConfigurationError> {
        for assignment in assignments {
            let assigned_numerics = numerics.numerics(assignment.numerics)?;
            let material_set = assignment
                .material_set
                .iter()
                .map(|&label| materials.material(label))
                .collect::<Result<Vec<_>, _>>()?;
            self.assign_numerics_to_domain(assignment.stage, &assignment.domain, assigned_numerics, material_set)?;
        }
        Ok(())
    }

    /// The numerics assigned to a physical entity at a stage, if any.
    pub fn numerics_for_domain(&self, label: usize, stage: usize) -> Option<&Arc<dyn Numerics>> {
        self.assignments.numerics_for(label, stage)
    }

    pub fn numerics_for(&self, cell: CellHandle, stage: usize) -> Option<&Arc<dyn Numerics>> {
        self.numerics_for_domain(self.cell(cell).label, stage)
    }

    pub fn material_set_for_domain(&self, label: usize, stage: usize) -> Result<&[Arc<dyn Material>], ConfigurationError> {
        match self.assignments.material_set_for(label, stage) {
            Some(materials) => Ok(materials),
            None => Err(ConfigurationError::MissingMaterialSet {
                domain: self.name_of_physical_entity(label)?.to_string(),
                stage,
            }),
        }
    }

    // Nodes

    /// Creates a node with nodal DOFs at the given 2-D or 3-D location.
    pub fn make_new_node_at(&mut self, dofs: &DofManager, location: &Vector) -> Result<NodeHandle, TopologyError> {
        let mut node = Node::new(padded_coordinates(location)?, self.settings.fields_per_node);
        dofs.create_nodal_dofs_at(&mut node);
        self.nodes.push(node);
        Ok(NodeHandle(self.nodes.len() - 1))
    }

    /// Assigns consecutive ids to the active nodes in creation order.
    pub fn count_nodes(&mut self) {
        self.node_table.clear();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if node.is_active {
                node.id = Some(self.node_table.len());
                self.node_table.push(NodeHandle(index));
            } else {
                node.id = None;
            }
        }
    }

    /// Handle of the counted node with the given id.
    pub fn node_handle(&self, id: usize) -> Option<NodeHandle> {
        self.node_table.get(id).copied()
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.node_handle(id)
            .map(|handle| self.node_by_handle(handle))
    }

    pub fn node_by_handle(&self, node: NodeHandle) -> &Node {
        &self.nodes[node.0]
    }

    pub(crate) fn node_by_handle_mut(&mut self, node: NodeHandle) -> &mut Node {
        &mut self.nodes[node.0]
    }

    /// The number of counted nodes.
    pub fn number_of_nodes(&self) -> usize {
        self.node_table.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn cells_attached_to(&self, node: NodeHandle, dim: usize) -> &BTreeSet<CellHandle> {
        self.node_by_handle(node).attached_cells(dim)
    }

    pub fn coordinates_of(&self, node: NodeHandle) -> &Vector {
        &self.node_by_handle(node).coordinates
    }

    pub fn set_coordinates_of(&mut self, node: NodeHandle, coordinates: &Vector) -> Result<(), TopologyError> {
        self.node_by_handle_mut(node).coordinates = padded_coordinates(coordinates)?;
        Ok(())
    }

    pub fn nodal_dof(&self, node: NodeHandle, slot: usize) -> Option<DofHandle> {
        (slot < self.node_by_handle(node).dofs.len()).then_some(DofHandle::Nodal { node, slot })
    }

    /// Value of a 1-based output field. Field 0 denotes no field and always reads as zero.
    pub fn field_value_at(&self, node: NodeHandle, field: usize) -> f64 {
        match field {
            0 => 0.0,
            field => self.node_by_handle(node).field_values[field - 1],
        }
    }

    /// Writes a 1-based output field. Writes to field 0 are ignored.
    pub fn set_field_value_at(&mut self, node: NodeHandle, field: usize, value: f64) {
        if field > 0 {
            self.node_by_handle_mut(node).field_values[field - 1] = value;
        }
    }

    /// Excludes a node from the next node count and from DOF discovery.
    pub fn deactivate_node(&mut self, node: NodeHandle) {
        self.node_by_handle_mut(node).is_active = false;
    }

    /// Writes converged DOF values to the output fields of every node.
    pub fn perform_nodal_post_processing(&mut self, dofs: &DofManager) {
        let start = Instant::now();
        self.nodes
            .par_iter_mut()
            .for_each(|node| dofs.write_converged_dof_values_to(node));
        info!("Performed nodal post-processing in {:.3} s", start.elapsed().as_secs_f64());
    }

    // Cells

    /// Creates a cell belonging to the physical entity `label`, with the cell DOFs configured for
    /// the dimension of that entity.
    pub fn make_new_cell(
        &mut self,
        dofs: &DofManager,
        element_type: usize,
        label: usize,
    ) -> Result<CellHandle, ConfigurationError> {
        let dim = self.dimension_of_physical_entity(label)?;
        let mut cell = Cell::new(element_type, label, dim, self.settings.fields_per_cell);
        dofs.create_cell_dofs_at(&mut cell);
        self.cells[dim].push(cell);
        Ok(CellHandle::new(dim, self.cells[dim].len() - 1))
    }

    /// Assigns ids to all cells, consecutively by dimension and then by creation order.
    pub fn count_cells(&mut self) {
        self.cell_table.clear();
        for (dim, cells) in self.cells.iter_mut().enumerate() {
            for (index, cell) in cells.iter_mut().enumerate() {
                cell.id = Some(self.cell_table.len());
                self.cell_table.push(CellHandle::new(dim, index));
            }
        }
    }

    /// Returns the cell referred to by the handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an existing cell.
    pub fn cell(&self, cell: CellHandle) -> &Cell {
        &self.cells[cell.dim][cell.index]
    }

    pub(crate) fn cell_mut(&mut self, cell: CellHandle) -> &mut Cell {
        &mut self.cells[cell.dim][cell.index]
    }

    pub fn cell_handle(&self, id: usize) -> Option<CellHandle> {
        self.cell_table.get(id).copied()
    }

    pub fn cell_by_id(&self, id: usize) -> Option<&Cell> {
        self.cell_handle(id).map(|handle| self.cell(handle))
    }

    pub fn cells_with_dimension(&self, dim: usize) -> &[Cell] {
        &self.cells[dim]
    }

    pub fn number_of_cells_with_dimension(&self, dim: usize) -> usize {
        self.cells[dim].len()
    }

    /// Handles of all cells, by dimension and then by creation order.
    pub fn cell_handles(&self) -> impl Iterator<Item = CellHandle> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(dim, cells)| (0..cells.len()).map(move |index| CellHandle::new(dim, index)))
    }

    pub fn cells_with_label(&self, dim: usize, label: usize) -> impl Iterator<Item = CellHandle> + '_ {
        self.cells[dim]
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.label == label)
            .map(move |(index, _)| CellHandle::new(dim, index))
    }

    /// Sets the nodes of a cell from counted node ids and records the cell as attached to them.
    ///
    /// Mutates the attachment sets of the nodes, so it must not be called concurrently.
    pub fn set_nodes_of(&mut self, cell: CellHandle, node_ids: &[usize]) -> Result<(), TopologyError> {
        let nodes = node_ids
            .iter()
            .map(|&id| self.node_handle(id).ok_or(TopologyError::UnknownNode(id)))
            .collect::<Result<Vec<_>, _>>()?;

        let previous = std::mem::take(&mut self.cell_mut(cell).nodes);
        for node in previous {
            self.node_by_handle_mut(node).attached_cells[cell.dim].remove(&cell);
        }
        for &node in &nodes {
            self.node_by_handle_mut(node).attached_cells[cell.dim].insert(cell);
        }
        self.cell_mut(cell).nodes = nodes;
        Ok(())
    }

    /// Permutes the nodes of a cell such that node `i` becomes the node previously at
    /// `permutation[i]`. The permutation must contain every local node index exactly once.
    pub fn reorder_nodes_of(&mut self, cell: CellHandle, permutation: &[usize]) -> Result<(), TopologyError> {
        let nodes = &self.cell(cell).nodes;
        if permutation.len() != nodes.len() {
            return Err(TopologyError::PermutationLengthMismatch {
                expected: nodes.len(),
                found: permutation.len(),
            });
        }
        let mut visited = vec![false; nodes.len()];
        let mut reordered = Vec::with_capacity(nodes.len());
        for &index in permutation {
            match visited.get_mut(index) {
                None => return Err(TopologyError::InvalidPermutationIndex { index, len: nodes.len() }),
                Some(true) => return Err(TopologyError::DuplicatePermutationIndex(index)),
                Some(seen) => *seen = true,
            }
            reordered.push(nodes[index]);
        }
        self.cell_mut(cell).nodes = reordered;
        Ok(())
    }

    pub fn nodes_of(&self, cell: CellHandle) -> &[NodeHandle] {
        &self.cell(cell).nodes
    }

    pub fn neighbors_of(&self, cell: CellHandle) -> &[Option<CellHandle>] {
        &self.cell(cell).neighbors
    }

    pub fn attached_cells_of(&self, cell: CellHandle, dim: usize) -> &BTreeSet<CellHandle> {
        self.cell(cell).attached_cells(dim)
    }

    /// The nodal DOF `slot` of every node of a cell, in node order.
    pub fn nodal_dofs_of(&self, cell: CellHandle, slot: usize) -> Vec<DofHandle> {
        self.nodes_of(cell)
            .iter()
            .filter_map(|&node| self.nodal_dof(node, slot))
            .collect()
    }

    pub fn cell_dof(&self, cell: CellHandle, slot: usize) -> Option<DofHandle> {
        (slot < self.cell(cell).dofs.len()).then_some(DofHandle::Cell { cell, slot })
    }

    pub fn element_type_of(&self, cell: CellHandle) -> usize {
        self.cell(cell).element_type
    }

    pub fn set_element_type_of(&mut self, cell: CellHandle, element_type: usize) {
        self.cell_mut(cell).element_type = element_type;
    }

    pub fn label_of(&self, cell: CellHandle) -> usize {
        self.cell(cell).label
    }

    pub fn set_partition_of(&mut self, cell: CellHandle, partition: usize) {
        self.cell_mut(cell).partition = partition;
    }

    /// Groups the cells of all dimensions by partition number.
    pub fn form_domain_partitions(&mut self) {
        let number_of_partitions = self
            .cells
            .iter()
            .flatten()
            .map(|cell| cell.partition + 1)
            .max()
            .unwrap_or(0);
        let mut partitions = vec![Vec::new(); number_of_partitions];
        for handle in self.cell_handles() {
            partitions[self.cell(handle).partition].push(handle);
        }
        self.partitions = partitions;
    }

    pub fn number_of_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn cells_in_partition(&self, partition: usize) -> &[CellHandle] {
        self.partitions
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // Numerics callbacks

    pub fn initialize_numerics_at_cells(&mut self) -> eyre::Result<()> {
        let start = Instant::now();
        let assignments = &self.assignments;
        let number_of_stages = self.settings.number_of_stages;
        for cells in self.cells.iter_mut() {
            cells.par_iter_mut().try_for_each(|cell| {
                for stage in 1..=number_of_stages {
                    if let Some(numerics) = assignments.numerics_for(cell.label, stage) {
                        numerics.initialize_numerics_at(cell)?;
                    }
                }
                Ok::<_, eyre::Report>(())
            })?;
        }
        info!("Initialized numerics at cells in {:.3} s", start.elapsed().as_secs_f64());
        Ok(())
    }

    pub fn initialize_materials_at_cells(&mut self) -> eyre::Result<()> {
        let start = Instant::now();
        let assignments = &self.assignments;
        let physical_entities = &self.physical_entities;
        let number_of_stages = self.settings.number_of_stages;
        for cells in self.cells.iter_mut() {
            cells.par_iter_mut().try_for_each(|cell| {
                for stage in 1..=number_of_stages {
                    let numerics = match assignments.numerics_for(cell.label, stage) {
                        Some(numerics) => numerics,
                        None => continue,
                    };
                    if numerics.required_number_of_materials() == 0 {
                        continue;
                    }
                    let materials = assignments
                        .material_set_for(cell.label, stage)
                        .ok_or_else(|| ConfigurationError::MissingMaterialSet {
                            domain: physical_entities
                                .iter()
                                .find(|entity| entity.number == cell.label)
                                .map(|entity| entity.name.clone())
                                .unwrap_or_else(|| cell.label.to_string()),
                            stage,
                        })?;
                    numerics.initialize_materials_at(cell, materials)?;
                }
                Ok::<_, eyre::Report>(())
            })?;
        }
        info!("Initialized material data at cells in {:.3} s", start.elapsed().as_secs_f64());
        Ok(())
    }

    pub fn finalize_cell_data_at(&mut self, time: &TimeData, stage: usize) -> eyre::Result<()> {
        let assignments = &self.assignments;
        for cells in self.cells.iter_mut() {
            cells.par_iter_mut().try_for_each(|cell| {
                match assignments.numerics_for(cell.label, stage) {
                    Some(numerics) => numerics.finalize_data_at(cell, time),
                    None => Ok(()),
                }
            })?;
        }
        Ok(())
    }

    /// Lets the numerics of every cell at the stage remove the constraints it imposed.
    pub fn remove_all_cell_constraints(&mut self, dofs: &mut DofManager, stage: usize) -> eyre::Result<()> {
        let targets: Vec<(CellHandle, Arc<dyn Numerics>)> = self
            .cell_handles()
            .filter_map(|cell| {
                self.numerics_for(cell, stage)
                    .map(|numerics| (cell, numerics.clone()))
            })
            .collect();
        for (cell, numerics) in targets {
            numerics.remove_constraints_on(cell, self, dofs)?;
        }
        Ok(())
    }

    /// Whether the numerics of every cell at the stage report convergence.
    pub fn check_convergence_of_numerics_at(&self, stage: usize) -> bool {
        let assignments = &self.assignments;
        let unconverged: usize = self
            .cells
            .iter()
            .map(|cells| {
                cells
                    .par_iter()
                    .filter(|cell| {
                        assignments
                            .numerics_for(cell.label, stage)
                            .map_or(false, |numerics| !numerics.perform_additional_convergence_check_at(cell, stage))
                    })
                    .count()
            })
            .sum();
        if unconverged > 0 {
            debug!("{} cells have not converged at stage {}", unconverged, stage);
        }
        unconverged == 0
    }

    pub fn report_status(&self) {
        info!("    Nodes          = {}", self.number_of_nodes());
        for (dim, cells) in self.cells.iter().enumerate() {
            info!("    {}-D cells       = {}", dim, cells.len());
        }
        if !self.partitions.is_empty() {
            info!("    Number of domain partitions = {}", self.partitions.len());
            for (partition, cells) in self.partitions.iter().enumerate() {
                info!("      Cells in partition # {:2} = {}", partition, cells.len());
            }
        }
    }

    pub fn report_detailed_status(&self, dofs: &DofManager) {
        self.report_status();
        for (id, &handle) in self.node_table.iter().enumerate() {
            let node = self.node_by_handle(handle);
            let coordinates = &node.coordinates;
            let equation_numbers = (0..node.dofs.len())
                .map(|slot| {
                    dofs.equation_number_at(self, DofHandle::Nodal { node: handle, slot })
                        .map_or_else(|| "-".to_string(), |n| n.to_string())
                })
                .join(" ");
            debug!(
                "    node {}: x = {:e}, y = {:e}, z = {:e}, dofs = {}",
                id,
                coordinates[0],
                coordinates[1],
                coordinates[2],
                equation_numbers
            );
        }
    }
}

/// Nodes always carry three coordinates; 2-D locations lie in the plane z = 0.
fn padded_coordinates(location: &Vector) -> Result<Vector, TopologyError> {
    match location.as_slice() {
        &[x, y] => Ok(Vector::from([x, y, 0.0])),
        &[x, y, z] => Ok(Vector::from([x, y, z])),
        other => Err(TopologyError::InvalidCoordinateDimension(other.len())),
    }
}
