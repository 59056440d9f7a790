use crate::dof::{Dof, DofHandle, DofInfo, MultiFreedomConstraint, MultiFreedomConstraintRecord, ValueType};
use crate::domain::DomainManager;
use crate::error::{ConfigurationError, DofError};
use crate::mesh::{Cell, CellHandle, Node, NodeHandle, NUM_DIMENSIONS};
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Owns the DOF schema and the per-stage partitioning of DOFs into active and inactive sets.
///
/// Nodal and cell DOFs are stored in the slots of their node or cell, which are owned by the
/// [`DomainManager`]. Operations on them therefore take the domain as an explicit argument.
#[derive(Debug, Default)]
pub struct DofManager {
    nodal_dof_info: Vec<DofInfo>,
    cell_dof_info: [Vec<DofInfo>; NUM_DIMENSIONS],
    multi_freedom_constraints: Vec<MultiFreedomConstraint>,
    free_dofs: Vec<Dof>,
    // Indexed by stage - 1
    active_dofs: Vec<Vec<DofHandle>>,
    inactive_dofs: Vec<Vec<DofHandle>>,
}

impl DofManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_nodal_dofs_from(&mut self, nodal_dofs: &[DofInfo]) {
        self.nodal_dof_info = nodal_dofs
            .iter()
            .cloned()
            .map(|info| DofInfo { dim: 0, ..info })
            .collect();
    }

    pub fn read_cell_dofs_from(&mut self, cell_dofs: &[DofInfo]) -> Result<(), ConfigurationError> {
        let mut cell_dof_info: [Vec<DofInfo>; NUM_DIMENSIONS] = Default::default();
        for info in cell_dofs {
            let by_dim = cell_dof_info
                .get_mut(info.dim)
                .ok_or_else(|| ConfigurationError::InvalidCellDofDimension {
                    tag: info.tag.clone(),
                    dim: info.dim,
                })?;
            by_dim.push(info.clone());
        }
        self.cell_dof_info = cell_dof_info;
        Ok(())
    }

    /// Decodes constraint records. Nodal DOFs must have been read beforehand.
    pub fn read_multi_freedom_constraints_from(
        &mut self,
        records: &[MultiFreedomConstraintRecord],
    ) -> Result<(), ConfigurationError> {
        let constraints = records
            .iter()
            .map(|record| match record.kind.as_str() {
                "NodalDofSlaveConstraint" => Ok(MultiFreedomConstraint::NodalDofSlave {
                    master_tag: record.master_tag.clone(),
                    master_dof: self.index_for_nodal_dof(&record.master_dof)?,
                    slave_tag: record.slave_tag.clone(),
                    slave_dof: self.index_for_nodal_dof(&record.slave_dof)?,
                }),
                other => Err(ConfigurationError::UnknownConstraintType(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.multi_freedom_constraints = constraints;
        Ok(())
    }

    pub fn add_multi_freedom_constraint(&mut self, constraint: MultiFreedomConstraint) {
        self.multi_freedom_constraints.push(constraint);
    }

    pub fn multi_freedom_constraints(&self) -> &[MultiFreedomConstraint] {
        &self.multi_freedom_constraints
    }

    pub fn nodal_dof_info(&self) -> &[DofInfo] {
        &self.nodal_dof_info
    }

    pub fn cell_dof_info(&self, dim: usize) -> &[DofInfo] {
        &self.cell_dof_info[dim]
    }

    pub fn index_for_nodal_dof(&self, tag: &str) -> Result<usize, ConfigurationError> {
        self.nodal_dof_info
            .iter()
            .position(|info| info.tag == tag)
            .ok_or_else(|| ConfigurationError::UnknownNodalDof(tag.to_string()))
    }

    /// Slot index of a cell DOF, regardless of the cell dimension it is defined for.
    pub fn index_for_cell_dof(&self, tag: &str) -> Result<usize, ConfigurationError> {
        self.cell_dof_info
            .iter()
            .find_map(|infos| infos.iter().position(|info| info.tag == tag))
            .ok_or_else(|| ConfigurationError::UnknownCellDof(tag.to_string()))
    }

    pub fn create_nodal_dofs_at(&self, node: &mut Node) {
        node.dofs = self
            .nodal_dof_info
            .iter()
            .map(|info| Dof::new(info.group))
            .collect();
    }

    pub fn create_cell_dofs_at(&self, cell: &mut Cell) {
        cell.dofs = self.cell_dof_info[cell.dim]
            .iter()
            .map(|info| Dof::new(info.group))
            .collect();
    }

    /// Creates a DOF that is not attached to any node or cell.
    pub fn create_numerics_dof_with_group(&mut self, group: usize) -> DofHandle {
        self.free_dofs.push(Dof::new(group));
        DofHandle::Free(self.free_dofs.len() - 1)
    }

    /// Returns the DOF stored in the given slot.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to an existing DOF.
    pub fn dof<'a>(&'a self, domain: &'a DomainManager, handle: DofHandle) -> &'a Dof {
        match handle {
            DofHandle::Nodal { node, slot } => &domain.node_by_handle(node).dofs[slot],
            DofHandle::Cell { cell, slot } => &domain.cell(cell).dofs[slot],
            DofHandle::Free(index) => &self.free_dofs[index],
        }
    }

    fn dof_mut<'a>(&'a mut self, domain: &'a mut DomainManager, handle: DofHandle) -> &'a mut Dof {
        match handle {
            DofHandle::Nodal { node, slot } => &mut domain.node_by_handle_mut(node).dofs[slot],
            DofHandle::Cell { cell, slot } => &mut domain.cell_mut(cell).dofs[slot],
            DofHandle::Free(index) => &mut self.free_dofs[index],
        }
    }

    /// Follows the master references of a DOF to the DOF that defines its value.
    pub fn resolve(&self, domain: &DomainManager, handle: DofHandle) -> DofHandle {
        let mut current = handle;
        while let Some(master) = self.dof(domain, current).master {
            current = master;
        }
        current
    }

    /// Makes `target` a slave of the root master of `master`.
    pub fn enslave(
        &mut self,
        domain: &mut DomainManager,
        target: DofHandle,
        master: DofHandle,
    ) -> Result<(), DofError> {
        let root = self.resolve(domain, master);
        if root == target {
            return Err(DofError::CyclicConstraint { target, master });
        }
        self.dof_mut(domain, target).master = Some(root);
        Ok(())
    }

    pub fn impose_multi_freedom_constraints(&mut self, domain: &mut DomainManager) -> eyre::Result<()> {
        for i in 0..self.multi_freedom_constraints.len() {
            let constraint = self.multi_freedom_constraints[i].clone();
            match constraint {
                MultiFreedomConstraint::NodalDofSlave {
                    master_tag,
                    master_dof,
                    slave_tag,
                    slave_dof,
                } => self.impose_nodal_dof_slave_constraint(domain, &master_tag, master_dof, &slave_tag, slave_dof)?,
            }
        }
        Ok(())
    }

    fn impose_nodal_dof_slave_constraint(
        &mut self,
        domain: &mut DomainManager,
        master_tag: &str,
        master_dof: usize,
        slave_tag: &str,
        slave_dof: usize,
    ) -> eyre::Result<()> {
        let master_label = domain.physical_entity_number_for(master_tag)?;
        let master_dim = domain.dimension_of_physical_entity(master_label)?;
        let master_cell = domain
            .cells_with_label(master_dim, master_label)
            .next()
            .ok_or_else(|| ConfigurationError::MissingMasterNode(master_tag.to_string()))?;
        let master_node = match domain.cell(master_cell).nodes() {
            [node] => *node,
            _ => return Err(ConfigurationError::MultipleMasterNodes(master_tag.to_string()).into()),
        };
        let master = DofHandle::Nodal {
            node: master_node,
            slot: master_dof,
        };

        let slave_label = domain.physical_entity_number_for(slave_tag)?;
        let slave_dim = domain.dimension_of_physical_entity(slave_label)?;
        let slave_nodes: Vec<NodeHandle> = domain
            .cells_with_label(slave_dim, slave_label)
            .flat_map(|cell| domain.cell(cell).nodes().to_vec())
            .collect();
        if slave_nodes.is_empty() {
            warn!("Slave constraint '{}' -> '{}' has no slave nodes", slave_tag, master_tag);
        }

        for node in slave_nodes {
            let slave = DofHandle::Nodal { node, slot: slave_dof };
            if slave != master {
                self.enslave(domain, slave, master)?;
            }
        }
        Ok(())
    }

    /// Marks a DOF as constrained, which removes it from the equation system.
    pub fn put_dirichlet_constraint_on(&mut self, domain: &mut DomainManager, handle: DofHandle) {
        let dof = self.dof_mut(domain, handle);
        dof.is_constrained = true;
        dof.equation_number = None;
    }

    /// Clears the constraint flag of all nodal and cell DOFs.
    pub fn remove_all_dof_constraints(&mut self, domain: &mut DomainManager) {
        for node in domain.nodes.iter_mut() {
            node.dofs.iter_mut().for_each(|dof| dof.is_constrained = false);
        }
        for cell in domain.cells.iter_mut().flatten() {
            cell.dofs.iter_mut().for_each(|dof| dof.is_constrained = false);
        }
    }

    /// Assigns a DOF to a solution stage. Reassigning a DOF to a different stage is an error.
    pub fn set_stage_for(&mut self, domain: &mut DomainManager, handle: DofHandle, stage: usize) -> Result<(), DofError> {
        if stage == 0 {
            return Err(DofError::InvalidStage(stage));
        }
        let dof = self.dof_mut(domain, handle);
        match dof.stage {
            Some(assigned) if assigned != stage => Err(DofError::StageConflict {
                dof: handle,
                assigned,
                requested: stage,
            }),
            _ => {
                dof.stage = Some(stage);
                Ok(())
            }
        }
    }

    pub fn stage_of(&self, domain: &DomainManager, handle: DofHandle) -> Option<usize> {
        self.dof(domain, handle).stage
    }

    /// All DOFs of active nodes, then all cell DOFs by increasing dimension, then free DOFs.
    ///
    /// This order defines the order of active DOFs within a stage.
    fn iter_dofs<'a>(&'a self, domain: &'a DomainManager) -> impl Iterator<Item = (DofHandle, &'a Dof)> + 'a {
        // Walk the counted node table so that node activation changes made after counting do not
        // change which DOFs are partitioned
        let nodal = (0..domain.number_of_nodes())
            .filter_map(move |id| domain.node_handle(id))
            .flat_map(move |node| {
                domain
                    .node_by_handle(node)
                    .dofs
                    .iter()
                    .enumerate()
                    .map(move |(slot, dof)| (DofHandle::Nodal { node, slot }, dof))
            });
        let cell = domain.cells.iter().enumerate().flat_map(|(dim, cells)| {
            cells.iter().enumerate().flat_map(move |(index, cell)| {
                cell.dofs.iter().enumerate().map(move |(slot, dof)| {
                    let handle = DofHandle::Cell {
                        cell: CellHandle::new(dim, index),
                        slot,
                    };
                    (handle, dof)
                })
            })
        });
        let free = self
            .free_dofs
            .iter()
            .enumerate()
            .map(|(index, dof)| (DofHandle::Free(index), dof));
        nodal.chain(cell).chain(free)
    }

    /// Partitions the DOFs with an assigned stage into active and inactive DOFs per stage.
    ///
    /// Active DOFs are unconstrained masters. DOFs without a stage are ignored.
    pub fn find_active_dofs(&mut self, domain: &DomainManager) {
        let mut num_active: Vec<usize> = vec![0; domain.number_of_stages()];
        let mut num_inactive: Vec<usize> = vec![0; domain.number_of_stages()];
        for (_, dof) in self.iter_dofs(domain) {
            if let Some(stage) = dof.stage {
                if num_active.len() < stage {
                    num_active.resize(stage, 0);
                    num_inactive.resize(stage, 0);
                }
                if dof.is_active() {
                    num_active[stage - 1] += 1;
                } else {
                    num_inactive[stage - 1] += 1;
                }
            }
        }

        let mut active: Vec<Vec<DofHandle>> = num_active.iter().map(|&n| Vec::with_capacity(n)).collect();
        let mut inactive: Vec<Vec<DofHandle>> = num_inactive.iter().map(|&n| Vec::with_capacity(n)).collect();
        for (handle, dof) in self.iter_dofs(domain) {
            if let Some(stage) = dof.stage {
                if dof.is_active() {
                    active[stage - 1].push(handle);
                } else {
                    inactive[stage - 1].push(handle);
                }
            }
        }

        debug!(
            "Found {} active and {} inactive DOFs in {} stages",
            num_active.iter().sum::<usize>(),
            num_inactive.iter().sum::<usize>(),
            num_active.len()
        );
        self.active_dofs = active;
        self.inactive_dofs = inactive;
    }

    /// Number of stages covered by the active/inactive partition found by the last call to
    /// [`DofManager::find_active_dofs`].
    pub fn number_of_partitioned_stages(&self) -> usize {
        self.active_dofs.len()
    }

    /// Active DOFs of a stage, in canonical order. Empty for stages without DOFs.
    pub fn active_dofs_at_stage(&self, stage: usize) -> &[DofHandle] {
        stage
            .checked_sub(1)
            .and_then(|index| self.active_dofs.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn inactive_dofs_at_stage(&self, stage: usize) -> &[DofHandle] {
        stage
            .checked_sub(1)
            .and_then(|index| self.inactive_dofs.get(index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn number_of_active_dofs_at_stage(&self, stage: usize) -> usize {
        self.active_dofs_at_stage(stage).len()
    }

    /// Numbers the active DOFs of a stage consecutively in their canonical order.
    ///
    /// Returns the number of equations.
    pub fn assign_equation_numbers_at_stage(&mut self, domain: &mut DomainManager, stage: usize) -> usize {
        let active = self.active_dofs_at_stage(stage).to_vec();
        for (equation_number, &handle) in active.iter().enumerate() {
            self.dof_mut(domain, handle).equation_number = Some(equation_number);
        }
        let inactive = self.inactive_dofs_at_stage(stage).to_vec();
        for handle in inactive {
            let dof = self.dof_mut(domain, handle);
            if dof.is_constrained {
                dof.equation_number = None;
            }
        }
        active.len()
    }

    pub fn group_number_for(&self, domain: &DomainManager, handle: DofHandle) -> usize {
        self.dof(domain, self.resolve(domain, handle)).group
    }

    /// The equation number of a DOF, read through its master if it is a slave.
    pub fn equation_number_at(&self, domain: &DomainManager, handle: DofHandle) -> Option<usize> {
        self.dof(domain, self.resolve(domain, handle)).equation_number
    }

    pub fn value_of_primary_variable_at(
        &self,
        domain: &DomainManager,
        handle: DofHandle,
        value_type: ValueType,
    ) -> Result<f64, DofError> {
        self.dof(domain, self.resolve(domain, handle))
            .value(value_type)
            .ok_or(DofError::UnreadableValueType(value_type))
    }

    /// Updates the primary variable of a DOF, or of its master if it is a slave.
    pub fn update_primary_variable_at(
        &mut self,
        domain: &mut DomainManager,
        handle: DofHandle,
        value: f64,
        value_type: ValueType,
    ) {
        let root = self.resolve(domain, handle);
        self.dof_mut(domain, root).update(value, value_type);
    }

    pub fn update_secondary_variable_at(&mut self, domain: &mut DomainManager, handle: DofHandle, value: f64) {
        self.dof_mut(domain, handle).secondary = value;
    }

    /// Copies current values into converged values for all DOFs of a stage.
    ///
    /// Slaves take both values from the current value of their root master.
    pub fn finalize_dof_primary_values_at_stage(&mut self, domain: &mut DomainManager, stage: usize) {
        let master_values: FxHashMap<DofHandle, f64> = self
            .iter_dofs(domain)
            .filter(|(_, dof)| dof.stage == Some(stage) && dof.is_slave())
            .map(|(handle, _)| {
                let root = self.resolve(domain, handle);
                (handle, self.dof(domain, root).current)
            })
            .collect();

        let finalize = |handle: DofHandle, dof: &mut Dof| {
            if dof.stage == Some(stage) {
                match master_values.get(&handle) {
                    Some(&value) => {
                        dof.converged = value;
                        dof.current = value;
                    }
                    None => dof.converged = dof.current,
                }
            }
        };

        domain
            .nodes
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, node)| {
                for (slot, dof) in node.dofs.iter_mut().enumerate() {
                    finalize(
                        DofHandle::Nodal {
                            node: NodeHandle(index),
                            slot,
                        },
                        dof,
                    );
                }
            });

        for (dim, cells) in domain.cells.iter_mut().enumerate() {
            cells.par_iter_mut().enumerate().for_each(|(index, cell)| {
                for (slot, dof) in cell.dofs.iter_mut().enumerate() {
                    finalize(
                        DofHandle::Cell {
                            cell: CellHandle::new(dim, index),
                            slot,
                        },
                        dof,
                    );
                }
            });
        }

        for (index, dof) in self.free_dofs.iter_mut().enumerate() {
            finalize(DofHandle::Free(index), dof);
        }
    }

    /// Writes converged primary values and secondary values of the nodal DOFs to the output
    /// fields of the node.
    pub fn write_converged_dof_values_to(&self, node: &mut Node) {
        for (info, dof) in self.nodal_dof_info.iter().zip(&node.dofs) {
            if info.primary_field > 0 {
                node.field_values[info.primary_field - 1] = dof.converged;
            }
            if info.secondary_field > 0 {
                node.field_values[info.secondary_field - 1] = dof.secondary;
            }
        }
    }

    pub fn report_number_of_active_dofs(&self) {
        info!("    Stage    Active DOFs");
        info!("    -----------------------");
        for (index, active) in self.active_dofs.iter().enumerate() {
            info!("    {:<9}{}", index + 1, active.len());
        }
    }
}
