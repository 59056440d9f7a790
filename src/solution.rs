//! Sequencing of stages and load steps.
use crate::dof::ValueType;
use crate::mesh::CellHandle;
use crate::model::AnalysisModel;
use broomstyx_dense::Vector;
use eyre::eyre;
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeData {
    pub start: f64,
    pub target: f64,
    pub current: f64,
    pub increment: f64,
}

impl TimeData {
    pub fn new(start: f64, target: f64) -> Self {
        Self {
            start,
            target,
            current: start,
            increment: target - start,
        }
    }
}

pub type InitialValueFn = Arc<dyn Fn(&Vector) -> f64 + Send + Sync>;

#[derive(Clone)]
pub enum InitialCondition {
    /// Sets a nodal DOF at every node of the region to a function of the node coordinates.
    NodalDof {
        domain: String,
        dof: usize,
        value: InitialValueFn,
    },
    /// Delegated to the numerics assigned to the region at the given stage.
    CellDof { domain: String, stage: usize },
}

impl InitialCondition {
    pub fn nodal_dof<F>(domain: impl Into<String>, dof: usize, value: F) -> Self
    where
        F: Fn(&Vector) -> f64 + Send + Sync + 'static,
    {
        InitialCondition::NodalDof {
            domain: domain.into(),
            dof,
            value: Arc::new(value),
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            InitialCondition::NodalDof { domain, .. } => domain,
            InitialCondition::CellDof { domain, .. } => domain,
        }
    }
}

impl Debug for InitialCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialCondition::NodalDof { domain, dof, .. } => f
                .debug_struct("NodalDof")
                .field("domain", domain)
                .field("dof", dof)
                .finish_non_exhaustive(),
            InitialCondition::CellDof { domain, stage } => f
                .debug_struct("CellDof")
                .field("domain", domain)
                .field("stage", stage)
                .finish(),
        }
    }
}

/// A condition imposed on the cells of a boundary region by the given numerics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCondition {
    pub boundary: String,
    pub numerics: usize,
    pub condition_type: String,
    pub target_dof: usize,
    pub value: f64,
}

/// Solves the equation system of a stage within a load step.
pub trait SolutionMethod: Send {
    fn compute_solution_for(
        &mut self,
        stage: usize,
        boundary_conditions: &[BoundaryCondition],
        time: &TimeData,
        model: &mut AnalysisModel,
    ) -> eyre::Result<()>;
}

pub struct LoadStep {
    pub number: usize,
    pub time: TimeData,
    pub boundary_conditions: Vec<BoundaryCondition>,
    /// One solution method per stage, in stage order.
    pub solution_methods: Vec<Box<dyn SolutionMethod>>,
}

impl LoadStep {
    pub fn new(number: usize, time: TimeData) -> Self {
        Self {
            number,
            time,
            boundary_conditions: Vec::new(),
            solution_methods: Vec::new(),
        }
    }

    pub fn solve_yourself(&mut self, model: &mut AnalysisModel) -> eyre::Result<()> {
        info!(
            "Load step {}: t = {} -> {}",
            self.number, self.time.start, self.time.target
        );
        self.time.current = self.time.target;
        self.time.increment = self.time.target - self.time.start;

        for stage in 1..=model.domain.number_of_stages() {
            let start = Instant::now();
            impose_constraints_at(stage, &self.boundary_conditions, &self.time, model)?;
            model.dofs.find_active_dofs(&model.domain);
            let number_of_equations = model
                .dofs
                .assign_equation_numbers_at_stage(&mut model.domain, stage);
            info!("  Stage {}: {} equations", stage, number_of_equations);

            let method = self
                .solution_methods
                .get_mut(stage - 1)
                .ok_or_else(|| eyre!("Load step {} has no solution method for stage {}", self.number, stage))?;
            method.compute_solution_for(stage, &self.boundary_conditions, &self.time, model)?;

            model
                .dofs
                .finalize_dof_primary_values_at_stage(&mut model.domain, stage);
            model.domain.finalize_cell_data_at(&self.time, stage)?;
            info!("  Stage {} done (time = {:.3} s)", stage, start.elapsed().as_secs_f64());
        }

        model.domain.perform_nodal_post_processing(&model.dofs);
        Ok(())
    }
}

/// Re-derives all constraints of a stage from the boundary conditions.
fn impose_constraints_at(
    stage: usize,
    boundary_conditions: &[BoundaryCondition],
    time: &TimeData,
    model: &mut AnalysisModel,
) -> eyre::Result<()> {
    model
        .domain
        .remove_all_cell_constraints(&mut model.dofs, stage)?;
    model.dofs.remove_all_dof_constraints(&mut model.domain);

    for condition in boundary_conditions {
        let numerics = model.numerics.numerics(condition.numerics)?;
        let cells = cells_of_region(model, &condition.boundary)?;
        for cell in cells {
            numerics.impose_constraint_at(cell, stage, condition, time, &mut model.domain, &mut model.dofs)?;
        }
    }

    model
        .dofs
        .impose_multi_freedom_constraints(&mut model.domain)
}

fn cells_of_region(model: &AnalysisModel, name: &str) -> eyre::Result<Vec<CellHandle>> {
    let label = model.domain.physical_entity_number_for(name)?;
    let dim = model.domain.dimension_of_physical_entity(label)?;
    Ok(model.domain.cells_with_label(dim, label).collect())
}

#[derive(Default)]
pub struct SolutionManager {
    pub initial_conditions: Vec<InitialCondition>,
    pub load_steps: Vec<LoadStep>,
}

impl SolutionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commence_solution(&mut self, model: &mut AnalysisModel) -> eyre::Result<()> {
        let start = Instant::now();
        let cells: Vec<CellHandle> = model.domain.cell_handles().collect();
        for cell in cells {
            for stage in 1..=model.domain.number_of_stages() {
                if let Some(numerics) = model.domain.numerics_for(cell, stage).cloned() {
                    numerics.set_dof_stages_at(cell, stage, &mut model.domain, &mut model.dofs)?;
                }
            }
        }
        info!("Assigned DOF stages in {:.3} s", start.elapsed().as_secs_f64());

        let start = Instant::now();
        self.impose_initial_conditions(model)?;
        info!("Imposed initial conditions in {:.3} s", start.elapsed().as_secs_f64());

        for load_step in &mut self.load_steps {
            load_step.solve_yourself(model)?;
        }
        Ok(())
    }

    fn impose_initial_conditions(&self, model: &mut AnalysisModel) -> eyre::Result<()> {
        for condition in &self.initial_conditions {
            let cells = cells_of_region(model, condition.domain())?;
            match condition {
                InitialCondition::NodalDof { dof, value, .. } => {
                    let mut is_initialized = vec![false; model.domain.nodes().len()];
                    for cell in cells {
                        let nodes = model.domain.nodes_of(cell).to_vec();
                        for node in nodes {
                            if is_initialized[node.0] {
                                continue;
                            }
                            let target = model.domain.nodal_dof(node, *dof).ok_or_else(|| {
                                eyre!("Initial condition refers to nodal DOF {}, which does not exist", dof)
                            })?;
                            let initial_value = value(model.domain.coordinates_of(node));
                            model.dofs.update_primary_variable_at(
                                &mut model.domain,
                                target,
                                initial_value,
                                ValueType::Converged,
                            );
                            is_initialized[node.0] = true;
                        }
                    }
                }
                InitialCondition::CellDof { domain, stage } => {
                    let label = model.domain.physical_entity_number_for(domain)?;
                    let numerics = model
                        .domain
                        .numerics_for_domain(label, *stage)
                        .cloned()
                        .ok_or_else(|| eyre!("No numerics assigned to '{}' at stage {}", domain, stage))?;
                    for cell in cells {
                        numerics.impose_initial_condition_at(cell, condition, &mut model.domain, &mut model.dofs)?;
                    }
                }
            }
        }
        Ok(())
    }
}
