//! The analysis context.
use crate::config::AnalysisConfig;
use crate::dof::DofManager;
use crate::domain::DomainManager;
use crate::error::{ConfigurationError, TopologyError};
use crate::mesh::{CellHandle, MeshReader, NodeHandle};
use crate::numerics::{MaterialManager, NumericsManager};
use broomstyx_dense::Vector;
use log::info;
use std::time::Instant;

/// Owns every manager taking part in an analysis.
///
/// The expected construction sequence is: create the nodes, count them, create the cells and
/// set their nodes by node id, and finally call [`AnalysisModel::setup`].
pub struct AnalysisModel {
    pub domain: DomainManager,
    pub dofs: DofManager,
    pub numerics: NumericsManager,
    pub materials: MaterialManager,
    pub mesh_reader: Box<dyn MeshReader>,
}

impl AnalysisModel {
    pub fn new(
        config: &AnalysisConfig,
        numerics: NumericsManager,
        materials: MaterialManager,
        mesh_reader: Box<dyn MeshReader>,
    ) -> Result<Self, ConfigurationError> {
        let fields_per_node = config.settings.fields_per_node;
        for info in &config.nodal_dofs {
            for field in [info.primary_field, info.secondary_field] {
                if field > fields_per_node {
                    return Err(ConfigurationError::InvalidFieldNumber {
                        tag: info.tag.clone(),
                        field,
                        fields_per_node,
                    });
                }
            }
        }

        let mut dofs = DofManager::new();
        dofs.read_nodal_dofs_from(&config.nodal_dofs);
        dofs.read_cell_dofs_from(&config.cell_dofs)?;
        dofs.read_multi_freedom_constraints_from(&config.multi_freedom_constraints)?;

        let mut domain = DomainManager::new(config.settings);
        for entity in &config.physical_entities {
            domain.create_physical_entity(entity.dimension, entity.number, entity.name.clone())?;
        }
        domain.read_domain_assignments_from(&config.domain_assignments, &numerics, &materials)?;

        Ok(Self {
            domain,
            dofs,
            numerics,
            materials,
            mesh_reader,
        })
    }

    pub fn make_new_node_at(&mut self, location: &Vector) -> Result<NodeHandle, TopologyError> {
        self.domain.make_new_node_at(&self.dofs, location)
    }

    pub fn make_new_cell(&mut self, element_type: usize, label: usize) -> Result<CellHandle, ConfigurationError> {
        self.domain.make_new_cell(&self.dofs, element_type, label)
    }

    /// Prepares a populated mesh for the solution.
    pub fn setup(&mut self) -> eyre::Result<()> {
        let start = Instant::now();
        self.domain.count_nodes();
        self.domain.count_cells();
        self.domain.find_cell_attachments(self.mesh_reader.as_ref())?;
        self.domain.initialize_numerics_at_cells()?;
        self.domain.initialize_materials_at_cells()?;
        self.dofs.impose_multi_freedom_constraints(&mut self.domain)?;
        self.domain.report_status();
        info!("Completed analysis setup in {:.3} s", start.elapsed().as_secs_f64());
        Ok(())
    }
}
