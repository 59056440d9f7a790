//! Decoded analysis configuration.
//!
//! The textual input format is left to the application; any serde format can produce an
//! [`AnalysisConfig`].
use crate::dof::{DofInfo, MultiFreedomConstraintRecord};
use crate::domain::{DomainAssignment, DomainSettings, PhysicalEntity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub settings: DomainSettings,
    #[serde(default)]
    pub physical_entities: Vec<PhysicalEntity>,
    #[serde(default)]
    pub nodal_dofs: Vec<DofInfo>,
    #[serde(default)]
    pub cell_dofs: Vec<DofInfo>,
    #[serde(default)]
    pub multi_freedom_constraints: Vec<MultiFreedomConstraintRecord>,
    #[serde(default)]
    pub domain_assignments: Vec<DomainAssignment>,
}
