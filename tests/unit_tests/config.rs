use crate::{numerics_manager_with, two_quad_config, TestNumerics};
use broomstyx::config::AnalysisConfig;
use broomstyx::domain::DomainSettings;
use broomstyx::error::ConfigurationError;
use broomstyx::mesh::GmshElementTable;
use broomstyx::model::AnalysisModel;
use broomstyx::numerics::{MaterialManager, NumericsManager};

fn build_model(config: &AnalysisConfig, numerics: NumericsManager) -> Result<AnalysisModel, ConfigurationError> {
    AnalysisModel::new(
        config,
        numerics,
        MaterialManager::default(),
        Box::new(GmshElementTable::new()),
    )
}

#[test]
fn configuration_is_decoded_with_defaults() {
    let config = two_quad_config();
    assert_eq!(
        config.settings,
        DomainSettings {
            number_of_stages: 1,
            fields_per_node: 2,
            fields_per_cell: 1,
        }
    );
    assert_eq!(config.physical_entities.len(), 3);
    assert_eq!(config.nodal_dofs[1].tag, "UY");
    assert_eq!(config.nodal_dofs[1].dim, 0);
    assert_eq!(config.nodal_dofs[1].primary_field, 2);
    assert_eq!(config.nodal_dofs[1].secondary_field, 0);
    assert_eq!(config.cell_dofs[0].dim, 2);
    assert!(config.multi_freedom_constraints.is_empty());
    assert!(config.domain_assignments[0].material_set.is_empty());

    let empty: AnalysisConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, AnalysisConfig::default());
    assert_eq!(empty.settings.number_of_stages, 1);
}

#[test]
fn model_is_built_from_configuration() {
    let model = build_model(&two_quad_config(), numerics_manager_with(TestNumerics::default())).unwrap();
    assert_eq!(model.domain.number_of_physical_names(), 3);
    assert_eq!(model.dofs.nodal_dof_info().len(), 2);
    assert_eq!(model.dofs.cell_dof_info(2).len(), 1);
    assert!(model.domain.numerics_for_domain(1, 1).is_some());
    assert!(model.domain.numerics_for_domain(2, 1).is_none());
}

#[test]
fn nodal_dof_fields_must_exist_at_nodes() {
    let mut config = two_quad_config();
    config.nodal_dofs[0].secondary_field = 3;
    let error = build_model(&config, numerics_manager_with(TestNumerics::default())).err();
    assert_eq!(
        error,
        Some(ConfigurationError::InvalidFieldNumber {
            tag: "UX".to_string(),
            field: 3,
            fields_per_node: 2,
        })
    );
}

#[test]
fn assignments_must_refer_to_defined_numerics() {
    let error = build_model(&two_quad_config(), NumericsManager::default()).err();
    assert_eq!(error, Some(ConfigurationError::UnknownNumerics(1)));
}

#[test]
fn assignments_must_refer_to_defined_materials() {
    let mut config = two_quad_config();
    config.domain_assignments[0].material_set = vec![5];
    let error = build_model(&config, numerics_manager_with(TestNumerics::default())).err();
    assert_eq!(error, Some(ConfigurationError::UnknownMaterial(5)));
}
