use crate::{two_quads, TestNumerics, BODY, INTERFACE};
use broomstyx::dense::proptest::vector;
use broomstyx::dense::Vector;
use broomstyx::dof::DofManager;
use broomstyx::domain::{DomainManager, DomainSettings};
use broomstyx::error::{ConfigurationError, TopologyError};
use broomstyx::mesh::{CellHandle, GmshElementTable, NodeHandle};
use broomstyx::numerics::{Material, Numerics};
use broomstyx::solution::TimeData;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn node_coordinates_are_padded_to_three_dimensions() {
    let dofs = DofManager::new();
    let mut domain = DomainManager::default();

    let planar = domain
        .make_new_node_at(&dofs, &Vector::from([1.0, 2.0]))
        .unwrap();
    let spatial = domain
        .make_new_node_at(&dofs, &Vector::from([1.0, 2.0, 3.0]))
        .unwrap();
    assert_eq!(domain.coordinates_of(planar), &Vector::from([1.0, 2.0, 0.0]));
    assert_eq!(domain.coordinates_of(spatial), &Vector::from([1.0, 2.0, 3.0]));

    assert_eq!(
        domain.make_new_node_at(&dofs, &Vector::from([1.0])),
        Err(TopologyError::InvalidCoordinateDimension(1))
    );
    assert_eq!(
        domain.set_coordinates_of(planar, &Vector::zeros(4)),
        Err(TopologyError::InvalidCoordinateDimension(4))
    );
    domain
        .set_coordinates_of(planar, &Vector::from([5.0, 6.0]))
        .unwrap();
    assert_eq!(domain.coordinates_of(planar), &Vector::from([5.0, 6.0, 0.0]));
    assert_eq!(domain.nodes().len(), 2);
}

proptest! {
    #[test]
    fn planar_nodes_lie_in_the_xy_plane(location in vector(2)) {
        let dofs = DofManager::new();
        let mut domain = DomainManager::default();
        let node = domain.make_new_node_at(&dofs, &location).unwrap();
        let coordinates = domain.coordinates_of(node);
        prop_assert_eq!(coordinates.dim(), 3);
        prop_assert_eq!(&coordinates.as_slice()[..2], location.as_slice());
        prop_assert_eq!(coordinates[2], 0.0);
    }
}

#[test]
fn count_nodes_skips_inactive_nodes() {
    let dofs = DofManager::new();
    let mut domain = DomainManager::default();
    let nodes: Vec<NodeHandle> = (0..3)
        .map(|i| {
            domain
                .make_new_node_at(&dofs, &Vector::from([i as f64, 0.0]))
                .unwrap()
        })
        .collect();
    domain.deactivate_node(nodes[1]);
    domain.count_nodes();

    assert_eq!(domain.number_of_nodes(), 2);
    assert_eq!(domain.node_by_handle(nodes[0]).id(), Some(0));
    assert_eq!(domain.node_by_handle(nodes[1]).id(), None);
    assert_eq!(domain.node_by_handle(nodes[2]).id(), Some(1));
    assert_eq!(domain.node_handle(1), Some(nodes[2]));
    assert!(domain.node(2).is_none());
}

#[test]
fn cell_ids_increase_across_dimensions() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    domain.count_cells();

    // Lines are counted before quads, regardless of creation order
    assert_eq!(domain.cell(mesh.interface).id(), Some(0));
    assert_eq!(domain.cell(mesh.left_edge).id(), Some(1));
    assert_eq!(domain.cell(mesh.left).id(), Some(2));
    assert_eq!(domain.cell(mesh.right).id(), Some(3));
    assert_eq!(domain.cell_handle(3), Some(mesh.right));
    assert!(domain.cell_by_id(4).is_none());
    assert_eq!(domain.number_of_cells_with_dimension(1), 2);
    assert_eq!(domain.number_of_cells_with_dimension(3), 0);
    assert_eq!(domain.cell_handles().count(), 4);
}

#[test]
fn cells_take_dimension_and_dofs_from_their_physical_entity() {
    let mesh = two_quads(TestNumerics::default());
    let domain = &mesh.model.domain;

    assert_eq!(mesh.left, CellHandle::new(2, 0));
    assert_eq!(domain.label_of(mesh.left), BODY);
    assert_eq!(domain.element_type_of(mesh.left), GmshElementTable::QUAD4);
    assert_eq!(domain.cell(mesh.left).dofs().len(), 1);
    assert_eq!(domain.cell(mesh.interface).dofs().len(), 0);
    assert!(domain.cell_dof(mesh.left, 0).is_some());
    assert!(domain.cell_dof(mesh.left, 1).is_none());
    assert_eq!(domain.cell(mesh.left).cell_data, Vector::zeros(1));

    let mut domain = DomainManager::default();
    assert_eq!(
        domain
            .make_new_cell(&DofManager::new(), GmshElementTable::LINE2, 42)
            .unwrap_err(),
        ConfigurationError::UnknownPhysicalEntityNumber(42)
    );
}

#[test]
fn set_nodes_of_updates_node_attachments() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    // Nodes of the fixture are created in id order
    let node = NodeHandle;

    assert!(domain
        .cells_attached_to(node(1), 1)
        .contains(&mesh.interface));
    domain.set_nodes_of(mesh.interface, &[4, 5]).unwrap();
    assert!(!domain
        .cells_attached_to(node(1), 1)
        .contains(&mesh.interface));
    assert!(domain
        .cells_attached_to(node(4), 1)
        .contains(&mesh.interface));
    assert_eq!(domain.nodes_of(mesh.interface), &[node(4), node(5)]);

    assert_eq!(
        domain.set_nodes_of(mesh.interface, &[4, 17]),
        Err(TopologyError::UnknownNode(17))
    );
    // A failed update leaves the cell untouched
    assert_eq!(domain.nodes_of(mesh.interface), &[node(4), node(5)]);
}

#[test]
fn reorder_nodes_of_applies_permutation() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    let before = domain.nodes_of(mesh.left).to_vec();

    domain.reorder_nodes_of(mesh.left, &[2, 0, 3, 1]).unwrap();
    assert_eq!(
        domain.nodes_of(mesh.left),
        &[before[2], before[0], before[3], before[1]]
    );

    assert_eq!(
        domain.reorder_nodes_of(mesh.left, &[0, 1, 2]),
        Err(TopologyError::PermutationLengthMismatch { expected: 4, found: 3 })
    );
    assert_eq!(
        domain.reorder_nodes_of(mesh.left, &[0, 1, 2, 4]),
        Err(TopologyError::InvalidPermutationIndex { index: 4, len: 4 })
    );
}

#[test]
fn reorder_nodes_of_rejects_repeated_indices_without_modifying_the_cell() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    let before = domain.nodes_of(mesh.left).to_vec();

    assert_eq!(
        domain.reorder_nodes_of(mesh.left, &[0, 0, 1, 2]),
        Err(TopologyError::DuplicatePermutationIndex(0))
    );
    assert_eq!(
        domain.reorder_nodes_of(mesh.left, &[3, 1, 2, 1]),
        Err(TopologyError::DuplicatePermutationIndex(1))
    );
    assert_eq!(domain.nodes_of(mesh.left), before.as_slice());
}

#[test]
fn field_zero_reads_as_zero_and_ignores_writes() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    let node = NodeHandle(2);

    domain.set_field_value_at(node, 2, 3.5);
    domain.set_field_value_at(node, 0, 9.0);
    assert_eq!(domain.field_value_at(node, 0), 0.0);
    assert_eq!(domain.field_value_at(node, 1), 0.0);
    assert_eq!(domain.field_value_at(node, 2), 3.5);
}

#[test]
fn physical_entity_lookups() {
    let mut domain = DomainManager::default();
    domain.create_physical_entity(2, 7, "Plate").unwrap();
    domain.create_physical_entity(1, 3, "Rim").unwrap();

    assert_eq!(domain.number_of_physical_names(), 2);
    assert_eq!(domain.physical_entity(1).map(|entity| entity.number), Some(3));
    assert_eq!(domain.physical_entity_number_for("Plate"), Ok(7));
    assert_eq!(domain.name_of_physical_entity(3), Ok("Rim"));
    assert_eq!(domain.dimension_of_physical_entity(7), Ok(2));
    assert_eq!(
        domain.physical_entity_number_for("Hole"),
        Err(ConfigurationError::UnknownPhysicalEntity("Hole".to_string()))
    );
    assert_eq!(
        domain.create_physical_entity(0, 7, "Pin"),
        Err(ConfigurationError::DuplicatePhysicalEntity(7))
    );
    assert_eq!(
        domain.create_physical_entity(4, 8, "Hyper"),
        Err(ConfigurationError::InvalidPhysicalEntityDimension {
            name: "Hyper".to_string(),
            dim: 4,
        })
    );
}

struct Steel;

impl Material for Steel {
    fn name(&self) -> &str {
        "Steel"
    }
}

/// Numerics that requires two materials.
struct TwoMaterialNumerics;

impl Numerics for TwoMaterialNumerics {
    fn name(&self) -> &str {
        "TwoMaterialNumerics"
    }

    fn required_number_of_materials(&self) -> usize {
        2
    }

    fn initialize_numerics_at(&self, _cell: &mut broomstyx::mesh::Cell) -> eyre::Result<()> {
        Ok(())
    }

    fn finalize_data_at(&self, _cell: &mut broomstyx::mesh::Cell, _time: &TimeData) -> eyre::Result<()> {
        Ok(())
    }
}

fn two_stage_domain() -> DomainManager {
    let mut domain = DomainManager::new(DomainSettings {
        number_of_stages: 2,
        ..DomainSettings::default()
    });
    domain.create_physical_entity(2, 1, "Body").unwrap();
    domain.create_physical_entity(1, 2, "Boundary").unwrap();
    domain
}

#[test]
fn numerics_assignments_per_stage() {
    let mut domain = two_stage_domain();
    let numerics: Arc<dyn Numerics> = Arc::new(TestNumerics::default());
    domain
        .assign_numerics_to_domain(2, "Body", numerics.clone(), Vec::new())
        .unwrap();

    assert!(domain.numerics_for_domain(1, 1).is_none());
    assert_eq!(
        domain
            .numerics_for_domain(1, 2)
            .map(|numerics| numerics.name()),
        Some("TestNumerics")
    );
    assert!(domain.numerics_for_domain(2, 2).is_none());
    assert!(domain.numerics_for_domain(1, 3).is_none());

    assert_eq!(
        domain.assign_numerics_to_domain(2, "Body", numerics.clone(), Vec::new()),
        Err(ConfigurationError::DuplicateNumerics {
            domain: "Body".to_string(),
            stage: 2,
        })
    );
    for stage in [0, 3] {
        assert_eq!(
            domain.assign_numerics_to_domain(stage, "Body", numerics.clone(), Vec::new()),
            Err(ConfigurationError::InvalidStage {
                stage,
                number_of_stages: 2,
            })
        );
    }
    assert_eq!(
        domain.assign_numerics_to_domain(1, "Nowhere", numerics, Vec::new()),
        Err(ConfigurationError::UnknownPhysicalEntity("Nowhere".to_string()))
    );
}

#[test]
fn material_sets_must_match_numerics() {
    let mut domain = two_stage_domain();
    let numerics: Arc<dyn Numerics> = Arc::new(TwoMaterialNumerics);
    let steel: Arc<dyn Material> = Arc::new(Steel);

    assert_eq!(
        domain.assign_numerics_to_domain(1, "Body", numerics.clone(), vec![steel.clone()]),
        Err(ConfigurationError::MaterialCountMismatch {
            domain: "Body".to_string(),
            expected: 2,
            found: 1,
        })
    );
    domain
        .assign_numerics_to_domain(1, "Body", numerics, vec![steel.clone(), steel])
        .unwrap();

    let materials = domain.material_set_for_domain(1, 1).unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials[0].name(), "Steel");
    assert_eq!(
        domain.material_set_for_domain(1, 2).err(),
        Some(ConfigurationError::MissingMaterialSet {
            domain: "Body".to_string(),
            stage: 2,
        })
    );
}

#[test]
fn cells_are_grouped_by_partition() {
    let mut mesh = two_quads(TestNumerics::default());
    let domain = &mut mesh.model.domain;
    domain.set_partition_of(mesh.right, 2);
    domain.set_partition_of(mesh.interface, 2);
    domain.form_domain_partitions();

    assert_eq!(domain.number_of_partitions(), 3);
    assert_eq!(domain.cells_in_partition(0), &[mesh.left_edge, mesh.left]);
    assert!(domain.cells_in_partition(1).is_empty());
    assert_eq!(domain.cells_in_partition(2), &[mesh.interface, mesh.right]);
    assert!(domain.cells_in_partition(3).is_empty());
    assert_eq!(domain.cell(mesh.right).partition(), 2);
}

#[test]
fn cells_with_label_selects_cells_of_a_region() {
    let mesh = two_quads(TestNumerics::default());
    let domain = &mesh.model.domain;
    let body: Vec<_> = domain.cells_with_label(2, BODY).collect();
    let interface: Vec<_> = domain.cells_with_label(1, INTERFACE).collect();
    assert_eq!(body, vec![mesh.left, mesh.right]);
    assert_eq!(interface, vec![mesh.interface]);
    assert_eq!(domain.nodal_dofs_of(mesh.interface, 1).len(), 2);
    assert!(domain.nodal_dofs_of(mesh.interface, 2).is_empty());
}
