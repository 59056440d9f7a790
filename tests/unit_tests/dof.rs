use crate::{make_cell, two_quad_config, two_quads_with_config, numerics_manager_with, TestNumerics, LEFT};
use broomstyx::dense::Vector;
use broomstyx::dof::{DofHandle, DofInfo, DofManager, MultiFreedomConstraint, MultiFreedomConstraintRecord, ValueType};
use broomstyx::domain::{DomainManager, DomainSettings};
use broomstyx::error::{ConfigurationError, DofError};
use broomstyx::mesh::{CellHandle, GmshElementTable, NodeHandle};
use proptest::collection::vec;
use proptest::prelude::*;
use util::assert_approx_eq;

fn dof_info(tag: &str, dim: usize, group: usize) -> DofInfo {
    DofInfo {
        tag: tag.to_string(),
        dim,
        group,
        primary_field: 0,
        secondary_field: 0,
    }
}

/// A domain with `n` nodes on a line, each carrying a single nodal DOF.
fn nodes_on_a_line(n: usize) -> (DomainManager, DofManager) {
    let mut dofs = DofManager::new();
    dofs.read_nodal_dofs_from(&[dof_info("U", 0, 1)]);
    let mut domain = DomainManager::new(DomainSettings {
        number_of_stages: 2,
        fields_per_node: 1,
        fields_per_cell: 0,
    });
    for i in 0..n {
        domain
            .make_new_node_at(&dofs, &Vector::from([i as f64, 0.0]))
            .unwrap();
    }
    domain.count_nodes();
    (domain, dofs)
}

fn nodal(node: usize) -> DofHandle {
    DofHandle::Nodal {
        node: NodeHandle(node),
        slot: 0,
    }
}

#[test]
fn find_active_dofs_partitions_constrained_and_slave_dofs() {
    let (mut domain, mut dofs) = nodes_on_a_line(10);
    for i in 0..10 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }
    for i in 0..3 {
        dofs.put_dirichlet_constraint_on(&mut domain, nodal(i));
    }
    dofs.enslave(&mut domain, nodal(3), nodal(5)).unwrap();
    dofs.enslave(&mut domain, nodal(4), nodal(6)).unwrap();

    dofs.find_active_dofs(&domain);

    let expected_active: Vec<_> = (5..10).map(nodal).collect();
    let expected_inactive: Vec<_> = (0..5).map(nodal).collect();
    assert_eq!(dofs.active_dofs_at_stage(1), expected_active.as_slice());
    assert_eq!(dofs.inactive_dofs_at_stage(1), expected_inactive.as_slice());
    assert_eq!(dofs.number_of_active_dofs_at_stage(1), 5);
    assert_eq!(dofs.number_of_active_dofs_at_stage(2), 0);
    assert!(dofs.inactive_dofs_at_stage(2).is_empty());
    assert_eq!(dofs.number_of_active_dofs_at_stage(0), 0);
    assert_eq!(dofs.number_of_active_dofs_at_stage(7), 0);
}

#[test]
fn dofs_without_stage_are_ignored() {
    let (mut domain, mut dofs) = nodes_on_a_line(4);
    dofs.set_stage_for(&mut domain, nodal(1), 2).unwrap();
    dofs.put_dirichlet_constraint_on(&mut domain, nodal(2));

    dofs.find_active_dofs(&domain);

    assert!(dofs.active_dofs_at_stage(1).is_empty());
    assert!(dofs.inactive_dofs_at_stage(1).is_empty());
    assert_eq!(dofs.active_dofs_at_stage(2), &[nodal(1)]);
    assert!(dofs.inactive_dofs_at_stage(2).is_empty());
}

#[test]
fn partition_covers_every_configured_stage() {
    let (mut domain, mut dofs) = nodes_on_a_line(3);
    for i in 0..3 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }

    dofs.find_active_dofs(&domain);

    assert_eq!(dofs.number_of_partitioned_stages(), 2);
    assert_eq!(dofs.number_of_active_dofs_at_stage(1), 3);
    assert!(dofs.active_dofs_at_stage(2).is_empty());
    assert!(dofs.inactive_dofs_at_stage(2).is_empty());
}

#[test]
fn find_active_dofs_uses_the_counted_nodes() {
    let (mut domain, mut dofs) = nodes_on_a_line(3);
    for i in 0..3 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }
    domain.deactivate_node(NodeHandle(0));

    dofs.find_active_dofs(&domain);

    assert_eq!(domain.number_of_nodes(), 3);
    let expected: Vec<_> = (0..3).map(nodal).collect();
    assert_eq!(dofs.active_dofs_at_stage(1), expected.as_slice());
}

#[test]
fn active_dofs_are_ordered_nodes_then_cells_by_dimension_then_free_dofs() {
    let mut dofs = DofManager::new();
    dofs.read_nodal_dofs_from(&[dof_info("U", 0, 1)]);
    dofs.read_cell_dofs_from(&[dof_info("Q", 1, 2), dof_info("P", 2, 3)])
        .unwrap();
    let mut domain = DomainManager::default();
    domain.create_physical_entity(1, 1, "Edge").unwrap();
    domain.create_physical_entity(2, 2, "Face").unwrap();
    let free = dofs.create_numerics_dof_with_group(4);
    // Cells are created before the nodes, and faces before edges
    let face = domain
        .make_new_cell(&dofs, GmshElementTable::TRI3, 2)
        .unwrap();
    let edge = domain
        .make_new_cell(&dofs, GmshElementTable::LINE2, 1)
        .unwrap();
    let node = domain
        .make_new_node_at(&dofs, &Vector::from([0.0, 0.0, 0.0]))
        .unwrap();

    let handles = [
        free,
        DofHandle::Cell { cell: face, slot: 0 },
        DofHandle::Cell { cell: edge, slot: 0 },
        DofHandle::Nodal { node, slot: 0 },
    ];
    for handle in handles {
        dofs.set_stage_for(&mut domain, handle, 1).unwrap();
    }
    dofs.find_active_dofs(&domain);

    let expected: Vec<_> = handles.iter().rev().copied().collect();
    assert_eq!(dofs.active_dofs_at_stage(1), expected.as_slice());

    assert_eq!(dofs.assign_equation_numbers_at_stage(&mut domain, 1), 4);
    for (equation_number, &handle) in expected.iter().enumerate() {
        assert_eq!(dofs.equation_number_at(&domain, handle), Some(equation_number));
    }
    assert_eq!(dofs.group_number_for(&domain, free), 4);
    assert_eq!(dofs.group_number_for(&domain, DofHandle::Cell { cell: face, slot: 0 }), 3);
}

#[test]
fn slave_dofs_are_read_and_written_through_their_master() {
    let (mut domain, mut dofs) = nodes_on_a_line(3);
    for i in 0..3 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }
    dofs.enslave(&mut domain, nodal(0), nodal(2)).unwrap();
    dofs.find_active_dofs(&domain);
    dofs.assign_equation_numbers_at_stage(&mut domain, 1);

    assert_eq!(dofs.equation_number_at(&domain, nodal(0)), dofs.equation_number_at(&domain, nodal(2)));
    assert_eq!(dofs.equation_number_at(&domain, nodal(2)), Some(1));

    dofs.update_primary_variable_at(&mut domain, nodal(0), 3.0, ValueType::Current);
    assert_eq!(dofs.value_of_primary_variable_at(&domain, nodal(2), ValueType::Current), Ok(3.0));
    assert_eq!(dofs.value_of_primary_variable_at(&domain, nodal(0), ValueType::Current), Ok(3.0));

    // Secondary variables belong to the slave itself
    dofs.update_secondary_variable_at(&mut domain, nodal(0), 7.0);
    assert_eq!(dofs.dof(&domain, nodal(0)).secondary_variable(), 7.0);
    assert_eq!(dofs.dof(&domain, nodal(2)).secondary_variable(), 0.0);
}

#[test]
fn enslave_resolves_chains_and_rejects_cycles() {
    let (mut domain, mut dofs) = nodes_on_a_line(3);
    dofs.enslave(&mut domain, nodal(0), nodal(1)).unwrap();
    // Enslaving to a slave resolves to its master
    dofs.enslave(&mut domain, nodal(2), nodal(0)).unwrap();
    assert_eq!(dofs.dof(&domain, nodal(2)).master(), Some(nodal(1)));
    assert_eq!(dofs.resolve(&domain, nodal(2)), nodal(1));

    assert_eq!(
        dofs.enslave(&mut domain, nodal(1), nodal(2)),
        Err(DofError::CyclicConstraint {
            target: nodal(1),
            master: nodal(2),
        })
    );
    assert!(dofs
        .enslave(&mut domain, nodal(1), nodal(1))
        .is_err());
    assert!(!dofs.dof(&domain, nodal(1)).is_slave());
}

#[test]
fn converged_update_resets_correction_regardless_of_prior_state() {
    let (mut domain, mut dofs) = nodes_on_a_line(1);
    let dof = nodal(0);
    dofs.update_primary_variable_at(&mut domain, dof, 2.0, ValueType::Current);
    dofs.update_primary_variable_at(&mut domain, dof, 0.25, ValueType::Correction);
    assert_eq!(dofs.value_of_primary_variable_at(&domain, dof, ValueType::Correction), Ok(0.25));

    dofs.update_primary_variable_at(&mut domain, dof, -1.5, ValueType::Converged);
    assert_eq!(dofs.value_of_primary_variable_at(&domain, dof, ValueType::Current), Ok(-1.5));
    assert_eq!(dofs.value_of_primary_variable_at(&domain, dof, ValueType::Converged), Ok(-1.5));
    assert_eq!(dofs.value_of_primary_variable_at(&domain, dof, ValueType::Correction), Ok(0.0));
    assert_eq!(dofs.value_of_primary_variable_at(&domain, dof, ValueType::Incremental), Ok(0.0));
}

#[test]
fn replacement_correction_cannot_be_read() {
    let (mut domain, mut dofs) = nodes_on_a_line(1);
    let dof = nodal(0);
    dofs.update_primary_variable_at(&mut domain, dof, 1.0, ValueType::Correction);
    dofs.update_primary_variable_at(&mut domain, dof, 0.5, ValueType::ReplacementCorrection);
    assert_approx_eq!(
        dofs.value_of_primary_variable_at(&domain, dof, ValueType::Current)
            .unwrap(),
        0.5,
        abstol = 1e-14
    );
    assert_eq!(
        dofs.value_of_primary_variable_at(&domain, dof, ValueType::ReplacementCorrection),
        Err(DofError::UnreadableValueType(ValueType::ReplacementCorrection))
    );
}

#[test]
fn dirichlet_constraint_clears_equation_number_and_can_be_removed() {
    let (mut domain, mut dofs) = nodes_on_a_line(2);
    for i in 0..2 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }
    dofs.find_active_dofs(&domain);
    dofs.assign_equation_numbers_at_stage(&mut domain, 1);
    assert_eq!(dofs.equation_number_at(&domain, nodal(1)), Some(1));

    dofs.put_dirichlet_constraint_on(&mut domain, nodal(1));
    assert!(dofs.dof(&domain, nodal(1)).is_constrained());
    assert_eq!(dofs.equation_number_at(&domain, nodal(1)), None);

    dofs.remove_all_dof_constraints(&mut domain);
    assert!(!dofs.dof(&domain, nodal(1)).is_constrained());
    assert!(dofs.dof(&domain, nodal(1)).is_active());
    assert_eq!(dofs.equation_number_at(&domain, nodal(1)), None);
}

#[test]
fn stage_assignment_conflicts_are_rejected() {
    let (mut domain, mut dofs) = nodes_on_a_line(1);
    dofs.set_stage_for(&mut domain, nodal(0), 1).unwrap();
    // Repeating the same assignment is fine
    dofs.set_stage_for(&mut domain, nodal(0), 1).unwrap();
    assert_eq!(
        dofs.set_stage_for(&mut domain, nodal(0), 2),
        Err(DofError::StageConflict {
            dof: nodal(0),
            assigned: 1,
            requested: 2,
        })
    );
    assert_eq!(dofs.set_stage_for(&mut domain, nodal(0), 0), Err(DofError::InvalidStage(0)));
    assert_eq!(dofs.stage_of(&domain, nodal(0)), Some(1));
}

#[test]
fn finalization_only_touches_dofs_of_the_stage() {
    let (mut domain, mut dofs) = nodes_on_a_line(4);
    for i in 0..3 {
        dofs.set_stage_for(&mut domain, nodal(i), 1).unwrap();
    }
    dofs.set_stage_for(&mut domain, nodal(3), 2).unwrap();
    for i in 0..4 {
        dofs.update_primary_variable_at(&mut domain, nodal(i), i as f64 + 1.0, ValueType::Current);
    }
    // Writing to the slave changes the master, and the slave catches up at finalization
    dofs.enslave(&mut domain, nodal(0), nodal(2)).unwrap();
    dofs.update_primary_variable_at(&mut domain, nodal(0), 10.0, ValueType::Current);

    dofs.finalize_dof_primary_values_at_stage(&mut domain, 1);

    let converged = |domain: &DomainManager, i| dofs.dof(domain, nodal(i)).converged_value();
    assert_eq!(converged(&domain, 0), 10.0);
    assert_eq!(converged(&domain, 1), 2.0);
    assert_eq!(converged(&domain, 2), 10.0);
    assert_eq!(converged(&domain, 3), 0.0);
}

#[test]
fn converged_values_are_written_to_node_fields() {
    let mut dofs = DofManager::new();
    dofs.read_nodal_dofs_from(&[
        DofInfo {
            primary_field: 2,
            secondary_field: 1,
            ..dof_info("U", 0, 1)
        },
        dof_info("V", 0, 1),
    ]);
    let mut domain = DomainManager::new(DomainSettings {
        number_of_stages: 1,
        fields_per_node: 2,
        fields_per_cell: 0,
    });
    let node = domain
        .make_new_node_at(&dofs, &Vector::from([0.0, 0.0]))
        .unwrap();
    let u = DofHandle::Nodal { node, slot: 0 };
    dofs.update_primary_variable_at(&mut domain, u, 4.0, ValueType::Converged);
    dofs.update_primary_variable_at(&mut domain, u, 5.0, ValueType::Current);
    dofs.update_secondary_variable_at(&mut domain, u, -1.0);

    domain.perform_nodal_post_processing(&dofs);

    assert_eq!(domain.field_value_at(node, 0), 0.0);
    assert_eq!(domain.field_value_at(node, 1), -1.0);
    assert_eq!(domain.field_value_at(node, 2), 4.0);
}

#[test]
fn dof_schema_lookups() {
    let mut dofs = DofManager::new();
    dofs.read_nodal_dofs_from(&[dof_info("UX", 0, 1), dof_info("UY", 0, 1)]);
    dofs.read_cell_dofs_from(&[dof_info("T", 0, 2), dof_info("P", 3, 3)])
        .unwrap();

    assert_eq!(dofs.index_for_nodal_dof("UY"), Ok(1));
    assert_eq!(
        dofs.index_for_nodal_dof("UZ"),
        Err(ConfigurationError::UnknownNodalDof("UZ".to_string()))
    );
    assert_eq!(dofs.index_for_cell_dof("P"), Ok(0));
    assert_eq!(
        dofs.index_for_cell_dof("UX"),
        Err(ConfigurationError::UnknownCellDof("UX".to_string()))
    );
    assert_eq!(dofs.cell_dof_info(3), &[dof_info("P", 3, 3)]);

    assert_eq!(
        dofs.read_cell_dofs_from(&[dof_info("W", 4, 1)]),
        Err(ConfigurationError::InvalidCellDofDimension {
            tag: "W".to_string(),
            dim: 4,
        })
    );
}

fn slave_record(kind: &str, master_tag: &str, slave_tag: &str) -> MultiFreedomConstraintRecord {
    MultiFreedomConstraintRecord {
        kind: kind.to_string(),
        master_tag: master_tag.to_string(),
        master_dof: "UX".to_string(),
        slave_tag: slave_tag.to_string(),
        slave_dof: "UX".to_string(),
    }
}

#[test]
fn multi_freedom_constraint_records_are_decoded() {
    let mut dofs = DofManager::new();
    dofs.read_nodal_dofs_from(&[dof_info("UY", 0, 1), dof_info("UX", 0, 1)]);
    dofs.read_multi_freedom_constraints_from(&[slave_record("NodalDofSlaveConstraint", "Tip", "Left")])
        .unwrap();
    assert_eq!(
        dofs.multi_freedom_constraints(),
        &[MultiFreedomConstraint::NodalDofSlave {
            master_tag: "Tip".to_string(),
            master_dof: 1,
            slave_tag: "Left".to_string(),
            slave_dof: 1,
        }]
    );

    assert_eq!(
        dofs.read_multi_freedom_constraints_from(&[slave_record("PeriodicConstraint", "Tip", "Left")]),
        Err(ConfigurationError::UnknownConstraintType("PeriodicConstraint".to_string()))
    );
}

/// The two-quad mesh with an additional point cell in `Tip` at node 5.
fn two_quads_with_tip(master_tag: &str) -> (crate::TwoQuads, CellHandle) {
    let mut config = two_quad_config();
    config.physical_entities.push(broomstyx::domain::PhysicalEntity {
        dimension: 0,
        number: 4,
        name: "Tip".to_string(),
    });
    config
        .multi_freedom_constraints
        .push(slave_record("NodalDofSlaveConstraint", master_tag, "Left"));
    let mut mesh = two_quads_with_config(&config, numerics_manager_with(TestNumerics::default()));
    let tip = make_cell(&mut mesh.model, GmshElementTable::POINT, 4, &[5]);
    (mesh, tip)
}

#[test]
fn nodal_dof_slave_constraint_enslaves_all_slave_nodes() {
    let (mut mesh, _) = two_quads_with_tip("Tip");
    mesh.model.setup().unwrap();
    let domain = &mesh.model.domain;
    let dofs = &mesh.model.dofs;

    let master = DofHandle::Nodal {
        node: NodeHandle(5),
        slot: 0,
    };
    for &node in domain.nodes_of(mesh.left_edge) {
        let ux = DofHandle::Nodal { node, slot: 0 };
        let uy = DofHandle::Nodal { node, slot: 1 };
        assert_eq!(dofs.dof(domain, ux).master(), Some(master));
        assert!(!dofs.dof(domain, uy).is_slave());
    }
    assert!(!dofs.dof(domain, master).is_slave());
    assert_eq!(domain.cells_with_label(1, LEFT).count(), 1);
}

#[test]
fn slave_constraint_master_must_be_a_single_node() {
    let (mut mesh, _) = two_quads_with_tip("Interface");
    let error = mesh.model.setup().unwrap_err();
    assert_eq!(
        error.downcast_ref::<ConfigurationError>(),
        Some(&ConfigurationError::MultipleMasterNodes("Interface".to_string()))
    );
}

proptest! {
    #[test]
    fn active_and_inactive_dofs_partition_the_staged_dofs(
        flags in vec((0..3usize, any::<bool>()), 1..24)
    ) {
        let (mut domain, mut dofs) = nodes_on_a_line(flags.len());
        for (i, &(stage, constrained)) in flags.iter().enumerate() {
            if stage > 0 {
                dofs.set_stage_for(&mut domain, nodal(i), stage).unwrap();
            }
            if constrained {
                dofs.put_dirichlet_constraint_on(&mut domain, nodal(i));
            }
        }
        dofs.find_active_dofs(&domain);

        for stage in 1..=2 {
            let expected_active: Vec<_> = (0..flags.len())
                .filter(|&i| flags[i] == (stage, false))
                .map(nodal)
                .collect();
            let expected_inactive: Vec<_> = (0..flags.len())
                .filter(|&i| flags[i] == (stage, true))
                .map(nodal)
                .collect();
            prop_assert_eq!(dofs.active_dofs_at_stage(stage), expected_active.as_slice());
            prop_assert_eq!(dofs.inactive_dofs_at_stage(stage), expected_inactive.as_slice());
            prop_assert_eq!(
                dofs.assign_equation_numbers_at_stage(&mut domain, stage),
                expected_active.len()
            );
        }
    }
}
