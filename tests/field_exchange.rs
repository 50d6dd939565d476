//! Batched donor-to-receptor transfer through the scripted search adapter.

mod support;

use overset_mesh::mesh::bulk::BulkMesh;
use overset_mesh::overset::coordinator::OversetConnectivity;
use overset_mesh::prelude::*;
use support::{two_block_config, two_block_mesh, MockSearch};

/// Run one coupled cycle so the adapter has registered blocks and a scripted
/// receptor (nested-block node 11 donated to by background element 100).
fn resolved_cycle() -> (
    OversetConnectivity,
    MockSearch,
    FieldRegistry,
) {
    let mut mesh = two_block_mesh(0.25);
    let mut registry = FieldRegistry::new();
    let mut search = MockSearch::new();
    search.script_node_iblank(2, vec![-1, 1, 1, 1, 1, 1, 1, 1]);
    search.script_receptor(0, 2, 100);
    let mut conn = OversetConnectivity::new(two_block_config());

    conn.setup(&mesh, &mut registry).unwrap();
    conn.execute(&mut mesh, &NoComm, &mut search, &mut registry, false)
        .unwrap();
    (conn, search, registry)
}

fn all_node_ids(mesh: &overset_mesh::mesh::bulk::InMemoryMesh) -> Vec<u64> {
    BulkMesh::nodes(mesh).iter().map(|n| n.get()).collect()
}

#[test]
fn constant_field_survives_interpolation() {
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    let h = registry
        .register_field("pressure", 1, all_node_ids(&mesh))
        .unwrap();
    for id in all_node_ids(&mesh) {
        registry.get_mut(h).unwrap().set_host(id, &[5.0]).unwrap();
    }

    let fields = [OversetFieldData::new(h, 1, 1)];
    conn.overset_update_fields(&mut search, &mut registry, &fields)
        .unwrap();

    let field = registry.get(h).unwrap();
    for (_, values) in field.host_iter() {
        assert_eq!(values, &[5.0]);
    }
    assert_eq!(field.sync_state(), SyncState::Synchronized);
    assert_eq!(search.data_updates, 1);
}

#[test]
fn receptor_receives_donor_average() {
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    // Background node values equal their ids; nested block starts at zero.
    let h = registry
        .register_field("scalar", 1, all_node_ids(&mesh))
        .unwrap();
    for id in 1..=8u64 {
        registry
            .get_mut(h)
            .unwrap()
            .set_host(id, &[id as f64])
            .unwrap();
    }

    let fields = [OversetFieldData::new(h, 1, 1)];
    conn.overset_update_fields(&mut search, &mut registry, &fields)
        .unwrap();

    let field = registry.get(h).unwrap();
    // Receptor node 11 takes the mean over donor element 100's nodes.
    assert_eq!(field.host(11).unwrap(), &[4.5]);
    // Non-receptor entries come back untouched.
    assert_eq!(field.host(3).unwrap(), &[3.0]);
    assert_eq!(field.host(12).unwrap(), &[0.0]);
}

#[test]
fn batched_fields_share_one_adapter_round() {
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    let ids = all_node_ids(&mesh);
    let p = registry.register_field("pressure", 1, ids.clone()).unwrap();
    let v = registry.register_field("velocity", 3, ids.clone()).unwrap();
    for &id in &ids {
        registry.get_mut(p).unwrap().set_host(id, &[2.0]).unwrap();
        registry
            .get_mut(v)
            .unwrap()
            .set_host(id, &[1.0, 1.0, 1.0])
            .unwrap();
    }

    let fields = [
        OversetFieldData::new(p, 1, 1),
        OversetFieldData::new(v, 3, 1),
    ];
    conn.overset_update_fields(&mut search, &mut registry, &fields)
        .unwrap();

    // Four components per node, one collective round.
    assert_eq!(search.data_updates, 1);
    assert_eq!(registry.get(p).unwrap().host(11).unwrap(), &[2.0]);
    assert_eq!(registry.get(v).unwrap().host(11).unwrap(), &[1.0, 1.0, 1.0]);
}

#[test]
fn single_field_update_defers_device_sync_when_asked() {
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    let h = registry
        .register_field("temperature", 1, all_node_ids(&mesh))
        .unwrap();

    conn.overset_update_field(&mut search, &mut registry, h, 1, 1, false)
        .unwrap();
    assert_eq!(
        registry.get(h).unwrap().sync_state(),
        SyncState::HostModified
    );

    conn.overset_update_field(&mut search, &mut registry, h, 1, 1, true)
        .unwrap();
    assert_eq!(
        registry.get(h).unwrap().sync_state(),
        SyncState::Synchronized
    );
}

#[test]
fn split_update_rejects_mismatched_descriptors() {
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    let h = registry
        .register_field("momentum", 3, all_node_ids(&mesh))
        .unwrap();

    let register_fields = [OversetFieldData::new(h, 3, 1)];
    let ncomp = conn
        .register_solution(&mut search, &mut registry, &register_fields)
        .unwrap();
    assert_eq!(ncomp, 3);

    // Unpacking with a descriptor that disagrees with the packed component
    // count must error instead of corrupting field storage.
    let wrong_fields = [OversetFieldData::new(h, 1, 1)];
    let err = conn
        .update_solution(&mut search, &mut registry, &wrong_fields, ncomp)
        .unwrap_err();
    assert!(matches!(err, overset_mesh::OversetError::FieldSizeMismatch { .. }));
}

#[test]
fn empty_field_batch_is_a_noop() {
    let (conn, mut search, mut registry) = resolved_cycle();
    conn.overset_update_fields(&mut search, &mut registry, &[])
        .unwrap();
    assert_eq!(search.data_updates, 0);
}

#[test]
fn device_values_used_after_host_sync() {
    // Values written on the device are what the transfer must see.
    let (conn, mut search, mut registry) = resolved_cycle();
    let mesh = two_block_mesh(0.25);
    let h = registry
        .register_field("density", 1, all_node_ids(&mesh))
        .unwrap();
    {
        let field = registry.get_mut(h).unwrap();
        for id in 1..=8u64 {
            field.device_mut(id).unwrap()[0] = 7.0;
        }
        field.modify_on_device();
    }

    let fields = [OversetFieldData::new(h, 1, 1)];
    conn.overset_update_fields(&mut search, &mut registry, &fields)
        .unwrap();
    assert_eq!(registry.get(h).unwrap().host(11).unwrap(), &[7.0]);
}
