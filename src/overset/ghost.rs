//! Maintenance of the single named overset ghost region.
//!
//! Every cycle the coordinator collects `(donor element, destination rank)`
//! requests; this module reduces the request counts globally, skips the
//! rebuild entirely when nothing changed anywhere, and otherwise replaces the
//! region membership in one bracketed modification followed by coordinate
//! propagation so every rank can interpolate locally.

use crate::comm::Communicator;
use crate::data::dual_field::DualField;
use crate::error::OversetError;
use crate::mesh::bulk::BulkMesh;
use crate::mesh::entity::ElemId;
use log::info;

/// Name of the persistent ghost region owned by this subsystem.
pub const GHOSTING_NAME: &str = "overset_ghosting";

/// Owner of the overset ghost region's lifecycle.
#[derive(Clone, Debug, Default)]
pub struct GhostManager {
    active: bool,
    last_global_count: u64,
}

impl GhostManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a ghost region has been created in some cycle.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Global element count of the most recent rebuild.
    pub fn last_global_count(&self) -> u64 {
        self.last_global_count
    }

    /// Rebuild the ghost region from this cycle's requests. Collective: every
    /// rank must call this each cycle, with an empty request list if it has
    /// no local work.
    ///
    /// Returns `true` if the region was recreated, `false` for the no-op
    /// path.
    pub fn update_ghosting<M: BulkMesh, C: Communicator>(
        &mut self,
        mesh: &mut M,
        comm: &C,
        coords: &mut DualField<f64>,
        adds: &[(ElemId, usize)],
        removals: &[(ElemId, usize)],
    ) -> Result<bool, OversetError> {
        let local = [adds.len() as u64, removals.len() as u64];
        let mut global = [0u64; 2];
        comm.all_reduce_sum_u64(&local, &mut global)?;

        let changed = global[0] > 0 || global[1] > 0;
        if changed {
            for &(elem, dest) in adds {
                if !mesh.is_valid_element(elem) {
                    return Err(OversetError::GhostingProtocol(format!(
                        "donor element {elem} requested for rank {dest} is not locally valid"
                    )));
                }
            }
            mesh.replace_ghosting(GHOSTING_NAME, adds)?;
            self.active = true;
            self.last_global_count = global[0];
            if comm.rank() == 0 {
                info!("overset: ghosting {} elements this cycle", global[0]);
            }
        } else if comm.rank() == 0 {
            info!("overset: ghosting unchanged for this cycle");
        }

        // Newly ghosted elements need coordinates before any interpolation.
        if self.active {
            mesh.communicate_field_data(GHOSTING_NAME, coords)?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::mesh::bulk::InMemoryMesh;

    fn hex_mesh() -> (InMemoryMesh, ElemId) {
        let mut mesh = InMemoryMesh::new(3);
        let corners = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        for (i, c) in corners.iter().enumerate() {
            mesh.add_node(i as u64 + 1, c).unwrap();
        }
        let elem = mesh.add_element(10, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        (mesh, elem)
    }

    fn coords_field(mesh: &InMemoryMesh) -> DualField<f64> {
        DualField::over_entities(
            "coordinates",
            3,
            BulkMesh::nodes(mesh).iter().map(|n| n.get()),
        )
    }

    #[test]
    fn empty_request_set_skips_recreation() {
        let (mut mesh, _) = hex_mesh();
        let mut coords = coords_field(&mesh);
        let mut ghosting = GhostManager::new();
        let changed = ghosting
            .update_ghosting(&mut mesh, &NoComm, &mut coords, &[], &[])
            .unwrap();
        assert!(!changed);
        assert!(!ghosting.is_active());
        assert_eq!(mesh.modification_count(), 0);
    }

    #[test]
    fn requests_rebuild_membership_once() {
        let (mut mesh, elem) = hex_mesh();
        let mut coords = coords_field(&mesh);
        let mut ghosting = GhostManager::new();
        let changed = ghosting
            .update_ghosting(&mut mesh, &NoComm, &mut coords, &[(elem, 1)], &[])
            .unwrap();
        assert!(changed);
        assert_eq!(mesh.ghosting_members(GHOSTING_NAME), &[(elem, 1)]);
        assert_eq!(ghosting.last_global_count(), 1);

        // Second cycle with no requests: membership untouched, no rebuild.
        let changed = ghosting
            .update_ghosting(&mut mesh, &NoComm, &mut coords, &[], &[])
            .unwrap();
        assert!(!changed);
        assert_eq!(mesh.modification_count(), 1);
    }

    #[test]
    fn invalid_donor_is_protocol_fatal() {
        let (mut mesh, _) = hex_mesh();
        let mut coords = coords_field(&mesh);
        let mut ghosting = GhostManager::new();
        let bogus = ElemId::new(999).unwrap();
        let err = ghosting
            .update_ghosting(&mut mesh, &NoComm, &mut coords, &[(bogus, 1)], &[])
            .unwrap_err();
        assert!(matches!(err, OversetError::GhostingProtocol(_)));
    }
}
