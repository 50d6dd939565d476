//! Fringe records: resolved {receptor node, donor element} pairs.
//!
//! The coordinator rebuilds the fringe list from scratch every connectivity
//! update; records are plain values held in one vector, with no
//! cross-references and no individual lifetime management. A receptor node
//! id may arrive more than once (reconciliation can re-announce a node from
//! several sharing ranks); only its first occurrence produces a record.

use crate::data::dual_field::DualField;
use crate::element;
use crate::error::OversetError;
use crate::mesh::bulk::BulkMesh;
use crate::mesh::entity::{ElemId, NodeId};
use hashbrown::HashSet;

/// One resolved receptor: everything later interpolation needs.
#[derive(Clone, Debug)]
pub struct FringeInfo {
    pub receptor: NodeId,
    pub donor: ElemId,
    /// Receptor coordinates at solve time.
    pub coords: Vec<f64>,
    /// Natural coordinates of the receptor inside the donor.
    pub iso_coords: Vec<f64>,
    /// The donor is a ghost copy on this rank.
    pub elem_is_ghosted: bool,
    /// Nearest-point solve diagnostic; values beyond `1 + tol` are degraded.
    pub nearest_distance: f64,
}

/// Per-cycle diagnostics from fringe construction.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FringeStats {
    /// Records produced (after dedup).
    pub total: usize,
    /// Records whose solve distance exceeded the tolerance.
    pub degraded: usize,
}

/// Build fringe records for the paired receptor/donor id lists.
///
/// # Errors
/// `InvalidDonorElement` if a donor is not locally resident — the ghost set
/// upstream failed to make it available, which is never recoverable.
pub fn build_fringe_info<M: BulkMesh>(
    mesh: &M,
    coords_field: &DualField<f64>,
    receptor_ids: &[NodeId],
    donor_ids: &[ElemId],
    iso_tolerance: f64,
) -> Result<(Vec<FringeInfo>, FringeStats), OversetError> {
    debug_assert_eq!(receptor_ids.len(), donor_ids.len());
    let dim = mesh.spatial_dimension();
    let my_rank = mesh.parallel_rank();

    let mut records = Vec::new();
    let mut stats = FringeStats::default();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut elem_coords = Vec::new();

    for (&receptor, &donor) in receptor_ids.iter().zip(donor_ids) {
        // First occurrence wins; sharing ranks may all announce this node.
        if !seen.insert(receptor) {
            continue;
        }

        if !mesh.is_valid_element(donor) {
            return Err(OversetError::InvalidDonorElement { receptor, donor });
        }

        let coords = coords_field.host(receptor.get())?[..dim].to_vec();

        let donor_nodes = mesh.element_nodes(donor)?;
        let num_nodes = donor_nodes.len();
        elem_coords.resize(dim * num_nodes, 0.0);
        for (ni, node) in donor_nodes.iter().enumerate() {
            let xyz = coords_field.host(node.get())?;
            for j in 0..dim {
                elem_coords[j * num_nodes + ni] = xyz[j];
            }
        }

        let solve = element::is_in_element(dim, &elem_coords, num_nodes, &coords)?;
        if solve.distance > 1.0 + iso_tolerance {
            stats.degraded += 1;
        }

        records.push(FringeInfo {
            receptor,
            donor,
            coords,
            iso_coords: solve.coords,
            elem_is_ghosted: mesh.element_owner(donor)? != my_rank,
            nearest_distance: solve.distance,
        });
    }

    stats.total = records.len();
    Ok((records, stats))
}
