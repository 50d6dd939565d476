//! Black-box interface to the external donor-search (hole-cutting) library.
//!
//! The search library receives per-block node/element data, performs hole
//! cutting and donor search, and reports results as raw arrays: per-block
//! iblank values indexed by local position, a flat receptor array, per-block
//! donor exports, and a data-update call that performs the actual
//! interpolation transfer on registered solution buffers.
//!
//! The receptor array encodes one quadruple per receptor node:
//! `[local node index, mesh tag, donor id low half, donor id high half]` —
//! the donor element's 64-bit global id split across two 32-bit entries,
//! reassembled here with a pod cast.

use crate::error::OversetError;
use crate::overset::config::SearchOptions;

/// Row-major layout flag for [`GeometrySearch::data_update`].
pub const ROW_MAJOR: i32 = 0;

/// Entries per receptor in the raw array.
pub const RECEPTOR_STRIDE: usize = 4;

/// Per-block mesh snapshot registered with the search library each cycle.
///
/// `coords` is interleaved per node (`x0 y0 z0 x1 ...`); `connectivity` holds
/// `nodes_per_elem` local node indices per element, in `element_ids` order.
#[derive(Clone, Debug, Default)]
pub struct BlockMeshInfo {
    pub tag: i32,
    pub dim: usize,
    pub coords: Vec<f64>,
    pub node_ids: Vec<u64>,
    pub node_resolutions: Vec<f64>,
    pub element_ids: Vec<u64>,
    pub cell_resolutions: Vec<f64>,
    pub nodes_per_elem: usize,
    pub connectivity: Vec<usize>,
}

/// A donor element on this rank that donates to a receptor owned elsewhere.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DonorExport {
    pub donor_elem: u64,
    pub receptor_rank: usize,
}

/// Decoded entry of the raw receptor array.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RawReceptor {
    /// Local node index within the block's registration arrays.
    pub node_index: usize,
    /// Mesh tag of the receptor's block.
    pub mesh_tag: i32,
    /// Global id of the donor element.
    pub donor_id: u64,
}

/// Decode the flat receptor array into typed records.
pub fn decode_receptors(raw: &[i32]) -> Result<Vec<RawReceptor>, OversetError> {
    if raw.len() % RECEPTOR_STRIDE != 0 {
        return Err(OversetError::SearchAdapter(format!(
            "receptor array length {} is not a multiple of {RECEPTOR_STRIDE}",
            raw.len()
        )));
    }
    let mut out = Vec::with_capacity(raw.len() / RECEPTOR_STRIDE);
    for chunk in raw.chunks_exact(RECEPTOR_STRIDE) {
        let halves = [chunk[2], chunk[3]];
        let donor_id: u64 = bytemuck::cast(halves);
        out.push(RawReceptor {
            node_index: chunk[0] as usize,
            mesh_tag: chunk[1],
            donor_id,
        });
    }
    Ok(out)
}

/// Encode one receptor quadruple (used by adapter implementations).
pub fn encode_receptor(out: &mut Vec<i32>, node_index: usize, mesh_tag: i32, donor_id: u64) {
    let halves: [i32; 2] = bytemuck::cast(donor_id);
    out.push(node_index as i32);
    out.push(mesh_tag);
    out.push(halves[0]);
    out.push(halves[1]);
}

/// Donor-search adapter interface.
///
/// `profile`, `perform_connectivity`, `reduce_fringes`, and `data_update` are
/// collective: every rank participating in the search must call them in the
/// same order.
pub trait GeometrySearch {
    /// Forward adapter options before initialization.
    fn set_options(&mut self, options: &SearchOptions);

    /// Register (or re-register) one block's mesh data for this cycle.
    fn register_block(&mut self, info: BlockMeshInfo);

    /// Recompute internal search structures after registration. Collective.
    fn profile(&mut self) -> Result<(), OversetError>;

    /// Perform hole cutting and donor search. Collective.
    fn perform_connectivity(&mut self) -> Result<(), OversetError>;

    /// Optionally trim redundant fringe layers. Collective.
    fn reduce_fringes(&mut self) -> Result<(), OversetError>;

    /// Node iblank values for a block, indexed like its registration arrays.
    fn node_iblank(&self, tag: i32) -> Result<&[i32], OversetError>;

    /// Cell iblank values for a block, indexed like its element arrays.
    fn cell_iblank(&self, tag: i32) -> Result<&[i32], OversetError>;

    /// Raw receptor array; see [`decode_receptors`] for the layout.
    fn receptor_info(&self) -> Vec<i32>;

    /// Donor elements of a block needed by receptors on other ranks.
    fn donor_info(&self, tag: i32) -> Result<Vec<DonorExport>, OversetError>;

    /// Hand over a block's packed solution buffer (`ncomp` values per node,
    /// row-major) for the next [`Self::data_update`].
    fn register_solution(
        &mut self,
        tag: i32,
        qsol: Vec<f64>,
        ncomp: usize,
    ) -> Result<(), OversetError>;

    /// Interpolate registered solution data from donors to receptors.
    /// Collective.
    fn data_update(&mut self, ncomp: usize, layout: i32) -> Result<(), OversetError>;

    /// Take back a block's solution buffer after [`Self::data_update`].
    fn retrieve_solution(&mut self, tag: i32) -> Result<Vec<f64>, OversetError>;
}
