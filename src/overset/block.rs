//! One overset mesh block: the bridge between a group of mesh parts and the
//! external search library's per-block arrays.
//!
//! A block owns the local-index ↔ global-id maps for its nodes and elements,
//! snapshot arrays of coordinates and resolutions that are refreshed every
//! connectivity update, and the pack/unpack routines for solution transfer.
//! Index order is ascending global id, fixed at `setup` and reused by every
//! array handed to the adapter.

use crate::data::dual_field::DualField;
use crate::data::registry::{FieldRegistry, OversetFieldData};
use crate::error::OversetError;
use crate::mesh::bulk::BulkMesh;
use crate::mesh::entity::{ElemId, NodeId};
use crate::mesh::status::NodeStatus;
use crate::overset::config::MeshGroup;
use crate::overset::search::{BlockMeshInfo, GeometrySearch};
use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

/// Resolution multiplier applied near overset boundaries so the hole cutter
/// treats those cells as mandatory receptors.
const RESOLUTION_AMPLIFICATION: f64 = 1.0e10;

/// A logical partition of the global mesh registered with the search library
/// under a unique positive tag.
#[derive(Clone, Debug)]
pub struct OversetBlock {
    tag: i32,
    group: MeshGroup,
    node_ids: Vec<NodeId>,
    node_index: HashMap<NodeId, usize>,
    elem_ids: Vec<ElemId>,
    nodes_per_elem: usize,
    connectivity: Vec<usize>,
    coords: Vec<f64>,
    elem_volumes: Vec<f64>,
    cell_res: Vec<f64>,
    node_res: Vec<f64>,
}

impl OversetBlock {
    pub fn new(tag: i32, group: MeshGroup) -> Self {
        Self {
            tag,
            group,
            node_ids: Vec::new(),
            node_index: HashMap::new(),
            elem_ids: Vec::new(),
            nodes_per_elem: 0,
            connectivity: Vec::new(),
            coords: Vec::new(),
            elem_volumes: Vec::new(),
            cell_res: Vec::new(),
            node_res: Vec::new(),
        }
    }

    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Local search index → global node id.
    pub fn node_id_map(&self) -> &[NodeId] {
        &self.node_ids
    }

    pub fn element_ids(&self) -> &[ElemId] {
        &self.elem_ids
    }

    /// Resolve the block's parts into id maps and local connectivity.
    pub fn setup<M: BulkMesh>(&mut self, mesh: &M) -> Result<(), OversetError> {
        let mut nodes = Vec::new();
        let mut elems = Vec::new();
        for part in &self.group.mesh_parts {
            nodes.extend(mesh.part_nodes(part)?);
            elems.extend(mesh.part_elements(part)?);
        }
        self.node_ids = nodes.into_iter().sorted_unstable().dedup().collect();
        self.elem_ids = elems.into_iter().sorted_unstable().dedup().collect();
        self.node_index = self
            .node_ids
            .iter()
            .enumerate()
            .map(|(i, &n)| (n, i))
            .collect();

        self.connectivity.clear();
        self.nodes_per_elem = 0;
        for &elem in &self.elem_ids {
            let enodes = mesh.element_nodes(elem)?;
            if self.nodes_per_elem == 0 {
                self.nodes_per_elem = enodes.len();
            } else if enodes.len() != self.nodes_per_elem {
                return Err(OversetError::InvalidGeometry(format!(
                    "block {}: mixed element topologies ({} vs {} nodes)",
                    self.tag,
                    enodes.len(),
                    self.nodes_per_elem
                )));
            }
            for node in enodes {
                let idx = self
                    .node_index
                    .get(node)
                    .copied()
                    .ok_or(OversetError::MissingNode(*node))?;
                self.connectivity.push(idx);
            }
        }
        Ok(())
    }

    /// Size the per-cycle snapshot arrays.
    pub fn initialize(&mut self, dim: usize) {
        self.coords = vec![0.0; self.node_ids.len() * dim];
        self.elem_volumes = vec![0.0; self.elem_ids.len()];
        self.cell_res = vec![0.0; self.elem_ids.len()];
        self.node_res = vec![0.0; self.node_ids.len()];
    }

    /// Refresh the coordinate snapshot from the host view of the coordinates
    /// field.
    pub fn update_coords<M: BulkMesh>(
        &mut self,
        mesh: &M,
        coords_field: &DualField<f64>,
    ) -> Result<(), OversetError> {
        let dim = mesh.spatial_dimension();
        for (i, &node) in self.node_ids.iter().enumerate() {
            let xyz = coords_field.host(node.get())?;
            self.coords[i * dim..(i + 1) * dim].copy_from_slice(&xyz[..dim]);
        }
        Ok(())
    }

    /// Refresh element volumes from the host view of the volume field.
    pub fn update_element_volumes(
        &mut self,
        elem_volume: &DualField<f64>,
    ) -> Result<(), OversetError> {
        for (e, &elem) in self.elem_ids.iter().enumerate() {
            self.elem_volumes[e] = elem_volume.host(elem.get())?[0];
        }
        Ok(())
    }

    /// Seed cell resolutions from element volumes, amplifying cells adjacent
    /// to overset boundary parts so they become mandatory receptors, and push
    /// the amplified values into the shared nodal resolution field.
    pub fn adjust_cell_resolutions<M: BulkMesh>(
        &mut self,
        mesh: &M,
        nodal_res: &mut DualField<f64>,
    ) -> Result<(), OversetError> {
        let mut bc_nodes: HashSet<NodeId> = HashSet::new();
        for part in self.group.ovset_parts.iter().chain(&self.group.wall_parts) {
            bc_nodes.extend(mesh.part_nodes(part)?);
        }

        self.cell_res.copy_from_slice(&self.elem_volumes);
        for (e, &elem) in self.elem_ids.iter().enumerate() {
            let enodes = mesh.element_nodes(elem)?;
            if enodes.iter().any(|n| bc_nodes.contains(n)) {
                self.cell_res[e] *= RESOLUTION_AMPLIFICATION;
                for node in enodes {
                    let value = &mut nodal_res.host_mut(node.get())?[0];
                    *value = value.max(self.cell_res[e]);
                }
            }
        }
        nodal_res.modify_on_host();
        Ok(())
    }

    /// Pull the max-reduced nodal resolution field back into the snapshot.
    pub fn adjust_node_resolutions(
        &mut self,
        nodal_res: &DualField<f64>,
    ) -> Result<(), OversetError> {
        for (i, &node) in self.node_ids.iter().enumerate() {
            self.node_res[i] = nodal_res.host(node.get())?[0];
        }
        Ok(())
    }

    /// Register this cycle's snapshot with the search adapter.
    pub fn register_block<S: GeometrySearch>(&self, search: &mut S, dim: usize) {
        search.register_block(BlockMeshInfo {
            tag: self.tag,
            dim,
            coords: self.coords.clone(),
            node_ids: self.node_ids.iter().map(|n| n.get()).collect(),
            node_resolutions: self.node_res.clone(),
            element_ids: self.elem_ids.iter().map(|e| e.get()).collect(),
            cell_resolutions: self.cell_res.clone(),
            nodes_per_elem: self.nodes_per_elem,
            connectivity: self.connectivity.clone(),
        });
    }

    /// Write the adapter's node iblank values into the mesh field and collect
    /// hole/fringe node lists.
    pub fn update_iblanks(
        &self,
        iblank_values: &[i32],
        iblank: &mut DualField<i32>,
        holes: &mut Vec<NodeId>,
        fringes: &mut Vec<NodeId>,
    ) -> Result<(), OversetError> {
        if iblank_values.len() != self.node_ids.len() {
            return Err(OversetError::SearchAdapter(format!(
                "block {}: iblank array has {} entries for {} nodes",
                self.tag,
                iblank_values.len(),
                self.node_ids.len()
            )));
        }
        for (i, &node) in self.node_ids.iter().enumerate() {
            let value = iblank_values[i];
            iblank.host_mut(node.get())?[0] = value;
            match NodeStatus::from_iblank(value) {
                NodeStatus::Hole => holes.push(node),
                NodeStatus::Fringe => fringes.push(node),
                NodeStatus::Field => {}
            }
        }
        iblank.modify_on_host();
        Ok(())
    }

    /// Write the adapter's cell iblank values into the mesh field.
    pub fn update_iblank_cell(
        &self,
        iblank_values: &[i32],
        iblank_cell: &mut DualField<i32>,
    ) -> Result<(), OversetError> {
        if iblank_values.len() != self.elem_ids.len() {
            return Err(OversetError::SearchAdapter(format!(
                "block {}: cell iblank array has {} entries for {} elements",
                self.tag,
                iblank_values.len(),
                self.elem_ids.len()
            )));
        }
        for (e, &elem) in self.elem_ids.iter().enumerate() {
            iblank_cell.host_mut(elem.get())?[0] = iblank_values[e];
        }
        iblank_cell.modify_on_host();
        Ok(())
    }

    /// Queue ghost requests for donor elements needed by receptors owned on
    /// other ranks.
    pub fn get_donor_info<S: GeometrySearch>(
        &self,
        search: &S,
        my_rank: usize,
        ghost_requests: &mut Vec<(ElemId, usize)>,
    ) -> Result<(), OversetError> {
        for export in search.donor_info(self.tag)? {
            if export.receptor_rank != my_rank {
                ghost_requests.push((ElemId::new(export.donor_elem)?, export.receptor_rank));
            }
        }
        Ok(())
    }

    /// Pack host field values into the adapter's row-major solution buffer:
    /// `ncomp` values per node, fields in descriptor order.
    pub fn register_solution(
        &self,
        registry: &FieldRegistry,
        fields: &[OversetFieldData],
        ncomp: usize,
    ) -> Result<Vec<f64>, OversetError> {
        let mut qsol = Vec::with_capacity(self.node_ids.len() * ncomp);
        for &node in &self.node_ids {
            for desc in fields {
                let field = registry.get(desc.field)?;
                let values = field.host(node.get())?;
                if values.len() != desc.components() {
                    return Err(OversetError::FieldSizeMismatch {
                        field: field.name().to_string(),
                        expected: desc.components(),
                        found: values.len(),
                    });
                }
                qsol.extend_from_slice(values);
            }
        }
        Ok(qsol)
    }

    /// Unpack the adapter's updated solution buffer back into host field
    /// storage. The adapter only alters receptor entries; everything else is
    /// written back unchanged.
    pub fn update_solution(
        &self,
        registry: &mut FieldRegistry,
        fields: &[OversetFieldData],
        qsol: &[f64],
        ncomp: usize,
    ) -> Result<(), OversetError> {
        let total: usize = fields.iter().map(|d| d.components()).sum();
        if total != ncomp {
            return Err(OversetError::FieldSizeMismatch {
                field: format!("block {} solution batch", self.tag),
                expected: ncomp,
                found: total,
            });
        }
        if qsol.len() != self.node_ids.len() * ncomp {
            return Err(OversetError::SearchAdapter(format!(
                "block {}: solution buffer has {} values for {} nodes x {ncomp} components",
                self.tag,
                qsol.len(),
                self.node_ids.len()
            )));
        }
        for (i, &node) in self.node_ids.iter().enumerate() {
            let mut offset = i * ncomp;
            for desc in fields {
                let field = registry.get_mut(desc.field)?;
                if field.components() != desc.components() {
                    return Err(OversetError::FieldSizeMismatch {
                        field: field.name().to_string(),
                        expected: desc.components(),
                        found: field.components(),
                    });
                }
                let values = field.host_mut(node.get())?;
                values.copy_from_slice(&qsol[offset..offset + desc.components()]);
                offset += desc.components();
            }
        }
        Ok(())
    }
}
