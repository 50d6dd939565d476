//! Connectivity coordinator: drives one full overset update cycle.
//!
//! The coordinator owns all per-cycle state — the blocks, the fringe list,
//! the paired receptor/donor id lists, the ghost request set, and the iblank
//! fields — and passes it by reference to every subcomponent; there is no
//! process-wide registry. A cycle runs:
//!
//! 1. reset transient state and host-sync geometry fields,
//! 2. per-block geometry refresh and registration with the search adapter,
//! 3. hole cutting / donor search in the adapter,
//! 4. iblank write-back and cross-rank classification reconciliation,
//! 5. ghost-region rebuild so every donor is locally resident,
//! 6. fringe record construction for later interpolation.
//!
//! Steps 4–6 are skipped entirely when running decoupled (each block solved
//! independently with adapter-side interpolation only).

use crate::comm::Communicator;
use crate::data::dual_field::DualField;
use crate::data::registry::{well_known, FieldHandle, FieldRegistry};
use crate::error::OversetError;
use crate::mesh::bulk::BulkMesh;
use crate::mesh::entity::{ElemId, NodeId};
use crate::mesh::status::NodeStatus;
use crate::overset::block::OversetBlock;
use crate::overset::config::OversetConfig;
use crate::overset::fringe::{build_fringe_info, FringeInfo};
use crate::overset::ghost::GhostManager;
use crate::overset::search::{decode_receptors, GeometrySearch};
use log::{info, warn};

/// Per-cycle operational diagnostics, reported once from rank 0.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectivityStats {
    /// Shared nodes whose classification disagreed across ranks.
    pub reconciliation_entities: usize,
    /// Receptor nodes across all ranks after this cycle.
    pub global_receptors: u64,
    /// Receptors whose isoparametric solve exceeded the tolerance.
    pub degraded_donors: usize,
}

/// Orchestrates connectivity updates and owns all overset cycle state.
#[derive(Clone, Debug)]
pub struct OversetConnectivity {
    config: OversetConfig,
    blocks: Vec<OversetBlock>,
    fringe: Vec<FringeInfo>,
    receptor_ids: Vec<NodeId>,
    donor_ids: Vec<ElemId>,
    elems_to_ghost: Vec<(ElemId, usize)>,
    hole_nodes: Vec<NodeId>,
    fringe_nodes: Vec<NodeId>,
    device_hole_nodes: Vec<NodeId>,
    device_fringe_nodes: Vec<NodeId>,
    ghosting: GhostManager,
    iblank: DualField<i32>,
    iblank_cell: DualField<i32>,
    coords: Option<FieldHandle>,
    dual_volume: Option<FieldHandle>,
    elem_volume: Option<FieldHandle>,
    nodal_resolution: Option<FieldHandle>,
    stats: ConnectivityStats,
}

impl OversetConnectivity {
    /// Build the coordinator and one block per configured mesh group.
    pub fn new(config: OversetConfig) -> Self {
        let blocks = config
            .mesh_groups
            .iter()
            .enumerate()
            .map(|(i, group)| OversetBlock::new(config.block_tag(i), group.clone()))
            .collect();
        Self {
            config,
            blocks,
            fringe: Vec::new(),
            receptor_ids: Vec::new(),
            donor_ids: Vec::new(),
            elems_to_ghost: Vec::new(),
            hole_nodes: Vec::new(),
            fringe_nodes: Vec::new(),
            device_hole_nodes: Vec::new(),
            device_fringe_nodes: Vec::new(),
            ghosting: GhostManager::new(),
            iblank: DualField::new("iblank", 1),
            iblank_cell: DualField::new("iblank_cell", 1),
            coords: None,
            dual_volume: None,
            elem_volume: None,
            nodal_resolution: None,
            stats: ConnectivityStats::default(),
        }
    }

    /// Resolve mesh parts, create the iblank fields, and register the
    /// geometry fields this subsystem consumes.
    pub fn setup<M: BulkMesh>(
        &mut self,
        mesh: &M,
        registry: &mut FieldRegistry,
    ) -> Result<(), OversetError> {
        if mesh.parallel_rank() == 0 {
            info!(
                "overset: using coordinates field `{}`",
                self.config.coordinates_field
            );
        }

        for block in &mut self.blocks {
            block.setup(mesh)?;
            block.initialize(mesh.spatial_dimension());
        }

        let node_keys: Vec<u64> = mesh.nodes().iter().map(|n| n.get()).collect();
        let elem_keys: Vec<u64> = mesh.elements().iter().map(|e| e.get()).collect();
        self.iblank = DualField::over_entities("iblank", 1, node_keys.iter().copied());
        self.iblank_cell =
            DualField::over_entities("iblank_cell", 1, elem_keys.iter().copied());

        let dim = mesh.spatial_dimension();
        let coords = registry.register_field(
            &self.config.coordinates_field,
            dim,
            node_keys.iter().copied(),
        )?;
        // Seed coordinates from the mesh on first setup.
        {
            let field = registry.get_mut(coords)?;
            for node in mesh.nodes() {
                let xyz = mesh.node_coordinates(node)?.to_vec();
                field.set_host(node.get(), &xyz)?;
            }
            field.modify_on_host();
        }
        self.coords = Some(coords);
        self.dual_volume = Some(registry.register_field(
            well_known::DUAL_NODAL_VOLUME,
            1,
            node_keys.iter().copied(),
        )?);
        self.nodal_resolution = Some(registry.register_field(
            well_known::NODAL_RESOLUTION,
            1,
            node_keys.iter().copied(),
        )?);
        self.elem_volume = Some(registry.register_field(
            well_known::ELEMENT_VOLUME,
            1,
            elem_keys.iter().copied(),
        )?);
        Ok(())
    }

    /// Forward adapter options and announce the block set.
    pub fn initialize<M: BulkMesh, S: GeometrySearch>(
        &mut self,
        mesh: &M,
        search: &mut S,
    ) -> Result<(), OversetError> {
        search.set_options(&self.config.search_options);
        if mesh.parallel_rank() == 0 {
            info!("overset: initialized {} mesh blocks", self.blocks.len());
        }
        Ok(())
    }

    /// Run one full connectivity-update cycle.
    ///
    /// # Errors
    /// `UnsupportedConfiguration` when fields are device-resident and a
    /// coupled (non-decoupled) solve is requested: the donor/receptor
    /// exchange requires host-resident data paths.
    pub fn execute<M, C, S>(
        &mut self,
        mesh: &mut M,
        comm: &C,
        search: &mut S,
        registry: &mut FieldRegistry,
        decoupled: bool,
    ) -> Result<(), OversetError>
    where
        M: BulkMesh,
        C: Communicator,
        S: GeometrySearch,
    {
        if self.config.device_resident && !decoupled {
            return Err(OversetError::UnsupportedConfiguration(
                "coupled overset connectivity is unavailable with device-resident fields"
                    .into(),
            ));
        }

        self.register_mesh(mesh, search, registry)?;

        search.profile()?;
        search.perform_connectivity()?;
        if self.config.search_options.reduce_fringes {
            search.reduce_fringes()?;
        }

        self.post_connectivity_work(mesh, comm, search, registry, decoupled)
    }

    /// Clear all transient per-cycle state. Idempotent: a second call before
    /// the next cycle leaves state unchanged.
    pub fn reset_data_structures(&mut self) {
        self.fringe.clear();
        self.receptor_ids.clear();
        self.donor_ids.clear();
        self.elems_to_ghost.clear();
        self.hole_nodes.clear();
        self.fringe_nodes.clear();
        self.device_hole_nodes.clear();
        self.device_fringe_nodes.clear();
        self.stats = ConnectivityStats::default();
    }

    fn register_mesh<M: BulkMesh, S: GeometrySearch>(
        &mut self,
        mesh: &M,
        search: &mut S,
        registry: &mut FieldRegistry,
    ) -> Result<(), OversetError> {
        self.reset_data_structures();
        self.pre_connectivity_sync(registry)?;

        let dim = mesh.spatial_dimension();
        let coords = self.coords_handle()?;
        let elem_volume = self.elem_volume_handle()?;
        let nodal_resolution = self.nodal_resolution_handle()?;

        for block in &mut self.blocks {
            block.update_coords(mesh, registry.get(coords)?)?;
            block.update_element_volumes(registry.get(elem_volume)?)?;
        }

        {
            let nodal = registry.get_mut(nodal_resolution)?;
            for block in &mut self.blocks {
                block.adjust_cell_resolutions(mesh, nodal)?;
            }
            // Multi-block nodes must see one consistent overlap resolution.
            mesh.parallel_max(nodal)?;
        }

        for block in &mut self.blocks {
            block.adjust_node_resolutions(registry.get(nodal_resolution)?)?;
            block.register_block(search, dim);
        }
        Ok(())
    }

    fn post_connectivity_work<M, C, S>(
        &mut self,
        mesh: &mut M,
        comm: &C,
        search: &mut S,
        registry: &mut FieldRegistry,
        decoupled: bool,
    ) -> Result<(), OversetError>
    where
        M: BulkMesh,
        C: Communicator,
        S: GeometrySearch,
    {
        let my_rank = mesh.parallel_rank();
        {
            let Self {
                blocks,
                iblank,
                iblank_cell,
                hole_nodes,
                fringe_nodes,
                elems_to_ghost,
                ..
            } = self;
            for block in blocks.iter() {
                block.update_iblanks(
                    search.node_iblank(block.tag())?,
                    iblank,
                    hole_nodes,
                    fringe_nodes,
                )?;
                block.update_iblank_cell(search.cell_iblank(block.tag())?, iblank_cell)?;
                if !decoupled {
                    block.get_donor_info(search, my_rank, elems_to_ghost)?;
                }
            }
        }

        // Shared copies must agree with the owner before reconciliation.
        mesh.copy_owned_to_shared(&mut self.iblank)?;
        self.post_connectivity_sync();

        if !decoupled {
            self.get_receptor_info(mesh, comm, search)?;
            self.update_ghosting(mesh, comm, registry)?;
            self.populate_fringe_info(mesh, comm, registry)?;
        }
        Ok(())
    }

    /// Decode the adapter's receptor array and reconcile classification
    /// disagreements across sharing ranks in a single synchronized exchange.
    fn get_receptor_info<M: BulkMesh, C: Communicator, S: GeometrySearch>(
        &mut self,
        mesh: &M,
        comm: &C,
        search: &S,
    ) -> Result<(), OversetError> {
        let my_rank = mesh.parallel_rank();
        let receptors = decode_receptors(&search.receptor_info())?;

        // Correction triples: (addressed rank, node id, donor id).
        let mut nodes_to_reset: Vec<u64> = Vec::new();

        for rec in receptors {
            let bidx = self.block_index(rec.mesh_tag)?;
            let node = self.blocks[bidx]
                .node_id_map()
                .get(rec.node_index)
                .copied()
                .ok_or_else(|| {
                    OversetError::SearchAdapter(format!(
                        "receptor node index {} out of range for block tag {}",
                        rec.node_index, rec.mesh_tag
                    ))
                })?;
            let donor = ElemId::new(rec.donor_id)?;

            if mesh.node_owner(node)? != my_rank {
                // Shared node marked fringe here; the owner must agree.
                let ibval = self.iblank.host(node.get())?[0];
                if NodeStatus::is_not_fringe(ibval) {
                    for &proc in mesh.shared_ranks(node)? {
                        if proc == my_rank {
                            continue;
                        }
                        nodes_to_reset.push(proc as u64);
                        nodes_to_reset.push(node.get());
                        nodes_to_reset.push(donor.get());
                    }
                }
            }

            self.donor_ids.push(donor);
            self.receptor_ids.push(node);
        }

        let counts = comm.all_gather_u32(nodes_to_reset.len() as u32)?;
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total == 0 {
            return Ok(());
        }

        self.stats.reconciliation_entities = total / 3;
        if comm.rank() == 0 {
            info!(
                "overset: detected fringe/field mismatch on {} entities",
                total / 3
            );
        }

        let all_entities = comm.all_gather_var_u64(&nodes_to_reset, &counts)?;
        let mut corrected_locally = false;
        for chunk in all_entities.chunks_exact(3) {
            let node_proc = chunk[0] as usize;
            let node = NodeId::new(chunk[1])?;
            let donor = ElemId::new(chunk[2])?;

            if node_proc == my_rank {
                self.receptor_ids.push(node);
                self.donor_ids.push(donor);
                // Restore the classification invariant on the addressed rank.
                self.iblank.host_mut(node.get())?[0] = NodeStatus::Fringe.iblank();
                self.fringe_nodes.push(node);
                corrected_locally = true;
            }

            // Owners of addressed donors must ghost them to the node's rank.
            if mesh.is_valid_element(donor)
                && mesh.element_owner(donor)? == my_rank
                && node_proc != my_rank
            {
                self.elems_to_ghost.push((donor, node_proc));
            }
        }

        if corrected_locally {
            self.iblank.modify_on_host();
            self.post_connectivity_sync();
        }
        Ok(())
    }

    fn update_ghosting<M: BulkMesh, C: Communicator>(
        &mut self,
        mesh: &mut M,
        comm: &C,
        registry: &mut FieldRegistry,
    ) -> Result<(), OversetError> {
        let coords = self.coords_handle()?;
        let coords_field = registry.get_mut(coords)?;
        self.ghosting
            .update_ghosting(mesh, comm, coords_field, &self.elems_to_ghost, &[])?;
        Ok(())
    }

    fn populate_fringe_info<M: BulkMesh, C: Communicator>(
        &mut self,
        mesh: &M,
        comm: &C,
        registry: &FieldRegistry,
    ) -> Result<(), OversetError> {
        debug_assert!(self.fringe.is_empty());
        let coords = registry.get(self.coords_handle()?)?;
        let (records, fringe_stats) = build_fringe_info(
            mesh,
            coords,
            &self.receptor_ids,
            &self.donor_ids,
            self.config.iso_distance_tolerance,
        )?;
        self.fringe = records;
        self.stats.degraded_donors = fringe_stats.degraded;
        if fringe_stats.degraded > 0 && comm.rank() == 0 {
            warn!(
                "overset: {} receptor(s) with isoparametric distance beyond tolerance",
                fringe_stats.degraded
            );
        }

        let local = [self.fringe.len() as u64];
        let mut global = [0u64];
        comm.all_reduce_sum_u64(&local, &mut global)?;
        self.stats.global_receptors = global[0];
        if comm.rank() == 0 {
            info!("overset: num receptor nodes = {}", global[0]);
        }
        Ok(())
    }

    /// Host-sync the geometry fields and seed the shared nodal resolution
    /// metric from the dual volume.
    fn pre_connectivity_sync(
        &mut self,
        registry: &mut FieldRegistry,
    ) -> Result<(), OversetError> {
        let coords = self.coords_handle()?;
        let dual_volume = self.dual_volume_handle()?;
        let elem_volume = self.elem_volume_handle()?;
        let nodal_resolution = self.nodal_resolution_handle()?;

        registry.get_mut(coords)?.sync_to_host();
        registry.get_mut(dual_volume)?.sync_to_host();
        registry.get_mut(elem_volume)?.sync_to_host();
        registry.copy_host_values(dual_volume, nodal_resolution)?;
        Ok(())
    }

    /// Push iblank fields to the device and rebuild the device-resident
    /// hole/fringe lists.
    fn post_connectivity_sync(&mut self) {
        self.iblank.modify_on_host();
        self.iblank.sync_to_device();
        self.iblank_cell.modify_on_host();
        self.iblank_cell.sync_to_device();
        self.device_hole_nodes = self.hole_nodes.clone();
        self.device_fringe_nodes = self.fringe_nodes.clone();
    }

    fn block_index(&self, tag: i32) -> Result<usize, OversetError> {
        let idx = tag - self.config.mesh_tag_offset - 1;
        if idx < 0 || idx as usize >= self.blocks.len() {
            return Err(OversetError::MissingBlock(tag));
        }
        Ok(idx as usize)
    }

    fn coords_handle(&self) -> Result<FieldHandle, OversetError> {
        self.coords
            .ok_or_else(|| OversetError::MissingField(self.config.coordinates_field.clone()))
    }

    fn dual_volume_handle(&self) -> Result<FieldHandle, OversetError> {
        self.dual_volume
            .ok_or_else(|| OversetError::MissingField(well_known::DUAL_NODAL_VOLUME.into()))
    }

    fn elem_volume_handle(&self) -> Result<FieldHandle, OversetError> {
        self.elem_volume
            .ok_or_else(|| OversetError::MissingField(well_known::ELEMENT_VOLUME.into()))
    }

    fn nodal_resolution_handle(&self) -> Result<FieldHandle, OversetError> {
        self.nodal_resolution
            .ok_or_else(|| OversetError::MissingField(well_known::NODAL_RESOLUTION.into()))
    }

    // --- accessors used by the solver driver and tests ---

    pub fn config(&self) -> &OversetConfig {
        &self.config
    }

    pub fn blocks(&self) -> &[OversetBlock] {
        &self.blocks
    }

    /// Fringe records from the most recent coupled cycle.
    pub fn fringe(&self) -> &[FringeInfo] {
        &self.fringe
    }

    pub fn hole_nodes(&self) -> &[NodeId] {
        &self.hole_nodes
    }

    pub fn fringe_nodes(&self) -> &[NodeId] {
        &self.fringe_nodes
    }

    /// Device-resident mirror of the hole list, rebuilt each cycle.
    pub fn device_hole_nodes(&self) -> &[NodeId] {
        &self.device_hole_nodes
    }

    /// Device-resident mirror of the fringe list, rebuilt each cycle.
    pub fn device_fringe_nodes(&self) -> &[NodeId] {
        &self.device_fringe_nodes
    }

    /// Ghost request set from the most recent cycle.
    pub fn elems_to_ghost(&self) -> &[(ElemId, usize)] {
        &self.elems_to_ghost
    }

    pub fn ghost_manager(&self) -> &GhostManager {
        &self.ghosting
    }

    pub fn iblank(&self) -> &DualField<i32> {
        &self.iblank
    }

    pub fn iblank_cell(&self) -> &DualField<i32> {
        &self.iblank_cell
    }

    pub fn stats(&self) -> &ConnectivityStats {
        &self.stats
    }
}
