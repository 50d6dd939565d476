//! Shared fixtures: a programmable search adapter, a scripted communicator
//! for injecting remote reconciliation payloads, and two-block mesh builders.

#![allow(dead_code)]

use hashbrown::HashMap;
use overset_mesh::error::OversetError;
use overset_mesh::mesh::bulk::InMemoryMesh;
use overset_mesh::overset::config::{MeshGroup, OversetConfig, SearchOptions};
use overset_mesh::overset::search::{
    decode_receptors, encode_receptor, BlockMeshInfo, DonorExport, GeometrySearch,
};
use overset_mesh::prelude::Communicator;

/// Programmable stand-in for the external donor-search library.
///
/// Iblank arrays, receptor quadruples, and donor exports are scripted by the
/// test; `data_update` performs a real interpolation pass, replacing each
/// receptor's solution entries with the average over its donor element's
/// nodes.
#[derive(Default)]
pub struct MockSearch {
    pub options: Option<SearchOptions>,
    blocks: HashMap<i32, BlockMeshInfo>,
    node_iblank: HashMap<i32, Vec<i32>>,
    cell_iblank: HashMap<i32, Vec<i32>>,
    receptors: Vec<i32>,
    donor_exports: HashMap<i32, Vec<DonorExport>>,
    solutions: HashMap<i32, Vec<f64>>,
    pub profile_calls: usize,
    pub connectivity_calls: usize,
    pub reduce_calls: usize,
    pub data_updates: usize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_node_iblank(&mut self, tag: i32, values: Vec<i32>) {
        self.node_iblank.insert(tag, values);
    }

    pub fn script_cell_iblank(&mut self, tag: i32, values: Vec<i32>) {
        self.cell_iblank.insert(tag, values);
    }

    pub fn script_receptor(&mut self, node_index: usize, mesh_tag: i32, donor_id: u64) {
        encode_receptor(&mut self.receptors, node_index, mesh_tag, donor_id);
    }

    pub fn script_donor_export(&mut self, tag: i32, donor_elem: u64, receptor_rank: usize) {
        self.donor_exports
            .entry(tag)
            .or_default()
            .push(DonorExport {
                donor_elem,
                receptor_rank,
            });
    }

    fn donor_block(&self, donor_id: u64) -> Option<(&BlockMeshInfo, usize)> {
        for info in self.blocks.values() {
            if let Some(e) = info.element_ids.iter().position(|&id| id == donor_id) {
                return Some((info, e));
            }
        }
        None
    }
}

impl GeometrySearch for MockSearch {
    fn set_options(&mut self, options: &SearchOptions) {
        self.options = Some(options.clone());
    }

    fn register_block(&mut self, info: BlockMeshInfo) {
        self.node_iblank
            .entry(info.tag)
            .or_insert_with(|| vec![1; info.node_ids.len()]);
        self.cell_iblank
            .entry(info.tag)
            .or_insert_with(|| vec![1; info.element_ids.len()]);
        self.blocks.insert(info.tag, info);
    }

    fn profile(&mut self) -> Result<(), OversetError> {
        self.profile_calls += 1;
        Ok(())
    }

    fn perform_connectivity(&mut self) -> Result<(), OversetError> {
        self.connectivity_calls += 1;
        Ok(())
    }

    fn reduce_fringes(&mut self) -> Result<(), OversetError> {
        self.reduce_calls += 1;
        Ok(())
    }

    fn node_iblank(&self, tag: i32) -> Result<&[i32], OversetError> {
        self.node_iblank
            .get(&tag)
            .map(Vec::as_slice)
            .ok_or(OversetError::MissingBlock(tag))
    }

    fn cell_iblank(&self, tag: i32) -> Result<&[i32], OversetError> {
        self.cell_iblank
            .get(&tag)
            .map(Vec::as_slice)
            .ok_or(OversetError::MissingBlock(tag))
    }

    fn receptor_info(&self) -> Vec<i32> {
        self.receptors.clone()
    }

    fn donor_info(&self, tag: i32) -> Result<Vec<DonorExport>, OversetError> {
        Ok(self.donor_exports.get(&tag).cloned().unwrap_or_default())
    }

    fn register_solution(
        &mut self,
        tag: i32,
        qsol: Vec<f64>,
        _ncomp: usize,
    ) -> Result<(), OversetError> {
        self.solutions.insert(tag, qsol);
        Ok(())
    }

    fn data_update(&mut self, ncomp: usize, _layout: i32) -> Result<(), OversetError> {
        self.data_updates += 1;
        // Average each receptor's donor-node values, then apply all writes so
        // a donor and receptor in the same block never alias mid-pass.
        let mut writes: Vec<(i32, usize, Vec<f64>)> = Vec::new();
        for rec in decode_receptors(&self.receptors)? {
            let (donor_info, e) = self.donor_block(rec.donor_id).ok_or_else(|| {
                OversetError::SearchAdapter(format!(
                    "donor element {} not registered with any block",
                    rec.donor_id
                ))
            })?;
            let donor_q = self
                .solutions
                .get(&donor_info.tag)
                .ok_or(OversetError::MissingBlock(donor_info.tag))?;
            let npe = donor_info.nodes_per_elem;
            let mut avg = vec![0.0; ncomp];
            for &local in &donor_info.connectivity[e * npe..(e + 1) * npe] {
                for c in 0..ncomp {
                    avg[c] += donor_q[local * ncomp + c];
                }
            }
            for v in &mut avg {
                *v /= npe as f64;
            }
            writes.push((rec.mesh_tag, rec.node_index, avg));
        }
        for (tag, node_index, avg) in writes {
            let q = self
                .solutions
                .get_mut(&tag)
                .ok_or(OversetError::MissingBlock(tag))?;
            q[node_index * ncomp..(node_index + 1) * ncomp].copy_from_slice(&avg);
        }
        Ok(())
    }

    fn retrieve_solution(&mut self, tag: i32) -> Result<Vec<f64>, OversetError> {
        self.solutions
            .remove(&tag)
            .ok_or(OversetError::MissingBlock(tag))
    }
}

/// Two-rank communicator driven from a single process: `injected` plays the
/// part of the other rank's reconciliation payload.
#[derive(Clone, Debug, Default)]
pub struct ScriptedComm {
    pub injected: Vec<u64>,
}

impl Communicator for ScriptedComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        2
    }

    fn all_reduce_sum_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), OversetError> {
        global.copy_from_slice(local);
        Ok(())
    }

    fn all_gather_u32(&self, local: u32) -> Result<Vec<u32>, OversetError> {
        Ok(vec![local, self.injected.len() as u32])
    }

    fn all_gather_var_u64(
        &self,
        local: &[u64],
        counts: &[u32],
    ) -> Result<Vec<u64>, OversetError> {
        if counts.len() != 2 || counts[0] as usize != local.len() {
            return Err(OversetError::CommError {
                neighbor: 1,
                source: format!("scripted allgatherv count mismatch: {counts:?}").into(),
            });
        }
        let mut out = local.to_vec();
        out.extend_from_slice(&self.injected);
        Ok(out)
    }
}

const HEX_OFFSETS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// Background unit hex (`bg`, nodes 1-8, element 100) plus a nested half-size
/// hex (`ov`, nodes 11-18, element 200) with its first corner at `origin`.
pub fn two_block_mesh(origin: f64) -> InMemoryMesh {
    let mut mesh = InMemoryMesh::new(3);
    for (i, c) in HEX_OFFSETS.iter().enumerate() {
        mesh.add_node(i as u64 + 1, c).unwrap();
    }
    mesh.add_element(100, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    mesh.assign_part("bg", &[1, 2, 3, 4, 5, 6, 7, 8], &[100])
        .unwrap();

    for (i, c) in HEX_OFFSETS.iter().enumerate() {
        let xyz = [
            origin + 0.5 * c[0],
            origin + 0.5 * c[1],
            origin + 0.5 * c[2],
        ];
        mesh.add_node(i as u64 + 11, &xyz).unwrap();
    }
    mesh.add_element(200, &[11, 12, 13, 14, 15, 16, 17, 18])
        .unwrap();
    mesh.assign_part("ov", &[11, 12, 13, 14, 15, 16, 17, 18], &[200])
        .unwrap();
    mesh
}

/// Configuration matching [`two_block_mesh`]: tags 1 (`bg`) and 2 (`ov`).
pub fn two_block_config() -> OversetConfig {
    OversetConfig::new(vec![
        MeshGroup {
            mesh_parts: vec!["bg".into()],
            ..Default::default()
        },
        MeshGroup {
            mesh_parts: vec!["ov".into()],
            ..Default::default()
        },
    ])
}
