//! Bulk-data interface consumed by the overset subsystem.
//!
//! The real distributed mesh lives outside this crate; connectivity code only
//! needs the narrow surface captured by [`BulkMesh`]: entity lookup by global
//! id, ownership and sharing queries, element connectivity, and the collective
//! ghosting transaction. [`InMemoryMesh`] is a concrete implementation backing
//! serial runs and tests, in the same spirit as pairing a trait with an
//! in-memory reference implementation elsewhere in this crate.

use crate::data::dual_field::DualField;
use crate::error::OversetError;
use crate::mesh::entity::{ElemId, NodeId};
use hashbrown::HashMap;

/// Read/modify surface of the external mesh and its parallel bulk data.
///
/// All methods returning ownership or sharing information refer to the
/// calling rank's view. `replace_ghosting` is a collective: every rank must
/// call it in the same cycle even with an empty request list.
pub trait BulkMesh {
    fn spatial_dimension(&self) -> usize;
    fn parallel_rank(&self) -> usize;
    fn parallel_size(&self) -> usize;

    /// True if the node is locally resident (owned, shared, or ghosted).
    fn is_valid_node(&self, node: NodeId) -> bool;
    /// True if the element is locally resident (owned or ghosted).
    fn is_valid_element(&self, elem: ElemId) -> bool;

    fn node_owner(&self, node: NodeId) -> Result<usize, OversetError>;
    fn element_owner(&self, elem: ElemId) -> Result<usize, OversetError>;

    /// Ranks other than the calling rank that share this node.
    fn shared_ranks(&self, node: NodeId) -> Result<&[usize], OversetError>;

    fn element_nodes(&self, elem: ElemId) -> Result<&[NodeId], OversetError>;
    fn node_coordinates(&self, node: NodeId) -> Result<&[f64], OversetError>;

    /// Locally resident nodes of a named mesh part, in ascending id order.
    fn part_nodes(&self, part: &str) -> Result<Vec<NodeId>, OversetError>;
    /// Locally resident elements of a named mesh part, in ascending id order.
    fn part_elements(&self, part: &str) -> Result<Vec<ElemId>, OversetError>;

    /// All locally resident nodes, in ascending id order.
    fn nodes(&self) -> Vec<NodeId>;
    /// All locally resident elements, in ascending id order.
    fn elements(&self) -> Vec<ElemId>;

    /// Atomically replace the membership of the named ghost region.
    ///
    /// Destroys the previous region (if any) and recreates it with `adds` in
    /// a single bracketed modification; partial states are never observable.
    /// Collective.
    fn replace_ghosting(
        &mut self,
        name: &str,
        adds: &[(ElemId, usize)],
    ) -> Result<(), OversetError>;

    /// Current membership of the named ghost region (empty if absent).
    fn ghosting_members(&self, name: &str) -> &[(ElemId, usize)];

    /// Propagate owned values of `field` to all shared copies. Collective.
    fn copy_owned_to_shared<V: Clone>(
        &self,
        field: &mut DualField<V>,
    ) -> Result<(), OversetError>;

    /// Take the max of `field` over all sharing ranks at shared nodes.
    /// Collective.
    fn parallel_max(&self, field: &mut DualField<f64>) -> Result<(), OversetError>;

    /// Propagate `field` to entities ghosted through the named region.
    /// Collective.
    fn communicate_field_data<V: Clone>(
        &self,
        ghosting: &str,
        field: &mut DualField<V>,
    ) -> Result<(), OversetError>;
}

#[derive(Clone, Debug)]
struct NodeData {
    coords: Vec<f64>,
    owner: usize,
    shared: Vec<usize>,
}

#[derive(Clone, Debug)]
struct ElemData {
    nodes: Vec<NodeId>,
    owner: usize,
}

#[derive(Clone, Debug, Default)]
struct PartData {
    nodes: Vec<NodeId>,
    elements: Vec<ElemId>,
}

/// In-memory mesh for serial runs and tests.
///
/// Rank and size may be faked to exercise the distributed code paths on a
/// single process; the collective field operations are then identity
/// operations, since one process holds every copy.
#[derive(Clone, Debug)]
pub struct InMemoryMesh {
    dim: usize,
    rank: usize,
    size: usize,
    nodes: HashMap<NodeId, NodeData>,
    elements: HashMap<ElemId, ElemData>,
    parts: HashMap<String, PartData>,
    ghostings: HashMap<String, Vec<(ElemId, usize)>>,
    modification_count: usize,
}

impl InMemoryMesh {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            rank: 0,
            size: 1,
            nodes: HashMap::new(),
            elements: HashMap::new(),
            parts: HashMap::new(),
            ghostings: HashMap::new(),
            modification_count: 0,
        }
    }

    /// Fake the parallel decomposition seen by connectivity code.
    pub fn set_parallel(&mut self, rank: usize, size: usize) {
        self.rank = rank;
        self.size = size;
    }

    /// Insert a node owned by the calling rank with no sharing.
    pub fn add_node(&mut self, id: u64, coords: &[f64]) -> Result<NodeId, OversetError> {
        let rank = self.rank;
        self.add_shared_node(id, coords, rank, &[])
    }

    /// Insert a node with explicit owner and sharing ranks.
    pub fn add_shared_node(
        &mut self,
        id: u64,
        coords: &[f64],
        owner: usize,
        shared: &[usize],
    ) -> Result<NodeId, OversetError> {
        if coords.len() != self.dim {
            return Err(OversetError::InvalidGeometry(format!(
                "node {id}: expected {} coordinates, got {}",
                self.dim,
                coords.len()
            )));
        }
        let node = NodeId::new(id)?;
        self.nodes.insert(
            node,
            NodeData {
                coords: coords.to_vec(),
                owner,
                shared: shared.to_vec(),
            },
        );
        Ok(node)
    }

    /// Insert an element owned by the calling rank.
    pub fn add_element(&mut self, id: u64, node_ids: &[u64]) -> Result<ElemId, OversetError> {
        let rank = self.rank;
        self.add_element_owned(id, node_ids, rank)
    }

    /// Insert an element with an explicit owning rank.
    pub fn add_element_owned(
        &mut self,
        id: u64,
        node_ids: &[u64],
        owner: usize,
    ) -> Result<ElemId, OversetError> {
        let elem = ElemId::new(id)?;
        let mut nodes = Vec::with_capacity(node_ids.len());
        for &nid in node_ids {
            let node = NodeId::new(nid)?;
            if !self.nodes.contains_key(&node) {
                return Err(OversetError::MissingNode(node));
            }
            nodes.push(node);
        }
        self.elements.insert(elem, ElemData { nodes, owner });
        Ok(elem)
    }

    /// Assign nodes and elements to a named part (entities must exist).
    pub fn assign_part(
        &mut self,
        name: &str,
        node_ids: &[u64],
        elem_ids: &[u64],
    ) -> Result<(), OversetError> {
        let mut part = PartData::default();
        for &nid in node_ids {
            let node = NodeId::new(nid)?;
            if !self.nodes.contains_key(&node) {
                return Err(OversetError::MissingNode(node));
            }
            part.nodes.push(node);
        }
        for &eid in elem_ids {
            let elem = ElemId::new(eid)?;
            if !self.elements.contains_key(&elem) {
                return Err(OversetError::MissingElement(elem));
            }
            part.elements.push(elem);
        }
        part.nodes.sort_unstable();
        part.elements.sort_unstable();
        self.parts.insert(name.to_string(), part);
        Ok(())
    }

    /// Number of ghosting modification transactions performed so far.
    pub fn modification_count(&self) -> usize {
        self.modification_count
    }
}

impl BulkMesh for InMemoryMesh {
    fn spatial_dimension(&self) -> usize {
        self.dim
    }

    fn parallel_rank(&self) -> usize {
        self.rank
    }

    fn parallel_size(&self) -> usize {
        self.size
    }

    fn is_valid_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn is_valid_element(&self, elem: ElemId) -> bool {
        self.elements.contains_key(&elem)
    }

    fn node_owner(&self, node: NodeId) -> Result<usize, OversetError> {
        self.nodes
            .get(&node)
            .map(|n| n.owner)
            .ok_or(OversetError::MissingNode(node))
    }

    fn element_owner(&self, elem: ElemId) -> Result<usize, OversetError> {
        self.elements
            .get(&elem)
            .map(|e| e.owner)
            .ok_or(OversetError::MissingElement(elem))
    }

    fn shared_ranks(&self, node: NodeId) -> Result<&[usize], OversetError> {
        self.nodes
            .get(&node)
            .map(|n| n.shared.as_slice())
            .ok_or(OversetError::MissingNode(node))
    }

    fn element_nodes(&self, elem: ElemId) -> Result<&[NodeId], OversetError> {
        self.elements
            .get(&elem)
            .map(|e| e.nodes.as_slice())
            .ok_or(OversetError::MissingElement(elem))
    }

    fn node_coordinates(&self, node: NodeId) -> Result<&[f64], OversetError> {
        self.nodes
            .get(&node)
            .map(|n| n.coords.as_slice())
            .ok_or(OversetError::MissingNode(node))
    }

    fn part_nodes(&self, part: &str) -> Result<Vec<NodeId>, OversetError> {
        self.parts
            .get(part)
            .map(|p| p.nodes.clone())
            .ok_or_else(|| OversetError::MissingField(part.to_string()))
    }

    fn part_elements(&self, part: &str) -> Result<Vec<ElemId>, OversetError> {
        self.parts
            .get(part)
            .map(|p| p.elements.clone())
            .ok_or_else(|| OversetError::MissingField(part.to_string()))
    }

    fn nodes(&self) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.nodes.keys().copied().collect();
        out.sort_unstable();
        out
    }

    fn elements(&self) -> Vec<ElemId> {
        let mut out: Vec<ElemId> = self.elements.keys().copied().collect();
        out.sort_unstable();
        out
    }

    fn replace_ghosting(
        &mut self,
        name: &str,
        adds: &[(ElemId, usize)],
    ) -> Result<(), OversetError> {
        for &(elem, _dest) in adds {
            if !self.elements.contains_key(&elem) {
                return Err(OversetError::MissingElement(elem));
            }
        }
        // One bracketed modification: drop the old region, install the new.
        self.ghostings.remove(name);
        self.ghostings.insert(name.to_string(), adds.to_vec());
        self.modification_count += 1;
        Ok(())
    }

    fn ghosting_members(&self, name: &str) -> &[(ElemId, usize)] {
        self.ghostings.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn copy_owned_to_shared<V: Clone>(
        &self,
        _field: &mut DualField<V>,
    ) -> Result<(), OversetError> {
        // Single-process: every shared copy aliases the owned value already.
        Ok(())
    }

    fn parallel_max(&self, _field: &mut DualField<f64>) -> Result<(), OversetError> {
        Ok(())
    }

    fn communicate_field_data<V: Clone>(
        &self,
        _ghosting: &str,
        _field: &mut DualField<V>,
    ) -> Result<(), OversetError> {
        Ok(())
    }
}
