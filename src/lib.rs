#![cfg_attr(docsrs, feature(doc_cfg))]
//! # overset-mesh
//!
//! overset-mesh is a Rust library for overset (chimera) mesh connectivity and
//! inter-mesh field transfer in parallel CFD codes. It coordinates an external
//! donor-search library with a distributed unstructured mesh: registering mesh
//! blocks, reconciling node classifications across ranks, maintaining a ghost
//! region so donor elements are locally resident, resolving receptor nodes to
//! isoparametric locations inside their donors, and batching field
//! interpolation into single collective rounds.
//!
//! ## Features
//! - Block registry mapping mesh part groups to search-library tags
//! - Cross-rank iblank reconciliation with a single synchronized exchange
//! - Ghost-region lifecycle with a global no-op fast path
//! - Isoparametric point-in-element solves for hex8 and quad4 donors
//! - Batched donor-to-receptor transfer of arbitrary field sets
//! - Pluggable communication backend (serial, or MPI via `mpi-support`)
//!
//! ## Usage
//! Add `overset-mesh` as a dependency in your `Cargo.toml` and enable
//! features as needed:
//!
//! ```toml
//! [dependencies]
//! overset-mesh = "0.3"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```

pub mod comm;
pub mod data;
pub mod element;
pub mod error;
pub mod mesh;
pub mod overset;

pub use error::OversetError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::comm::Communicator;
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::NoComm;
    pub use crate::data::dual_field::{DualField, SyncState};
    pub use crate::data::registry::{FieldHandle, FieldRegistry, OversetFieldData};
    pub use crate::error::OversetError;
    pub use crate::mesh::bulk::{BulkMesh, InMemoryMesh};
    pub use crate::mesh::entity::{ElemId, NodeId};
    pub use crate::mesh::status::NodeStatus;
    pub use crate::overset::config::{MeshGroup, OversetConfig, SearchOptions};
    pub use crate::overset::coordinator::{ConnectivityStats, OversetConnectivity};
    pub use crate::overset::fringe::{FringeInfo, FringeStats};
    pub use crate::overset::ghost::{GhostManager, GHOSTING_NAME};
    pub use crate::overset::search::{
        BlockMeshInfo, DonorExport, GeometrySearch, RawReceptor,
    };
}
