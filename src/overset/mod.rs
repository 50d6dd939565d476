//! Overset connectivity: block registry, donor search coordination, iblank
//! reconciliation, ghost maintenance, fringe construction, and field
//! transfer.

pub mod block;
pub mod config;
pub mod coordinator;
pub mod exchange;
pub mod fringe;
pub mod ghost;
pub mod search;

pub use block::OversetBlock;
pub use config::{MeshGroup, OversetConfig, SearchOptions};
pub use coordinator::{ConnectivityStats, OversetConnectivity};
pub use fringe::{build_fringe_info, FringeInfo, FringeStats};
pub use ghost::{GhostManager, GHOSTING_NAME};
pub use search::{
    decode_receptors, encode_receptor, BlockMeshInfo, DonorExport, GeometrySearch,
    RawReceptor, RECEPTOR_STRIDE, ROW_MAJOR,
};
