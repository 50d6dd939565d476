//! Mesh entity handles, classification, and the bulk-data interface.

pub mod bulk;
pub mod entity;
pub mod status;

pub use bulk::{BulkMesh, InMemoryMesh};
pub use entity::{ElemId, NodeId};
pub use status::NodeStatus;
