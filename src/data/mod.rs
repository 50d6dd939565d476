//! Field data: dual-resident storage and the named-field registry.

pub mod dual_field;
pub mod registry;

pub use dual_field::{DualField, SyncState};
pub use registry::{FieldHandle, FieldRegistry, OversetFieldData};
