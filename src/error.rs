//! OversetError: unified error type for the overset connectivity public APIs.
//!
//! Every fallible operation in this crate reports failures through this enum
//! rather than panicking. Fatal protocol violations (an expected donor element
//! that is not locally resident, an unsupported execution configuration) are
//! surfaced as dedicated variants so callers can abort the run instead of
//! continuing with inconsistent connectivity.

use crate::mesh::entity::{ElemId, NodeId};
use thiserror::Error;

/// Unified error type for overset-mesh operations.
#[derive(Debug, Error)]
pub enum OversetError {
    /// Attempted to construct a `NodeId`/`ElemId` with a zero value.
    #[error("entity id must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidEntityId,

    /// Requested a configuration this build cannot honor (e.g. coupled
    /// connectivity with device-resident fields).
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A donor element that must be locally resident (ghosted) is not.
    /// Signals a bug in ghost-set computation; never recoverable.
    #[error(
        "invalid donor element {donor} for receptor node {receptor}: \
         element is not locally resident"
    )]
    InvalidDonorElement { receptor: NodeId, donor: ElemId },

    /// No mesh block is registered under the given tag.
    #[error("no overset block registered with mesh tag {0}")]
    MissingBlock(i32),

    /// A field handle or name did not resolve in the registry.
    #[error("unknown field `{0}`")]
    MissingField(String),

    /// A field's component count disagrees with its descriptor.
    #[error("field `{field}` size mismatch: expected {expected} components, found {found}")]
    FieldSizeMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    /// A node referenced by connectivity data is not present in the mesh.
    #[error("node {0} not present in mesh")]
    MissingNode(NodeId),

    /// An element referenced by connectivity data is not present in the mesh.
    #[error("element {0} not present in mesh")]
    MissingElement(ElemId),

    /// Failure in a collective exchange with a neighboring rank.
    #[error("communication error involving rank {neighbor}: {source}")]
    CommError {
        neighbor: usize,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The ghost-region state machine was driven out of order.
    #[error("ghosting protocol violation: {0}")]
    GhostingProtocol(String),

    /// Degenerate or malformed element geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The external donor-search adapter reported a failure.
    #[error("geometry search adapter error: {0}")]
    SearchAdapter(String),
}
