//! Strong, zero-cost handles for mesh entities.
//!
//! Overset connectivity juggles two distinct global id spaces: mesh nodes and
//! mesh elements. Mixing them up is a classic source of silent corruption, so
//! both are wrapped in `repr(transparent)` newtypes around `NonZeroU64`. Zero
//! is reserved as an invalid/sentinel value, matching the convention of the
//! external search library's id arrays.

use crate::error::OversetError;
use std::{fmt, num::NonZeroU64};

/// Global id of a mesh node.
///
/// `repr(transparent)` guarantees the same ABI and alignment as a `u64`, so
/// node ids can cross FFI and wire boundaries without repacking.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct NodeId(NonZeroU64);

/// Global id of a mesh element.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct ElemId(NonZeroU64);

impl NodeId {
    /// Creates a `NodeId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns `Err(InvalidEntityId)` if `raw == 0`.
    #[inline]
    pub fn new(raw: u64) -> Result<Self, OversetError> {
        NonZeroU64::new(raw)
            .map(NodeId)
            .ok_or(OversetError::InvalidEntityId)
    }

    /// Returns the inner `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl ElemId {
    /// Creates an `ElemId` from a raw `u64` value.
    ///
    /// # Errors
    /// Returns `Err(InvalidEntityId)` if `raw == 0`.
    #[inline]
    pub fn new(raw: u64) -> Result<Self, OversetError> {
        NonZeroU64::new(raw)
            .map(ElemId)
            .ok_or(OversetError::InvalidEntityId)
    }

    /// Returns the inner `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.get()).finish()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl fmt::Debug for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElemId").field(&self.get()).finish()
    }
}

impl fmt::Display for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

// -----------------------------------------------------------------------------
// FFI and layout guarantees
// -----------------------------------------------------------------------------

/// Entity ids can be sent over MPI as plain `u64` values.
#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for NodeId {
    type Out = <u64 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        u64::equivalent_datatype()
    }
}

#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for ElemId {
    type Out = <u64 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        u64::equivalent_datatype()
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that the id types have the same layout as `u64`.
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(NodeId, u64);
    assert_eq_size!(ElemId, u64);

    #[test]
    fn alignment_matches_u64() {
        assert_eq_align!(NodeId, u64);
        assert_eq_align!(ElemId, u64);
    }
}
