//! Node/cell classification ("iblank") for overset connectivity.
//!
//! The external hole-cutting library reports a per-node integer status: `1`
//! for a normal field point, `0` for a blanked hole, `-1` for a fringe
//! receptor. The same convention applies per cell. The classification of a
//! shared node must agree between its owning rank and every sharing rank;
//! reconciliation (see the coordinator) restores this invariant once per
//! cycle.

/// Classification of a mesh node or cell in the overset assembly.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeStatus {
    /// Flow is solved at this point.
    Field,
    /// Blanked out; flow is solved on another block.
    Hole,
    /// Receptor at an interpolation boundary; receives donor data.
    Fringe,
}

impl NodeStatus {
    /// External iblank convention: field = 1, hole = 0, fringe = -1.
    #[inline]
    pub const fn iblank(self) -> i32 {
        match self {
            NodeStatus::Field => 1,
            NodeStatus::Hole => 0,
            NodeStatus::Fringe => -1,
        }
    }

    /// Decode an external iblank value. Any value `> -1` other than zero is
    /// treated as a field point.
    #[inline]
    pub const fn from_iblank(value: i32) -> NodeStatus {
        match value {
            0 => NodeStatus::Hole,
            v if v > -1 => NodeStatus::Field,
            _ => NodeStatus::Fringe,
        }
    }

    /// True when an iblank value denotes something other than a fringe
    /// receptor.
    #[inline]
    pub const fn is_not_fringe(value: i32) -> bool {
        value > -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iblank_roundtrip() {
        for status in [NodeStatus::Field, NodeStatus::Hole, NodeStatus::Fringe] {
            assert_eq!(NodeStatus::from_iblank(status.iblank()), status);
        }
    }

    #[test]
    fn positive_values_are_field() {
        assert_eq!(NodeStatus::from_iblank(2), NodeStatus::Field);
        assert!(NodeStatus::is_not_fringe(0));
        assert!(!NodeStatus::is_not_fringe(-1));
    }
}
