//! Configuration surface for the overset connectivity subsystem.
//!
//! Mirrors the solver input deck: one `mesh_group` entry per overset block,
//! an optional tag offset applied to all block tags, and passthrough options
//! forwarded verbatim to the external search adapter. Two entries are native
//! to this crate: `device_resident` is a runtime capability flag (coupled
//! connectivity requires host-resident data paths, and requesting both is a
//! configuration error, not a compile-time exclusion), and
//! `iso_distance_tolerance` bounds the acceptable isoparametric distance
//! before a donor match is counted as degraded.

use std::collections::BTreeMap;

fn default_iso_tolerance() -> f64 {
    1.0e-8
}

fn default_coordinates_field() -> String {
    "coordinates".to_string()
}

/// One overset mesh block: the mesh parts it covers plus optional wall and
/// overset-boundary parts used for mandatory receptor marking.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MeshGroup {
    pub mesh_parts: Vec<String>,
    #[serde(default)]
    pub wall_parts: Vec<String>,
    #[serde(default)]
    pub ovset_parts: Vec<String>,
}

/// Options forwarded to the external donor-search adapter.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchOptions {
    /// Request a fringe-reduction pass after connectivity.
    #[serde(default)]
    pub reduce_fringes: bool,
    /// Passthrough key/value options, forwarded verbatim.
    #[serde(default)]
    pub passthrough: BTreeMap<String, String>,
}

/// Top-level configuration of the connectivity coordinator.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OversetConfig {
    /// One entry per mesh block, in tag order.
    pub mesh_groups: Vec<MeshGroup>,
    /// Offset added to every block's mesh tag.
    #[serde(default)]
    pub mesh_tag_offset: i32,
    #[serde(default)]
    pub search_options: SearchOptions,
    /// Fields live on the device; coupled connectivity is unavailable.
    #[serde(default)]
    pub device_resident: bool,
    /// Isoparametric solve distances beyond `1 + tol` count as degraded.
    #[serde(default = "default_iso_tolerance")]
    pub iso_distance_tolerance: f64,
    /// Name of the nodal coordinates field.
    #[serde(default = "default_coordinates_field")]
    pub coordinates_field: String,
}

impl OversetConfig {
    /// Minimal configuration over the given mesh groups.
    pub fn new(mesh_groups: Vec<MeshGroup>) -> Self {
        Self {
            mesh_groups,
            mesh_tag_offset: 0,
            search_options: SearchOptions::default(),
            device_resident: false,
            iso_distance_tolerance: default_iso_tolerance(),
            coordinates_field: default_coordinates_field(),
        }
    }

    /// Mesh tag for the block at `index`, offset applied. Tags are 1-based.
    pub fn block_tag(&self, index: usize) -> i32 {
        self.mesh_tag_offset + index as i32 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_minimal_json() {
        let cfg: OversetConfig = serde_json::from_str(
            r#"{"mesh_groups": [{"mesh_parts": ["background"]}, {"mesh_parts": ["nested"]}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.mesh_groups.len(), 2);
        assert_eq!(cfg.mesh_tag_offset, 0);
        assert!(!cfg.device_resident);
        assert!(!cfg.search_options.reduce_fringes);
        assert_eq!(cfg.iso_distance_tolerance, 1.0e-8);
        assert_eq!(cfg.coordinates_field, "coordinates");
    }

    #[test]
    fn tags_apply_offset() {
        let mut cfg = OversetConfig::new(vec![MeshGroup::default(), MeshGroup::default()]);
        assert_eq!(cfg.block_tag(0), 1);
        assert_eq!(cfg.block_tag(1), 2);
        cfg.mesh_tag_offset = 10;
        assert_eq!(cfg.block_tag(0), 11);
    }

    #[test]
    fn passthrough_options_roundtrip() {
        let mut cfg = OversetConfig::new(vec![]);
        cfg.search_options
            .passthrough
            .insert("holecutting".into(), "direct".into());
        let s = serde_json::to_string(&cfg).unwrap();
        let back: OversetConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(back.search_options.passthrough["holecutting"], "direct");
    }
}
