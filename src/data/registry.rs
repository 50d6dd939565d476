//! Named registry of solution fields and the plain field descriptor used by
//! the exchange protocol.
//!
//! The exchange protocol has no knowledge of a field's physical meaning; it
//! only needs a handle plus the row/column multiplicity. A descriptor is a
//! plain tagged struct, not a hierarchy — behavior is identical for every
//! field.

use crate::data::dual_field::DualField;
use crate::error::OversetError;
use hashbrown::HashMap;

/// Opaque handle to a field in a [`FieldRegistry`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldHandle(usize);

/// Descriptor handed to the exchange protocol: which field, and its
/// multiplicity (`rows` vector length × `cols` stored components).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OversetFieldData {
    pub field: FieldHandle,
    pub rows: usize,
    pub cols: usize,
}

impl OversetFieldData {
    pub fn new(field: FieldHandle, rows: usize, cols: usize) -> Self {
        Self { field, rows, cols }
    }

    /// Total component count contributed by this field.
    pub fn components(&self) -> usize {
        self.rows * self.cols
    }
}

/// Well-known field names consumed by the connectivity coordinator.
pub mod well_known {
    /// Per-node dual (control-volume) volume, host-synced before search.
    pub const DUAL_NODAL_VOLUME: &str = "dual_nodal_volume";
    /// Per-element volume, host-synced before search.
    pub const ELEMENT_VOLUME: &str = "element_volume";
    /// Shared nodal resolution metric fed to the hole cutter; max-reduced
    /// across blocks at multi-block nodes.
    pub const NODAL_RESOLUTION: &str = "overset_nodal_volume";
}

/// Registry of named scalar/vector node and element fields.
#[derive(Clone, Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<DualField<f64>>,
    by_name: HashMap<String, FieldHandle>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field, or return the existing handle if the name is taken.
    ///
    /// # Errors
    /// Returns `FieldSizeMismatch` when re-registering with a different
    /// component count.
    pub fn register_field(
        &mut self,
        name: &str,
        components: usize,
        entities: impl IntoIterator<Item = u64>,
    ) -> Result<FieldHandle, OversetError> {
        if let Some(&handle) = self.by_name.get(name) {
            let existing = &self.fields[handle.0];
            if existing.components() != components {
                return Err(OversetError::FieldSizeMismatch {
                    field: name.to_string(),
                    expected: existing.components(),
                    found: components,
                });
            }
            return Ok(handle);
        }
        let handle = FieldHandle(self.fields.len());
        self.fields
            .push(DualField::over_entities(name, components, entities));
        self.by_name.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Look up a handle by field name.
    pub fn handle(&self, name: &str) -> Result<FieldHandle, OversetError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| OversetError::MissingField(name.to_string()))
    }

    pub fn get(&self, handle: FieldHandle) -> Result<&DualField<f64>, OversetError> {
        self.fields
            .get(handle.0)
            .ok_or_else(|| OversetError::MissingField(format!("handle {}", handle.0)))
    }

    pub fn get_mut(
        &mut self,
        handle: FieldHandle,
    ) -> Result<&mut DualField<f64>, OversetError> {
        self.fields
            .get_mut(handle.0)
            .ok_or_else(|| OversetError::MissingField(format!("handle {}", handle.0)))
    }

    /// Copy host values from `src` into `dst` (identical registration
    /// required); marks `dst` modified on host.
    pub fn copy_host_values(
        &mut self,
        src: FieldHandle,
        dst: FieldHandle,
    ) -> Result<(), OversetError> {
        if src == dst {
            return Ok(());
        }
        let (lo, hi) = (src.0.min(dst.0), src.0.max(dst.0));
        if hi >= self.fields.len() {
            return Err(OversetError::MissingField(format!("handle {hi}")));
        }
        let (head, tail) = self.fields.split_at_mut(hi);
        let (a, b) = (&mut head[lo], &mut tail[0]);
        let (src_field, dst_field) = if src.0 == lo { (a, b) } else { (b, a) };
        dst_field.copy_host_from(src_field)?;
        dst_field.modify_on_host();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
