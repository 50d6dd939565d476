//! Dual-resident field storage with explicit host/device synchronization.
//!
//! A [`DualField`] holds one logical per-entity field as two views: a host
//! buffer and a device buffer. Exactly one view is authoritative at any time,
//! tracked by [`SyncState`]; connectivity code is strict about which view it
//! reads during each phase (host during search/reconciliation, device during
//! the solve) and resynchronizes explicitly at phase boundaries.
//!
//! Layout is an id→slot map plus an insertion-order list over a flat buffer
//! with a fixed component count per entity. Entity keys are raw global ids
//! (`NodeId::get()` / `ElemId::get()`).

use crate::error::OversetError;
use hashbrown::HashMap;

/// Which view of the field is authoritative.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SyncState {
    /// Host and device agree.
    Synchronized,
    /// Host was modified; device is stale until `sync_to_device`.
    HostModified,
    /// Device was modified; host is stale until `sync_to_host`.
    DeviceModified,
}

/// Per-entity field data with host and device views.
#[derive(Clone, Debug)]
pub struct DualField<V> {
    name: String,
    components: usize,
    slots: HashMap<u64, usize>,
    order: Vec<u64>,
    host: Vec<V>,
    device: Vec<V>,
    state: SyncState,
}

impl<V: Clone + Default> DualField<V> {
    /// Create an empty field with `components` values per entity.
    pub fn new(name: impl Into<String>, components: usize) -> Self {
        Self {
            name: name.into(),
            components,
            slots: HashMap::new(),
            order: Vec::new(),
            host: Vec::new(),
            device: Vec::new(),
            state: SyncState::Synchronized,
        }
    }

    /// Create a field registered over the given entity ids.
    pub fn over_entities(
        name: impl Into<String>,
        components: usize,
        entities: impl IntoIterator<Item = u64>,
    ) -> Self {
        let mut field = Self::new(name, components);
        for id in entities {
            field.register(id);
        }
        field
    }

    /// Register an entity, allocating default-valued storage for it.
    /// Registering an already-known id is a no-op.
    pub fn register(&mut self, id: u64) {
        if self.slots.contains_key(&id) {
            return;
        }
        let slot = self.order.len();
        self.slots.insert(id, slot);
        self.order.push(id);
        self.host
            .resize((slot + 1) * self.components, V::default());
        self.device
            .resize((slot + 1) * self.components, V::default());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    fn slot(&self, id: u64) -> Result<usize, OversetError> {
        self.slots.get(&id).copied().ok_or_else(|| {
            OversetError::MissingField(format!("entity {id} not registered in field `{}`", self.name))
        })
    }

    /// Read the host-view values for an entity.
    pub fn host(&self, id: u64) -> Result<&[V], OversetError> {
        let slot = self.slot(id)?;
        let offset = slot * self.components;
        Ok(&self.host[offset..offset + self.components])
    }

    /// Mutable host-view values for an entity. Call [`Self::modify_on_host`]
    /// after writing.
    pub fn host_mut(&mut self, id: u64) -> Result<&mut [V], OversetError> {
        let slot = self.slot(id)?;
        let offset = slot * self.components;
        Ok(&mut self.host[offset..offset + self.components])
    }

    /// Read the device-view values for an entity.
    pub fn device(&self, id: u64) -> Result<&[V], OversetError> {
        let slot = self.slot(id)?;
        let offset = slot * self.components;
        Ok(&self.device[offset..offset + self.components])
    }

    /// Mutable device-view values. Call [`Self::modify_on_device`] after
    /// writing.
    pub fn device_mut(&mut self, id: u64) -> Result<&mut [V], OversetError> {
        let slot = self.slot(id)?;
        let offset = slot * self.components;
        Ok(&mut self.device[offset..offset + self.components])
    }

    /// Overwrite the host values for an entity.
    pub fn set_host(&mut self, id: u64, values: &[V]) -> Result<(), OversetError> {
        if values.len() != self.components {
            return Err(OversetError::FieldSizeMismatch {
                field: self.name.clone(),
                expected: self.components,
                found: values.len(),
            });
        }
        self.host_mut(id)?.clone_from_slice(values);
        Ok(())
    }

    /// Iterate `(entity id, host values)` in registration order.
    pub fn host_iter(&self) -> impl Iterator<Item = (u64, &[V])> {
        self.order.iter().map(move |&id| {
            let slot = self.slots[&id];
            let offset = slot * self.components;
            (id, &self.host[offset..offset + self.components])
        })
    }

    /// Mark the host view as modified; device becomes stale.
    pub fn modify_on_host(&mut self) {
        self.state = SyncState::HostModified;
    }

    /// Mark the device view as modified; host becomes stale.
    pub fn modify_on_device(&mut self) {
        self.state = SyncState::DeviceModified;
    }

    /// Make the host view current, copying from device if it was modified.
    pub fn sync_to_host(&mut self) {
        if self.state == SyncState::DeviceModified {
            self.host.clone_from_slice(&self.device);
        }
        self.state = SyncState::Synchronized;
    }

    /// Make the device view current, copying from host if it was modified.
    pub fn sync_to_device(&mut self) {
        if self.state == SyncState::HostModified {
            self.device.clone_from_slice(&self.host);
        }
        self.state = SyncState::Synchronized;
    }
}

impl DualField<f64> {
    /// Copy host values from another field with identical registration.
    pub fn copy_host_from(&mut self, other: &DualField<f64>) -> Result<(), OversetError> {
        if other.components != self.components || other.order != self.order {
            return Err(OversetError::FieldSizeMismatch {
                field: self.name.clone(),
                expected: self.host.len(),
                found: other.host.len(),
            });
        }
        self.host.clone_from_slice(&other.host);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_access() {
        let mut f: DualField<f64> = DualField::new("velocity", 3);
        f.register(10);
        f.register(20);
        f.register(10); // idempotent
        assert_eq!(f.len(), 2);
        f.set_host(20, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(f.host(20).unwrap(), &[1.0, 2.0, 3.0]);
        assert!(f.host(99).is_err());
    }

    #[test]
    fn host_to_device_sync() {
        let mut f: DualField<f64> = DualField::over_entities("p", 1, [1, 2]);
        f.host_mut(1).unwrap()[0] = 4.0;
        f.modify_on_host();
        assert_eq!(f.sync_state(), SyncState::HostModified);
        assert_eq!(f.device(1).unwrap(), &[0.0]);
        f.sync_to_device();
        assert_eq!(f.device(1).unwrap(), &[4.0]);
        assert_eq!(f.sync_state(), SyncState::Synchronized);
    }

    #[test]
    fn device_to_host_sync() {
        let mut f: DualField<f64> = DualField::over_entities("p", 1, [1]);
        f.device_mut(1).unwrap()[0] = 9.0;
        f.modify_on_device();
        f.sync_to_host();
        assert_eq!(f.host(1).unwrap(), &[9.0]);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut f: DualField<f64> = DualField::over_entities("p", 2, [1]);
        let err = f.set_host(1, &[1.0]).unwrap_err();
        assert!(matches!(err, OversetError::FieldSizeMismatch { .. }));
    }
}
