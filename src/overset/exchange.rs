//! Batched donor-to-receptor field transfer.
//!
//! All requested fields are packed into one interleaved buffer per block
//! (`ncomp` values per node, fields in descriptor order), handed to the
//! search adapter for a single collective interpolation pass, and unpacked
//! back into field storage. One adapter round per batch regardless of the
//! field count.

use crate::data::registry::{FieldHandle, FieldRegistry, OversetFieldData};
use crate::error::OversetError;
use crate::overset::coordinator::OversetConnectivity;
use crate::overset::search::{GeometrySearch, ROW_MAJOR};

impl OversetConnectivity {
    /// Pack host values of `fields` and register one solution buffer per
    /// block with the search adapter. Returns the interleaved component
    /// count per node.
    pub fn register_solution<S: GeometrySearch>(
        &self,
        search: &mut S,
        registry: &mut FieldRegistry,
        fields: &[OversetFieldData],
    ) -> Result<usize, OversetError> {
        let ncomp: usize = fields.iter().map(|f| f.components()).sum();
        for desc in fields {
            registry.get_mut(desc.field)?.sync_to_host();
        }
        for block in self.blocks() {
            let qsol = block.register_solution(registry, fields, ncomp)?;
            search.register_solution(block.tag(), qsol, ncomp)?;
        }
        Ok(ncomp)
    }

    /// Take back the interpolated buffers and unpack them into host field
    /// storage. Must pair with the [`Self::register_solution`] call that
    /// produced `ncomp`.
    pub fn update_solution<S: GeometrySearch>(
        &self,
        search: &mut S,
        registry: &mut FieldRegistry,
        fields: &[OversetFieldData],
        ncomp: usize,
    ) -> Result<(), OversetError> {
        for block in self.blocks() {
            let qsol = search.retrieve_solution(block.tag())?;
            block.update_solution(registry, fields, &qsol, ncomp)?;
        }
        for desc in fields {
            registry.get_mut(desc.field)?.modify_on_host();
            registry.get_mut(desc.field)?.sync_to_device();
        }
        Ok(())
    }

    /// Interpolate a batch of fields from donors to receptors in one
    /// collective adapter round.
    pub fn overset_update_fields<S: GeometrySearch>(
        &self,
        search: &mut S,
        registry: &mut FieldRegistry,
        fields: &[OversetFieldData],
    ) -> Result<(), OversetError> {
        if fields.is_empty() {
            return Ok(());
        }
        let ncomp = self.register_solution(search, registry, fields)?;
        search.data_update(ncomp, ROW_MAJOR)?;
        self.update_solution(search, registry, fields, ncomp)
    }

    /// Interpolate a single field. When `sync_to_device` is false the field
    /// is left marked host-modified for the caller to sync later.
    pub fn overset_update_field<S: GeometrySearch>(
        &self,
        search: &mut S,
        registry: &mut FieldRegistry,
        field: FieldHandle,
        rows: usize,
        cols: usize,
        sync_to_device: bool,
    ) -> Result<(), OversetError> {
        let desc = OversetFieldData::new(field, rows, cols);
        let ncomp = self.register_solution(search, registry, &[desc])?;
        search.data_update(ncomp, ROW_MAJOR)?;

        for block in self.blocks() {
            let qsol = search.retrieve_solution(block.tag())?;
            block.update_solution(registry, &[desc], &qsol, ncomp)?;
        }
        let f = registry.get_mut(field)?;
        f.modify_on_host();
        if sync_to_device {
            f.sync_to_device();
        }
        Ok(())
    }
}
