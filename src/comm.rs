//! Collective communication façade for the overset subsystem.
//!
//! Every cross-rank operation in connectivity is collective and synchronous:
//! all ranks must call it in the same order within the same cycle, even when
//! a rank has no local work. The trait therefore exposes only the collectives
//! the subsystem actually uses — a sum reduction, a fixed-size allgather for
//! counts, and a variable-count allgather for reconciliation payloads. The
//! cross-rank resolution max at shared nodes goes through
//! `BulkMesh::parallel_max`, since it needs the mesh's sharing information.
//!
//! Backends: [`NoComm`] for serial runs and unit tests, and `MpiComm` behind
//! the `mpi-support` feature.

use crate::error::OversetError;

/// Collective operations over the ranks of one distributed run.
pub trait Communicator {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Element-wise global sum of `local` into `global`. Collective.
    fn all_reduce_sum_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), OversetError>;

    /// Gather one `u32` from every rank, indexed by rank. Collective.
    fn all_gather_u32(&self, local: u32) -> Result<Vec<u32>, OversetError>;

    /// Gather variable-length `u64` payloads from every rank, concatenated in
    /// rank order. `counts[r]` is rank `r`'s payload length (from a prior
    /// [`Self::all_gather_u32`]). Collective.
    fn all_gather_var_u64(
        &self,
        local: &[u64],
        counts: &[u32],
    ) -> Result<Vec<u64>, OversetError>;
}

/// Serial communicator: identity collectives for a single-rank run.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_reduce_sum_u64(
        &self,
        local: &[u64],
        global: &mut [u64],
    ) -> Result<(), OversetError> {
        global.copy_from_slice(local);
        Ok(())
    }

    fn all_gather_u32(&self, local: u32) -> Result<Vec<u32>, OversetError> {
        Ok(vec![local])
    }

    fn all_gather_var_u64(
        &self,
        local: &[u64],
        counts: &[u32],
    ) -> Result<Vec<u64>, OversetError> {
        if counts.len() != 1 || counts[0] as usize != local.len() {
            return Err(OversetError::CommError {
                neighbor: 0,
                source: format!(
                    "serial allgatherv count mismatch: counts {counts:?}, payload {}",
                    local.len()
                )
                .into(),
            });
        }
        Ok(local.to_vec())
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::datatype::PartitionMut;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// Communicator over MPI's world communicator.
    pub struct MpiComm {
        universe: Universe,
    }

    impl MpiComm {
        /// Initialize MPI and bind to the world communicator.
        ///
        /// # Errors
        /// Fails if MPI was already initialized in this process.
        pub fn new() -> Result<Self, OversetError> {
            let universe = mpi::initialize().ok_or_else(|| OversetError::CommError {
                neighbor: 0,
                source: "MPI already initialized".into(),
            })?;
            Ok(Self { universe })
        }

        fn world(&self) -> SimpleCommunicator {
            self.universe.world()
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.world().rank() as usize
        }

        fn size(&self) -> usize {
            self.world().size() as usize
        }

        fn all_reduce_sum_u64(
            &self,
            local: &[u64],
            global: &mut [u64],
        ) -> Result<(), OversetError> {
            self.world()
                .all_reduce_into(local, global, SystemOperation::sum());
            Ok(())
        }

        fn all_gather_u32(&self, local: u32) -> Result<Vec<u32>, OversetError> {
            let mut out = vec![0u32; self.size()];
            self.world().all_gather_into(&local, &mut out[..]);
            Ok(out)
        }

        fn all_gather_var_u64(
            &self,
            local: &[u64],
            counts: &[u32],
        ) -> Result<Vec<u64>, OversetError> {
            let counts_i32: Vec<i32> = counts.iter().map(|&c| c as i32).collect();
            let mut displs = vec![0i32; counts.len()];
            for i in 1..counts.len() {
                displs[i] = displs[i - 1] + counts_i32[i - 1];
            }
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut out = vec![0u64; total];
            {
                let mut partition =
                    PartitionMut::new(&mut out[..], &counts_i32[..], &displs[..]);
                self.world().all_gather_varcount_into(local, &mut partition);
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
