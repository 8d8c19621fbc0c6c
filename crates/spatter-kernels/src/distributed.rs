//! Multi-process barrier coordination.
//!
//! Every kernel invocation is preceded by [`Coordinator::barrier`] so all
//! ranks start each run together. The local coordinator treats the barrier
//! as a no-op; the MPI coordinator (feature `mpi`) blocks on the world
//! communicator. A failing MPI barrier aborts the whole job through MPI's
//! default fatal error handler, so no rank can continue alone.

use std::fmt;

use spatter_common::{Result, SpatterError};

#[cfg(feature = "mpi")]
use mpi::topology::SimpleCommunicator;
#[cfg(feature = "mpi")]
use mpi::traits::Communicator;

enum Group {
    Local,
    #[cfg(feature = "mpi")]
    Mpi {
        world: SimpleCommunicator,
        // Finalizes MPI on drop; declared after `world` so it drops last.
        _universe: mpi::environment::Universe,
    },
}

/// Process group membership plus a count of barriers entered.
pub struct Coordinator {
    group: Group,
    barriers: u64,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("kind", &self.kind())
            .field("rank", &self.rank())
            .field("size", &self.size())
            .field("barriers", &self.barriers)
            .finish()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::local()
    }
}

impl Coordinator {
    /// Single-process group.
    pub fn local() -> Self {
        Self { group: Group::Local, barriers: 0 }
    }

    /// Join the MPI world communicator.
    ///
    /// # Errors
    ///
    /// [`SpatterError::Configuration`] when built without the `mpi` feature,
    /// [`SpatterError::Synchronization`] when MPI cannot be initialized.
    #[cfg(feature = "mpi")]
    pub fn mpi() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| SpatterError::sync("MPI initialization failed or MPI already initialized"))?;
        let world = universe.world();
        log::info!("joined MPI world as rank {} of {}", world.rank(), world.size());
        Ok(Self { group: Group::Mpi { world, _universe: universe }, barriers: 0 })
    }

    #[cfg(not(feature = "mpi"))]
    pub fn mpi() -> Result<Self> {
        Err(SpatterError::config("distributed mode requires the `mpi` feature"))
    }

    pub fn kind(&self) -> &'static str {
        match self.group {
            Group::Local => "local",
            #[cfg(feature = "mpi")]
            Group::Mpi { .. } => "mpi",
        }
    }

    pub fn rank(&self) -> usize {
        match &self.group {
            Group::Local => 0,
            #[cfg(feature = "mpi")]
            Group::Mpi { world, .. } => usize::try_from(world.rank()).unwrap_or(0),
        }
    }

    pub fn size(&self) -> usize {
        match &self.group {
            Group::Local => 1,
            #[cfg(feature = "mpi")]
            Group::Mpi { world, .. } => usize::try_from(world.size()).unwrap_or(1),
        }
    }

    /// Rank 0 owns stdout.
    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    /// Block until every rank reaches this point.
    pub fn barrier(&mut self) -> Result<()> {
        match &self.group {
            Group::Local => {}
            #[cfg(feature = "mpi")]
            Group::Mpi { world, .. } => world.barrier(),
        }
        self.barriers += 1;
        Ok(())
    }

    /// Barriers entered so far.
    pub fn barriers(&self) -> u64 {
        self.barriers
    }
}
