//! Gather/scatter execution contexts for spatter.
//!
//! [`ExecutionContext`] is the single entry point: it owns a compiled
//! pattern plus the dense and sparse buffers sized from it, and dispatches
//! to a serial loop, a rayon pool (feature `parallel`) or a CUDA device
//! (feature `cuda`) behind one lifecycle:
//!
//! ```
//! use spatter_common::Backend;
//! use spatter_kernels::{ExecutionContext, RunSpec};
//!
//! let pattern = spatter_pattern::compile("0,1,2,3").unwrap();
//! let mut ctx = ExecutionContext::configure(Backend::Serial, RunSpec::new("gather", pattern)).unwrap();
//! ctx.setup(1).unwrap();
//! ctx.run(true).unwrap();
//! assert_eq!(ctx.dense(), &ctx.sparse()[..4]);
//! let result = ctx.teardown().unwrap();
//! assert_eq!(result.timed_runs, 1);
//! ```

use std::fmt;

use spatter_common::Backend;

pub mod buffers;
pub mod context;
pub mod cpu;
pub mod distributed;
#[cfg(feature = "cuda")]
pub mod gpu;
pub mod report;
pub mod timer;

pub use buffers::{HostBuffers, host_allocation_count};
pub use context::{ExecutionContext, RunResult, RunSpec};
pub use distributed::Coordinator;
pub use report::{Bandwidth, Report};
pub use timer::Timer;

/// Which optional substrates this build carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub parallel: bool,
    pub cuda: bool,
    pub mpi: bool,
}

impl Capabilities {
    /// Snapshot of the cargo features this crate was compiled with.
    pub fn compiled() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            cuda: cfg!(feature = "cuda"),
            mpi: cfg!(feature = "mpi"),
        }
    }

    pub fn supports(&self, backend: Backend) -> bool {
        match backend {
            Backend::Serial => true,
            Backend::Parallel => self.parallel,
            Backend::Cuda => self.cuda,
        }
    }

    pub fn compiled_backends(&self) -> Vec<Backend> {
        Backend::ALL.into_iter().filter(|b| self.supports(*b)).collect()
    }

    /// One-line description, e.g. `backends=[serial, parallel] mpi=false`.
    pub fn summary(&self) -> String {
        let backends: Vec<&str> = self.compiled_backends().iter().map(|b| b.as_str()).collect();
        format!("backends=[{}] mpi={}", backends.join(", "), self.mpi)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// True when built with `cuda` and a device can be opened.
pub fn is_cuda_available() -> bool {
    #[cfg(feature = "cuda")]
    {
        gpu::is_cuda_available()
    }
    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}
