//! Host-side gather/scatter kernels.

use spatter_common::Kernel;
use spatter_pattern::Pattern;

use crate::buffers::HostBuffers;

#[cfg(feature = "parallel")]
pub mod parallel;
pub mod serial;

#[cfg(feature = "parallel")]
pub use parallel::ParallelKernel;
pub use serial::SerialKernel;

/// A host execution strategy for the two kernels.
///
/// Implementations may assume every index in `pattern` is a valid position
/// in `sparse` and that `dense.len() == pattern.len()`.
pub trait HostKernel: Send + Sync {
    fn name(&self) -> &'static str;

    /// `dense[i] = sparse[pattern[i]]`
    fn gather(&self, pattern: &[usize], dense: &mut [f64], sparse: &[f64]);

    /// `sparse[pattern[i]] = dense[i]`
    fn scatter(&self, pattern: &[usize], dense: &[f64], sparse: &mut [f64]);

    fn execute(&self, kernel: Kernel, pattern: &Pattern, buffers: &mut HostBuffers) {
        debug_assert_eq!(buffers.dense.len(), pattern.len());
        debug_assert_eq!(buffers.sparse.len(), pattern.sparse_len());
        match kernel {
            Kernel::Gather => self.gather(pattern.as_slice(), &mut buffers.dense, &buffers.sparse),
            Kernel::Scatter => self.scatter(pattern.as_slice(), &buffers.dense, &mut buffers.sparse),
        }
    }
}
