//! Device-resident execution.

pub mod cuda;

pub use cuda::{CudaDeviceInfo, CudaEngine, SPATTER_KERNEL_SRC, is_cuda_available};
