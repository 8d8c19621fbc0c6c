//! Data-parallel host kernels on a dedicated rayon pool.
//!
//! Gather writes disjoint dense slots and is race free. Scatter through a
//! pattern with repeated indices races on the shared sparse slots; every
//! write is a relaxed atomic store of the value's bit pattern, so the
//! outcome is one of the competing values with no ordering guarantee.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use spatter_common::{Result, SpatterError};

use super::HostKernel;

/// Fork-join kernels over a private thread pool.
pub struct ParallelKernel {
    pool: ThreadPool,
}

impl std::fmt::Debug for ParallelKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelKernel").field("threads", &self.threads()).finish()
    }
}

impl ParallelKernel {
    /// Build a pool with `threads` workers, or one per CPU when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatterError::Configuration`] for a zero thread count or
    /// when the pool cannot be spawned.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("spatter-worker-{i}"));
        if let Some(n) = threads {
            if n == 0 {
                return Err(SpatterError::config("thread count must be at least 1"));
            }
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| SpatterError::config(format!("failed to build thread pool: {e}")))?;
        log::debug!("parallel backend using {} threads", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl HostKernel for ParallelKernel {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn gather(&self, pattern: &[usize], dense: &mut [f64], sparse: &[f64]) {
        self.pool.install(|| {
            dense.par_iter_mut().zip(pattern.par_iter()).for_each(|(slot, &idx)| {
                *slot = sparse[idx];
            });
        });
    }

    fn scatter(&self, pattern: &[usize], dense: &[f64], sparse: &mut [f64]) {
        let cells = as_atomic_cells(sparse);
        self.pool.install(|| {
            dense.par_iter().zip(pattern.par_iter()).for_each(|(value, &idx)| {
                cells[idx].store(value.to_bits(), Ordering::Relaxed);
            });
        });
    }
}

fn as_atomic_cells(values: &mut [f64]) -> &[AtomicU64] {
    assert_eq!(
        values.as_ptr().align_offset(std::mem::align_of::<AtomicU64>()),
        0,
        "f64 buffer is not aligned for AtomicU64"
    );
    // SAFETY: AtomicU64 has the size of u64 (and so of f64) and the pointer
    // was checked for its alignment above. The exclusive borrow guarantees no
    // non-atomic access overlaps the returned slice's lifetime, and any bit
    // pattern stored back is a valid f64.
    unsafe { std::slice::from_raw_parts(values.as_mut_ptr().cast::<AtomicU64>(), values.len()) }
}
