//! Host dense/sparse buffers.
//!
//! Buffers are allocated fallibly so that memory exhaustion surfaces as
//! [`SpatterError::Allocation`] instead of aborting, and are filled from a
//! seeded ChaCha stream so identical seeds give identical contents.

use std::cell::Cell;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spatter_common::{ELEMENT_SIZE, Result, SpatterError};
use spatter_pattern::Pattern;

thread_local! {
    static HOST_ALLOCATIONS: Cell<u64> = const { Cell::new(0) };
}

/// Number of host buffers allocated by the current thread.
///
/// Tracked per thread so concurrent tests do not observe each other.
pub fn host_allocation_count() -> u64 {
    HOST_ALLOCATIONS.with(Cell::get)
}

/// Dense and sparse value arrays for one execution context.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffers {
    /// One slot per pattern position.
    pub dense: Vec<f64>,
    /// One slot per addressable index, `max(pattern) + 1`.
    pub sparse: Vec<f64>,
}

impl HostBuffers {
    /// Allocate buffers sized from `pattern` and fill them from `seed`.
    pub fn allocate(pattern: &Pattern, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let dense = random_buffer("dense buffer", pattern.len(), &mut rng)?;
        let sparse = random_buffer("sparse buffer", pattern.sparse_len(), &mut rng)?;
        Ok(Self { dense, sparse })
    }

    /// Total host bytes held.
    pub fn bytes(&self) -> usize {
        (self.dense.len() + self.sparse.len()) * ELEMENT_SIZE
    }
}

fn random_buffer(name: &'static str, len: usize, rng: &mut ChaCha8Rng) -> Result<Vec<f64>> {
    let mut buf: Vec<f64> = Vec::new();
    buf.try_reserve_exact(len).map_err(|e| SpatterError::Allocation {
        buffer: name,
        bytes: len.saturating_mul(ELEMENT_SIZE),
        reason: e.to_string(),
    })?;
    HOST_ALLOCATIONS.with(|n| n.set(n.get() + 1));
    // Non-negative integers below 2^31, the range of C `rand()`.
    buf.extend((0..len).map(|_| f64::from(rng.random::<u32>() >> 1)));
    log::trace!("allocated {name}: {len} elements");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(indices: &[usize]) -> Pattern {
        Pattern::from_indices(indices.to_vec()).unwrap()
    }

    #[test]
    fn sizes_follow_pattern() {
        let bufs = HostBuffers::allocate(&pattern(&[3, 0, 7]), 1).unwrap();
        assert_eq!(bufs.dense.len(), 3);
        assert_eq!(bufs.sparse.len(), 8);
        assert_eq!(bufs.bytes(), 11 * 8);
    }

    #[test]
    fn same_seed_same_contents() {
        let p = pattern(&[0, 5, 9]);
        assert_eq!(HostBuffers::allocate(&p, 7).unwrap(), HostBuffers::allocate(&p, 7).unwrap());
        assert_ne!(HostBuffers::allocate(&p, 7).unwrap(), HostBuffers::allocate(&p, 8).unwrap());
    }

    #[test]
    fn values_are_non_negative_integers() {
        let bufs = HostBuffers::allocate(&pattern(&[0, 1, 2, 3]), 3).unwrap();
        for v in bufs.dense.iter().chain(&bufs.sparse) {
            assert!(*v >= 0.0 && v.fract() == 0.0, "{v}");
        }
    }

    #[test]
    fn allocation_counter_counts_both_buffers() {
        let before = host_allocation_count();
        HostBuffers::allocate(&pattern(&[1]), 0).unwrap();
        assert_eq!(host_allocation_count(), before + 2);
    }

    #[test]
    fn impossible_size_is_allocation_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = random_buffer("sparse buffer", usize::MAX / 4, &mut rng).unwrap_err();
        assert!(matches!(err, SpatterError::Allocation { buffer: "sparse buffer", .. }), "{err}");
    }
}
