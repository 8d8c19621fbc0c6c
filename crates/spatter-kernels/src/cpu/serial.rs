//! Single-threaded reference kernels.

use super::HostKernel;

/// Sequential loops in pattern order.
///
/// Scatter through a pattern with repeated indices is well defined here: the
/// last position in iteration order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialKernel;

impl HostKernel for SerialKernel {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn gather(&self, pattern: &[usize], dense: &mut [f64], sparse: &[f64]) {
        for (slot, &idx) in dense.iter_mut().zip(pattern) {
            *slot = sparse[idx];
        }
    }

    fn scatter(&self, pattern: &[usize], dense: &[f64], sparse: &mut [f64]) {
        for (&value, &idx) in dense.iter().zip(pattern) {
            sparse[idx] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_reads_through_pattern() {
        let sparse = [10.0, 11.0, 12.0, 13.0];
        let mut dense = [0.0; 3];
        SerialKernel.gather(&[3, 0, 3], &mut dense, &sparse);
        assert_eq!(dense, [13.0, 10.0, 13.0]);
    }

    #[test]
    fn scatter_writes_through_pattern() {
        let mut sparse = [0.0; 5];
        SerialKernel.scatter(&[4, 1], &[7.0, 8.0], &mut sparse);
        assert_eq!(sparse, [0.0, 8.0, 0.0, 0.0, 7.0]);
    }

    #[test]
    fn scatter_duplicates_last_write_wins() {
        let mut sparse = [0.0; 2];
        SerialKernel.scatter(&[1, 0, 1, 1], &[1.0, 2.0, 3.0, 4.0], &mut sparse);
        assert_eq!(sparse, [2.0, 4.0]);
    }
}
