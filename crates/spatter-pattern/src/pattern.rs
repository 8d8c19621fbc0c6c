use std::fmt;

use spatter_common::{Result, SpatterError};

/// A non-empty, immutable sequence of sparse-buffer indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    indices: Vec<usize>,
    max: usize,
}

impl Pattern {
    /// Wrap an index list.
    ///
    /// # Errors
    ///
    /// Returns [`SpatterError::Configuration`] if `indices` is empty or its
    /// largest index leaves no room for a sparse buffer of `max + 1` slots.
    pub fn from_indices(indices: Vec<usize>) -> Result<Self> {
        let Some(&max) = indices.iter().max() else {
            return Err(SpatterError::config("pattern needs to have length of at least 1"));
        };
        if max == usize::MAX {
            return Err(SpatterError::config(format!(
                "pattern index {max} is too large: sparse length would overflow usize"
            )));
        }
        Ok(Self { indices, max })
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Largest index in the pattern.
    pub fn max_index(&self) -> usize {
        self.max
    }

    /// Length the sparse buffer must have: `max_index() + 1`. Never
    /// overflows; construction rejects `usize::MAX`.
    pub fn sparse_len(&self) -> usize {
        self.max + 1
    }

    /// True if any sparse slot is referenced more than once.
    pub fn has_duplicates(&self) -> bool {
        let mut sorted = self.indices.clone();
        sorted.sort_unstable();
        sorted.windows(2).any(|w| w[0] == w[1])
    }
}

impl AsRef<[usize]> for Pattern {
    fn as_ref(&self) -> &[usize] {
        &self.indices
    }
}

impl TryFrom<Vec<usize>> for Pattern {
    type Error = SpatterError;

    fn try_from(indices: Vec<usize>) -> Result<Self> {
        Self::from_indices(indices)
    }
}

/// Renders as `i0, i1, i2`.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, idx) in self.indices.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{idx}")?;
        }
        Ok(())
    }
}
