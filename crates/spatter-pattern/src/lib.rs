//! Index-pattern compiler for spatter.
//!
//! A pattern is the ordered list of sparse-buffer indices that a gather reads
//! from or a scatter writes to. Patterns are written in a compact notation:
//!
//! | Form      | Syntax                                   | Example                            |
//! |-----------|------------------------------------------|------------------------------------|
//! | Explicit  | `i0,i1,...`                              | `0,4,8,12`                         |
//! | MS1       | `MS1:<len>:<loc>[,<loc>..]:<gap>[,<gap>..]` | `MS1:8:4:32 → 0,1,2,3,35,36,37,38` |
//! | Uniform   | `UNIFORM:<len>:<stride>`                 | `UNIFORM:4:3 → 0,3,6,9`            |
//!
//! [`PatternCompiler`] additionally repeats the base sequence `count` times,
//! shifting repetition `j` by `j * delta`. With a delta and no explicit count
//! it repeats [`DEFAULT_DELTA_COUNT`] times. Compilation is deterministic: the
//! same inputs always produce the same sequence.
//!
//! # Usage
//!
//! ```rust
//! use spatter_pattern::PatternCompiler;
//!
//! let pattern = PatternCompiler::new().compile("MS1:8:4:32").unwrap();
//! assert_eq!(pattern.as_slice(), &[0, 1, 2, 3, 35, 36, 37, 38]);
//! assert_eq!(pattern.sparse_len(), 39);
//! ```

mod compiler;
mod generators;
mod pattern;

pub use compiler::{DEFAULT_DELTA_COUNT, PatternCompiler};
pub use pattern::Pattern;

/// Compile `spec` with no delta and a single repetition.
pub fn compile(spec: &str) -> spatter_common::Result<Pattern> {
    PatternCompiler::new().compile(spec)
}
