//! Common types for the spatter gather/scatter bandwidth benchmark.
//!
//! This crate provides the pieces shared by the pattern compiler, the
//! execution backends and the command-line front end: the error taxonomy,
//! the kernel and backend selectors, and file/environment configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigFileError, SpatterConfig};
pub use error::{Result, SpatterError};
pub use types::{Backend, Kernel, ELEMENT_SIZE};
