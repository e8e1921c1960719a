//! Helper utilities for integration tests.

pub mod bam_generator;
pub mod tools;

pub use bam_generator::*;
pub use tools::*;
