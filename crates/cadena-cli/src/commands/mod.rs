//! CLI command implementations.

pub mod analyze;
pub mod graph;
pub mod info;
pub mod process;
pub mod processors;
