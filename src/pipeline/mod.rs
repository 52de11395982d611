// src/pipeline/mod.rs

//! Pipeline compilation.
//!
//! - [`graph`] is the task/step arena with index-based dependency edges.
//! - [`batch`] partitions discovered products into extraction groups.
//! - [`arguments`] builds the ordered argument list of every external tool.
//! - [`layout`] derives output directories and file names.
//! - [`compiler`] wires everything into a [`GlobalExecutionInfo`].

pub mod arguments;
pub mod batch;
pub mod compiler;
pub mod execution;
pub mod graph;
pub mod layout;

pub use compiler::compile;
pub use execution::{GlobalExecutionInfo, PracticeOutput, ProductFormatterParams};
pub use graph::{Step, Task, TaskGraph, TaskKind};
pub use layout::WorkingDirs;
