//! Cairn Core
//!
//! Shared infrastructure for the cairn asset crates: collections, logging and profiling.

pub mod alloc;
pub mod logging;
pub mod profiling;
