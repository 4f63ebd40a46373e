#![doc = include_str!("../README.md")]

//! Block decomposition IR.
//!
//! The decomposition itself happens upstream; this crate only models its
//! result and rejects malformed partitions before any analysis runs.

pub mod block;
pub mod graph;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;

pub use block::{Block, BlockId, GraphEdge, LocationId};
pub use graph::{BlockGraph, GraphError};
