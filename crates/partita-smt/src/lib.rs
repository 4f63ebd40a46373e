#![doc = include_str!("../README.md")]

//! Boolean formula algebra and satisfiability backends.
//!
//! Formulas are the payload of every inter-block message. This crate keeps
//! them solver-agnostic: terms are plain values, printing goes through
//! SMT-LIB2, and satisfiability is a pluggable [`solver::SatSolver`].

pub mod backends;
pub mod solver;
pub mod terms;

pub use solver::{Model, SatResult, SatSolver};
pub use terms::Formula;
