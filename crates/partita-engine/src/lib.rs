#![doc = include_str!("../README.md")]

//! Verification core for block decompositions.
//!
//! Blocks are autonomous workers that only communicate through
//! [`message::Message`]s carrying formulas. The [`orchestrator::Orchestrator`]
//! owns the per-block inboxes, dispatches work sequentially or onto a bounded
//! thread pool, and decides the overall [`result::Verdict`].

pub mod error;
pub mod message;
pub mod options;
pub mod oracle;
pub mod orchestrator;
pub mod result;
pub mod shutdown;
pub mod trace;
pub mod worker;

pub use error::VerificationError;
pub use orchestrator::{verify, Orchestrator};
pub use result::{Verdict, VerificationOutcome};
