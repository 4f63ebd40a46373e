//! Interface to the per-block reachability analysis.
//!
//! The oracle is whatever explores a single block (predicate abstraction,
//! value analysis, ...). The core only needs the reached states tagged with
//! their location, their formula, and whether they are targets.

use std::fmt;
use std::sync::Arc;

use partita_ir::{Block, LocationId};
use partita_smt::Formula;
use thiserror::Error;

use crate::shutdown::ShutdownNotifier;

/// Exploration direction within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// One abstract state reached by an exploration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachedState {
    pub location: LocationId,
    pub formula: Formula,
    /// The state realizes the property violation being checked.
    pub is_target: bool,
    /// The state is only tagged as target because exploration started
    /// there; it is not a real violation.
    pub is_entry_marker: bool,
}

impl ReachedState {
    pub fn at(location: LocationId, formula: Formula) -> Self {
        Self {
            location,
            formula,
            is_target: false,
            is_entry_marker: false,
        }
    }

    pub fn target(mut self) -> Self {
        self.is_target = true;
        self
    }

    pub fn entry_marker(mut self) -> Self {
        self.is_target = true;
        self.is_entry_marker = true;
        self
    }

    /// A target that is not merely the start-of-exploration marker.
    pub fn is_violation(&self) -> bool {
        self.is_target && !self.is_entry_marker
    }
}

/// Completion status of an exploration.
///
/// An unsound exploration may have missed states, so it cannot support a
/// `SAFE` verdict; an imprecise one may report spurious states, so it cannot
/// support `UNSAFE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorationStatus {
    pub is_sound: bool,
    pub is_precise: bool,
}

impl ExplorationStatus {
    pub const SOUND_AND_PRECISE: ExplorationStatus = ExplorationStatus {
        is_sound: true,
        is_precise: true,
    };

    pub fn with_sound(self, is_sound: bool) -> Self {
        Self { is_sound, ..self }
    }

    pub fn with_precise(self, is_precise: bool) -> Self {
        Self { is_precise, ..self }
    }

    /// Combined status of two explorations.
    pub fn update(self, other: ExplorationStatus) -> Self {
        Self {
            is_sound: self.is_sound && other.is_sound,
            is_precise: self.is_precise && other.is_precise,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.is_sound && self.is_precise
    }
}

impl Default for ExplorationStatus {
    fn default() -> Self {
        Self::SOUND_AND_PRECISE
    }
}

/// Everything one oracle call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exploration {
    pub reached: Vec<ReachedState>,
    pub status: ExplorationStatus,
}

impl Exploration {
    pub fn new(reached: Vec<ReachedState>) -> Self {
        Self {
            reached,
            status: ExplorationStatus::SOUND_AND_PRECISE,
        }
    }

    pub fn with_status(mut self, status: ExplorationStatus) -> Self {
        self.status = status;
        self
    }

    /// States located at `location`.
    pub fn states_at(&self, location: LocationId) -> impl Iterator<Item = &ReachedState> {
        self.reached.iter().filter(move |s| s.location == location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Solver failure, internal inconsistency, unsupported construct.
    #[error("analysis failed: {0}")]
    Analysis(String),
    /// Cooperative cancellation observed inside the oracle.
    #[error("analysis interrupted")]
    Interrupted,
}

/// Per-block reachability analysis.
///
/// `explore` starts at `location` with `condition` and explores `block` in
/// `direction`. Implementations should poll `shutdown` during long runs
/// and return [`OracleError::Interrupted`] when it fires.
pub trait BlockOracle: Send + Sync {
    fn explore(
        &self,
        block: &Block,
        direction: Direction,
        condition: &Formula,
        location: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Exploration, OracleError>;
}

impl<T: BlockOracle + ?Sized> BlockOracle for Arc<T> {
    fn explore(
        &self,
        block: &Block,
        direction: Direction,
        condition: &Formula,
        location: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Exploration, OracleError> {
        (**self).explore(block, direction, condition, location, shutdown)
    }
}
