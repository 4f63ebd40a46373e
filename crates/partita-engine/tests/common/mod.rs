#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use partita_engine::oracle::{
    BlockOracle, Direction, Exploration, ExplorationStatus, OracleError, ReachedState,
};
use partita_engine::shutdown::ShutdownNotifier;
use partita_ir::{Block, BlockGraph, BlockId, GraphEdge, LocationId};
use partita_smt::Formula;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What the scripted oracle does for one block.
///
/// Forward runs reach the exit with `precondition ∧ transfer`; backward runs
/// reach the entry with `condition ∧ transfer ∧ guard`. A blocked block
/// reaches nothing in either direction.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub transfer: Formula,
    pub guard: Formula,
    pub blocked: bool,
    pub backward_blocked: bool,
    pub violation_at: Option<LocationId>,
    pub status: ExplorationStatus,
    pub fail: bool,
    /// Keep exploring until shutdown is observed.
    pub spin: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            transfer: Formula::tt(),
            guard: Formula::tt(),
            blocked: false,
            backward_blocked: false,
            violation_at: None,
            status: ExplorationStatus::SOUND_AND_PRECISE,
            fail: false,
            spin: false,
        }
    }
}

impl Behaviour {
    pub fn violation_at(location: LocationId) -> Self {
        Self {
            violation_at: Some(location),
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct ScriptedOracle {
    behaviours: HashMap<BlockId, Behaviour>,
    calls: Mutex<Vec<(BlockId, Direction)>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, block: &str, behaviour: Behaviour) -> Self {
        self.behaviours.insert(BlockId::from(block), behaviour);
        self
    }

    pub fn calls(&self) -> Vec<(BlockId, Direction)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, block: &str, direction: Direction) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(id, d)| id.as_str() == block && *d == direction)
            .count()
    }
}

impl BlockOracle for ScriptedOracle {
    fn explore(
        &self,
        block: &Block,
        direction: Direction,
        condition: &Formula,
        location: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Exploration, OracleError> {
        self.calls.lock().push((block.id().clone(), direction));
        let behaviour = self.behaviours.get(block.id()).cloned().unwrap_or_default();

        if behaviour.spin {
            loop {
                shutdown.shutdown_if_necessary()?;
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        if behaviour.fail {
            return Err(OracleError::Analysis(format!(
                "unsupported construct in {}",
                block.id()
            )));
        }

        let mut reached = Vec::new();
        match direction {
            Direction::Forward if !behaviour.blocked => {
                let formula = condition.clone().and(behaviour.transfer.clone());
                if let Some(violation) = behaviour.violation_at {
                    reached.push(ReachedState::at(violation, formula.clone()).target());
                }
                reached.push(ReachedState::at(block.end_location(), formula));
            }
            Direction::Backward if !behaviour.blocked && !behaviour.backward_blocked => {
                if location != block.start_location() {
                    reached.push(ReachedState::at(location, condition.clone()).entry_marker());
                }
                reached.push(ReachedState::at(
                    block.start_location(),
                    Formula::conjunction([
                        condition.clone(),
                        behaviour.transfer.clone(),
                        behaviour.guard.clone(),
                    ]),
                ));
            }
            _ => {}
        }
        Ok(Exploration::new(reached).with_status(behaviour.status))
    }
}

/// `Entry (0..5) → Exit (5..9)`.
pub fn two_block_chain() -> BlockGraph {
    BlockGraph::build(
        "Entry",
        [
            Block::new("Entry", 0, 5)
                .with_successor("Exit")
                .with_edges([GraphEdge::new(0, 2, "x = 0"), GraphEdge::new(2, 5, "y = x")]),
            Block::new("Exit", 5, 9)
                .with_predecessor("Entry")
                .with_edge(GraphEdge::new(5, 9, "assert(y == 0)")),
        ],
    )
    .expect("valid chain")
}

/// `A → {B, C} → D`, violation location 35 lies inside `D`.
pub fn diamond() -> BlockGraph {
    BlockGraph::build(
        "A",
        [
            Block::new("A", 0, 10)
                .with_successor("B")
                .with_successor("C")
                .with_edge(GraphEdge::new(0, 10, "x = nondet()")),
            Block::new("B", 10, 20)
                .with_predecessor("A")
                .with_successor("D")
                .with_edge(GraphEdge::new(10, 20, "[x > 0]")),
            Block::new("C", 10, 30)
                .with_predecessor("A")
                .with_successor("D")
                .with_edge(GraphEdge::new(10, 30, "[x <= 0]")),
            Block::new("D", 20, 40)
                .with_predecessor("B")
                .with_predecessor("C")
                .with_edges([
                    GraphEdge::new(20, 35, "[x == 0]"),
                    GraphEdge::new(35, 40, "return"),
                ]),
        ],
    )
    .expect("valid diamond")
}

pub fn ids(names: &[&str]) -> Vec<BlockId> {
    names.iter().copied().map(BlockId::from).collect()
}
