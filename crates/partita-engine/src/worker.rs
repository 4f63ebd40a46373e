//! Block workers: the forward, backward, and no-op analyses of one block.
//!
//! A worker owns its block's private state (`last_precondition`,
//! `last_postcondition`, `reported_violation`). The orchestrator guarantees
//! that at most one invocation per block runs at a time.

use std::sync::Arc;

use partita_ir::{Block, BlockId, LocationId};
use partita_smt::{Formula, SatSolver};
use tracing::debug;

use crate::message::Message;
use crate::oracle::{BlockOracle, Direction, ExplorationStatus, OracleError};
use crate::shutdown::ShutdownNotifier;

/// True if `last` and `incoming` are jointly unsatisfiable, in which case
/// `incoming` cannot add behaviour compatible with what is already known.
pub fn cannot_continue<S: SatSolver + ?Sized>(
    solver: &mut S,
    last: &Formula,
    incoming: &Formula,
) -> Result<bool, S::Error> {
    solver.is_unsat(&Formula::conjunction([last.clone(), incoming.clone()]))
}

/// Explores a block from its entry and summarizes what reaches the exit.
#[derive(Debug, Clone)]
pub struct ForwardWorker {
    block: Arc<Block>,
    last_precondition: Option<Formula>,
    reported_violation: bool,
    status: ExplorationStatus,
    runs: u64,
}

impl ForwardWorker {
    pub fn new(block: Arc<Block>) -> Self {
        Self {
            block,
            last_precondition: None,
            reported_violation: false,
            status: ExplorationStatus::SOUND_AND_PRECISE,
            runs: 0,
        }
    }

    /// Run the oracle forward from `entry` under `precondition`.
    ///
    /// Returns at most two messages: an error-condition seed for the first
    /// real violation this worker ever sees, and the block postcondition.
    pub fn process<O: BlockOracle + ?Sized>(
        &mut self,
        oracle: &O,
        precondition: Formula,
        entry: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Vec<Message>, OracleError> {
        shutdown.shutdown_if_necessary()?;
        let exploration =
            oracle.explore(&self.block, Direction::Forward, &precondition, entry, shutdown)?;
        self.last_precondition = Some(precondition);
        self.status = exploration.status;
        self.runs += 1;

        let id = self.block.id();
        let end = self.block.end_location();
        let from_root = self.block.is_root();
        let mut answers = Vec::with_capacity(2);

        if !self.reported_violation {
            let violation = exploration
                .reached
                .iter()
                .find(|s| s.is_violation() && s.location != end);
            if let Some(state) = violation {
                debug!(block = %id, location = state.location, "violation reached inside block");
                self.reported_violation = true;
                answers.push(Message::error_condition(
                    id.clone(),
                    state.location,
                    Formula::tt(),
                    from_root,
                ));
            }
        }

        let at_end: Vec<Formula> = exploration
            .states_at(end)
            .map(|s| s.formula.clone())
            .collect();
        if !at_end.is_empty() || from_root {
            let postcondition = if at_end.is_empty() {
                Formula::tt()
            } else {
                Formula::disjunction(at_end)
            };
            answers.push(Message::postcondition(
                id.clone(),
                end,
                postcondition,
                from_root,
            ));
        }
        Ok(answers)
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn last_precondition(&self) -> Option<&Formula> {
        self.last_precondition.as_ref()
    }

    pub fn reported_violation(&self) -> bool {
        self.reported_violation
    }

    pub fn status(&self) -> ExplorationStatus {
        self.status
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Explores a block backwards from a violation condition at its exit (or at
/// an internal violation location) and reports the condition at its entry.
#[derive(Debug, Clone)]
pub struct BackwardWorker {
    block: Arc<Block>,
    last_postcondition: Option<Formula>,
    status: ExplorationStatus,
    runs: u64,
}

impl BackwardWorker {
    pub fn new(block: Arc<Block>) -> Self {
        Self {
            block,
            last_postcondition: None,
            status: ExplorationStatus::SOUND_AND_PRECISE,
            runs: 0,
        }
    }

    /// Run the oracle backward from `exit` under `postcondition`.
    ///
    /// Always returns exactly one message: `ERROR_UNREACHABLE` if no state
    /// reaches the block start (and the block owns edges), otherwise an
    /// `ERROR_CONDITION` anchored at the block start.
    pub fn process<O: BlockOracle + ?Sized>(
        &mut self,
        oracle: &O,
        postcondition: Formula,
        exit: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Vec<Message>, OracleError> {
        shutdown.shutdown_if_necessary()?;
        let exploration =
            oracle.explore(&self.block, Direction::Backward, &postcondition, exit, shutdown)?;
        self.last_postcondition = Some(postcondition);
        self.status = exploration.status;
        self.runs += 1;

        let id = self.block.id();
        let start = self.block.start_location();
        let start_formula =
            Formula::disjunction(exploration.states_at(start).map(|s| s.formula.clone()));
        if start_formula.is_false() && !self.block.is_empty() {
            debug!(block = %id, "violation unreachable through block");
            return Ok(vec![Message::error_unreachable(id.clone(), start)]);
        }
        // Reaching a block without predecessors with a satisfiable condition
        // means the violation is reachable from the program entry.
        Ok(vec![Message::error_condition(
            id.clone(),
            start,
            start_formula,
            self.block.is_root(),
        )])
    }

    pub fn block(&self) -> &Arc<Block> {
        &self.block
    }

    pub fn last_postcondition(&self) -> Option<&Formula> {
        self.last_postcondition.as_ref()
    }

    pub fn status(&self) -> ExplorationStatus {
        self.status
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Which analysis a [`BlockWorker`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum WorkerKind {
    Forward,
    Backward,
    Noop,
}

/// A block's analysis in one direction, dispatched uniformly.
#[derive(Debug, Clone)]
pub enum BlockWorker {
    Forward(ForwardWorker),
    Backward(BackwardWorker),
    /// Analysis intentionally disabled for this block and direction.
    Noop(BlockId),
}

impl BlockWorker {
    pub fn forward(block: Arc<Block>) -> Self {
        BlockWorker::Forward(ForwardWorker::new(block))
    }

    pub fn backward(block: Arc<Block>) -> Self {
        BlockWorker::Backward(BackwardWorker::new(block))
    }

    pub fn noop(block: &Block) -> Self {
        BlockWorker::Noop(block.id().clone())
    }

    pub fn kind(&self) -> WorkerKind {
        match self {
            BlockWorker::Forward(_) => WorkerKind::Forward,
            BlockWorker::Backward(_) => WorkerKind::Backward,
            BlockWorker::Noop(_) => WorkerKind::Noop,
        }
    }

    /// Feed one incoming condition anchored at `location` to the worker.
    pub fn process<O: BlockOracle + ?Sized>(
        &mut self,
        oracle: &O,
        condition: Formula,
        location: LocationId,
        shutdown: &ShutdownNotifier,
    ) -> Result<Vec<Message>, OracleError> {
        match self {
            BlockWorker::Forward(worker) => worker.process(oracle, condition, location, shutdown),
            BlockWorker::Backward(worker) => worker.process(oracle, condition, location, shutdown),
            BlockWorker::Noop(_) => Ok(Vec::new()),
        }
    }

    pub fn status(&self) -> ExplorationStatus {
        match self {
            BlockWorker::Forward(worker) => worker.status(),
            BlockWorker::Backward(worker) => worker.status(),
            BlockWorker::Noop(_) => ExplorationStatus::SOUND_AND_PRECISE,
        }
    }

    pub fn runs(&self) -> u64 {
        match self {
            BlockWorker::Forward(worker) => worker.runs(),
            BlockWorker::Backward(worker) => worker.runs(),
            BlockWorker::Noop(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::oracle::{Exploration, ReachedState};
    use parking_lot::Mutex;
    use partita_ir::GraphEdge;
    use partita_smt::backends::truth_table::TruthTableSolver;

    /// Returns the same exploration on every call and counts invocations.
    struct FixedOracle {
        exploration: Exploration,
        calls: Mutex<usize>,
    }

    impl FixedOracle {
        fn new(reached: Vec<ReachedState>) -> Self {
            Self {
                exploration: Exploration::new(reached),
                calls: Mutex::new(0),
            }
        }
    }

    impl BlockOracle for FixedOracle {
        fn explore(
            &self,
            _block: &Block,
            _direction: Direction,
            _condition: &Formula,
            _location: LocationId,
            _shutdown: &ShutdownNotifier,
        ) -> Result<Exploration, OracleError> {
            *self.calls.lock() += 1;
            Ok(self.exploration.clone())
        }
    }

    struct FailingOracle;

    impl BlockOracle for FailingOracle {
        fn explore(
            &self,
            _block: &Block,
            _direction: Direction,
            _condition: &Formula,
            _location: LocationId,
            _shutdown: &ShutdownNotifier,
        ) -> Result<Exploration, OracleError> {
            Err(OracleError::Analysis("solver crashed".into()))
        }
    }

    fn root_block() -> Arc<Block> {
        Arc::new(
            Block::new("entry", 0, 5)
                .with_successor("exit")
                .with_edge(GraphEdge::new(0, 5, "x = 1")),
        )
    }

    fn inner_block() -> Arc<Block> {
        Arc::new(
            Block::new("mid", 5, 9)
                .with_predecessor("entry")
                .with_edge(GraphEdge::new(5, 9, "y = x")),
        )
    }

    #[test]
    fn root_block_reports_vacuous_postcondition() {
        let oracle = FixedOracle::new(vec![ReachedState::at(2, Formula::var("p"))]);
        let mut worker = ForwardWorker::new(root_block());
        let messages = worker
            .process(&oracle, Formula::tt(), 0, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::Postcondition);
        assert!(messages[0].formula().is_true());
        assert!(messages[0].is_from_root());
        assert_eq!(messages[0].target_location(), 5);
    }

    #[test]
    fn inner_block_without_exit_states_stays_silent() {
        let oracle = FixedOracle::new(vec![ReachedState::at(7, Formula::var("p"))]);
        let mut worker = ForwardWorker::new(inner_block());
        let messages = worker
            .process(&oracle, Formula::var("q"), 5, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert!(messages.is_empty());
        assert_eq!(worker.last_precondition(), Some(&Formula::var("q")));
    }

    #[test]
    fn exit_states_are_disjoined() {
        let oracle = FixedOracle::new(vec![
            ReachedState::at(9, Formula::var("a")),
            ReachedState::at(9, Formula::var("b")),
        ]);
        let mut worker = ForwardWorker::new(inner_block());
        let messages = worker
            .process(&oracle, Formula::tt(), 5, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].formula(),
            &Formula::Or(vec![Formula::var("a"), Formula::var("b")])
        );
        assert!(!messages[0].is_from_root());
    }

    #[test]
    fn violation_is_reported_at_most_once() {
        let oracle = FixedOracle::new(vec![
            ReachedState::at(7, Formula::tt()).target(),
            ReachedState::at(9, Formula::var("a")),
        ]);
        let mut worker = ForwardWorker::new(inner_block());
        let shutdown = ShutdownNotifier::new();

        let first = worker
            .process(&oracle, Formula::tt(), 5, &shutdown)
            .expect("oracle succeeds");
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].kind(), MessageKind::ErrorCondition);
        assert_eq!(first[0].target_location(), 7);
        assert!(first[0].formula().is_true());
        assert!(worker.reported_violation());

        for _ in 0..3 {
            let again = worker
                .process(&oracle, Formula::var("z"), 5, &shutdown)
                .expect("oracle succeeds");
            assert!(again
                .iter()
                .all(|m| m.kind() != MessageKind::ErrorCondition));
        }
        assert_eq!(worker.runs(), 4);
    }

    #[test]
    fn entry_markers_and_exit_targets_are_not_violations() {
        let oracle = FixedOracle::new(vec![
            ReachedState::at(5, Formula::tt()).entry_marker(),
            ReachedState::at(9, Formula::tt()).target(),
        ]);
        let mut worker = ForwardWorker::new(inner_block());
        let messages = worker
            .process(&oracle, Formula::tt(), 5, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::Postcondition);
        assert!(!worker.reported_violation());
    }

    #[test]
    fn backward_without_start_states_is_unreachable() {
        let oracle = FixedOracle::new(vec![ReachedState::at(7, Formula::var("a"))]);
        let mut worker = BackwardWorker::new(inner_block());
        let messages = worker
            .process(&oracle, Formula::var("e"), 9, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::ErrorUnreachable);
        assert_eq!(worker.last_postcondition(), Some(&Formula::var("e")));
    }

    #[test]
    fn backward_on_empty_block_passes_false_through() {
        let block = Arc::new(Block::new("hop", 5, 5).with_predecessor("entry"));
        let oracle = FixedOracle::new(Vec::new());
        let mut worker = BackwardWorker::new(block);
        let messages = worker
            .process(&oracle, Formula::var("e"), 5, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages[0].kind(), MessageKind::ErrorCondition);
        assert!(messages[0].formula().is_false());
    }

    #[test]
    fn backward_reports_start_condition() {
        let oracle = FixedOracle::new(vec![
            ReachedState::at(5, Formula::var("a")),
            ReachedState::at(5, Formula::var("b")),
        ]);
        let mut worker = BackwardWorker::new(inner_block());
        let messages = worker
            .process(&oracle, Formula::tt(), 9, &ShutdownNotifier::new())
            .expect("oracle succeeds");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), MessageKind::ErrorCondition);
        assert_eq!(messages[0].target_location(), 5);
        assert_eq!(
            messages[0].formula(),
            &Formula::Or(vec![Formula::var("a"), Formula::var("b")])
        );
    }

    #[test]
    fn noop_never_calls_oracle() {
        let oracle = FixedOracle::new(vec![ReachedState::at(9, Formula::tt())]);
        let block = inner_block();
        let mut worker = BlockWorker::noop(&block);
        let messages = worker
            .process(&oracle, Formula::tt(), 5, &ShutdownNotifier::new())
            .expect("noop succeeds");
        assert!(messages.is_empty());
        assert_eq!(*oracle.calls.lock(), 0);
        assert_eq!(worker.kind(), WorkerKind::Noop);
    }

    #[test]
    fn oracle_errors_propagate() {
        let mut worker = BlockWorker::forward(inner_block());
        let err = worker
            .process(&FailingOracle, Formula::tt(), 5, &ShutdownNotifier::new())
            .unwrap_err();
        assert_eq!(err, OracleError::Analysis("solver crashed".into()));
        assert_eq!(worker.runs(), 0);
    }

    #[test]
    fn cancelled_worker_does_not_reach_oracle() {
        let oracle = FixedOracle::new(Vec::new());
        let shutdown = ShutdownNotifier::new();
        shutdown.request_shutdown();
        let mut worker = BlockWorker::backward(inner_block());
        let err = worker
            .process(&oracle, Formula::tt(), 9, &shutdown)
            .unwrap_err();
        assert_eq!(err, OracleError::Interrupted);
        assert_eq!(*oracle.calls.lock(), 0);
    }

    #[test]
    fn cannot_continue_detects_contradiction() {
        let mut solver = TruthTableSolver::default();
        let x = Formula::var("x");
        let Ok(blocked) = cannot_continue(&mut solver, &x, &x.clone().not());
        assert!(blocked);
        let Ok(blocked) = cannot_continue(&mut solver, &x, &Formula::var("y"));
        assert!(!blocked);
    }
}
