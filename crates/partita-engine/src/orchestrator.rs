//! Message routing between block workers and verdict computation.
//!
//! The orchestrator keeps one inbox per block and a FIFO of ready blocks.
//! A block is `Idle` with an empty inbox, `Pending` while queued, and
//! `Running` while one of its workers executes; it is never dispatched twice
//! concurrently, so worker state needs no finer locking than the per-block
//! mutex. Workers run inline (sequential scheduling) or on a rayon pool and
//! report back over a crossbeam channel, which only the coordinating thread
//! reads. Routing, short-circuit checks, and solver calls all happen on that
//! thread, so the solver is never shared.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;
use parking_lot::Mutex;
use partita_ir::{Block, BlockGraph, BlockId, LocationId};
use partita_smt::{Formula, SatResult, SatSolver};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::error::VerificationError;
use crate::message::{Message, MessageKind};
use crate::options::{AnalysisDirections, OrchestratorOptions, Scheduling};
use crate::oracle::{BlockOracle, Direction, ExplorationStatus, OracleError};
use crate::result::{
    BlockDiagnostics, RunStatistics, UnknownReason, Verdict, VerificationOutcome,
    ViolationWitness,
};
use crate::shutdown::{deadline_from_timeout_secs, ShutdownNotifier, ShutdownReason};
use crate::trace::MessageLog;
use crate::worker::{cannot_continue, BlockWorker};

/// How often the coordinator wakes up to observe shutdown while workers run.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Scheduling state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Idle,
    Pending,
    Running,
}

/// The forward and backward worker of one block.
#[derive(Debug)]
pub struct BlockWorkers {
    pub forward: BlockWorker,
    pub backward: BlockWorker,
}

impl BlockWorkers {
    fn new(block: &Arc<Block>, directions: AnalysisDirections) -> Self {
        Self {
            forward: if directions.forward {
                BlockWorker::forward(Arc::clone(block))
            } else {
                BlockWorker::noop(block)
            },
            backward: if directions.backward {
                BlockWorker::backward(Arc::clone(block))
            } else {
                BlockWorker::noop(block)
            },
        }
    }

    fn for_direction(&mut self, direction: Direction) -> &mut BlockWorker {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
        }
    }
}

/// A message addressed to one worker of one block.
#[derive(Debug, Clone)]
struct Delivery {
    message: Message,
    direction: Direction,
    /// Entry location (forward) or exit/violation location (backward).
    location: LocationId,
    /// Blocks an error condition passed through, starting at its seed.
    trail: Vec<BlockId>,
}

struct BlockSlot {
    block: Arc<Block>,
    workers: Arc<Mutex<BlockWorkers>>,
    directions: AnalysisDirections,
    state: BlockState,
    inbox: VecDeque<Delivery>,
    parked: Vec<Delivery>,
    /// Disjunction of every postcondition this block emitted.
    summary: Option<Formula>,
}

struct Completion {
    block: BlockId,
    delivery: Delivery,
    result: Result<(Vec<Message>, ExplorationStatus), OracleError>,
}

enum Ending {
    Drained,
    Violation(ViolationWitness),
    Stopped(UnknownReason),
}

/// Drives one verification run over a [`BlockGraph`].
pub struct Orchestrator<O, S> {
    graph: Arc<BlockGraph>,
    oracle: Arc<O>,
    solver: S,
    options: OrchestratorOptions,
    shutdown: ShutdownNotifier,
    pool: Option<ThreadPool>,
    slots: IndexMap<BlockId, BlockSlot>,
    ready: VecDeque<BlockId>,
    statistics: RunStatistics,
    status: ExplorationStatus,
    /// First reason a drained run cannot be reported as SAFE.
    safe_blocker: Option<UnknownReason>,
    /// First reason a violation cannot be reported as UNSAFE.
    unsafe_blocker: Option<UnknownReason>,
    message_log: Option<MessageLog>,
    started: Instant,
}

impl<O, S> Orchestrator<O, S>
where
    O: BlockOracle + 'static,
    S: SatSolver,
{
    pub fn new(
        graph: BlockGraph,
        oracle: O,
        solver: S,
        options: OrchestratorOptions,
    ) -> Result<Self, VerificationError> {
        if let Some(unknown) = options.directions.keys().find(|id| !graph.contains(id)) {
            return Err(VerificationError::UnknownBlock(unknown.clone()));
        }

        let pool = match options.scheduling {
            Scheduling::Sequential => None,
            Scheduling::Parallel { .. } => Some(
                ThreadPoolBuilder::new()
                    .num_threads(options.scheduling.capacity())
                    .thread_name(|i| format!("partita-worker-{i}"))
                    .build()
                    .map_err(|e| VerificationError::WorkerPool(e.to_string()))?,
            ),
        };

        let slots = graph
            .blocks()
            .map(|block| {
                let directions = options.directions_for(block.id());
                let slot = BlockSlot {
                    block: Arc::clone(block),
                    workers: Arc::new(Mutex::new(BlockWorkers::new(block, directions))),
                    directions,
                    state: BlockState::Idle,
                    inbox: VecDeque::new(),
                    parked: Vec::new(),
                    summary: None,
                };
                (block.id().clone(), slot)
            })
            .collect();

        let message_log = options
            .record_message_log
            .then(|| MessageLog::new(graph.blocks().map(|b| &**b)));

        Ok(Self {
            graph: Arc::new(graph),
            oracle: Arc::new(oracle),
            solver,
            options,
            shutdown: ShutdownNotifier::new(),
            pool,
            slots,
            ready: VecDeque::new(),
            statistics: RunStatistics::default(),
            status: ExplorationStatus::SOUND_AND_PRECISE,
            safe_blocker: None,
            unsafe_blocker: None,
            message_log,
            started: Instant::now(),
        })
    }

    /// Use `shutdown` as the run's cancellation token.
    pub fn with_shutdown(mut self, shutdown: ShutdownNotifier) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// A handle that cancels this run when triggered.
    pub fn shutdown_notifier(&self) -> ShutdownNotifier {
        self.shutdown.clone()
    }

    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    /// Run until a verdict is reached.
    pub fn run(mut self) -> VerificationOutcome {
        self.started = Instant::now();
        // Run-private token: stopping leftover workers must not trip the caller's.
        self.shutdown = self
            .shutdown
            .with_deadline(deadline_from_timeout_secs(self.options.timeout_secs))
            .child();

        info!(
            blocks = self.graph.len(),
            root = %self.graph.root_id(),
            "starting block-wise verification"
        );
        if self.graph.has_cycle() {
            warn!("block graph is cyclic; termination depends on the block oracle");
        }

        let root = Arc::clone(self.graph.root());
        let seed = Message::postcondition(
            root.id().clone(),
            root.start_location(),
            Formula::tt(),
            true,
        );
        self.enqueue(
            root.id(),
            Delivery {
                message: seed,
                direction: Direction::Forward,
                location: root.start_location(),
                trail: Vec::new(),
            },
        );

        let (sender, receiver) = unbounded();
        let ending = self.drive(&sender, &receiver);
        self.finish(ending)
    }

    fn drive(&mut self, sender: &Sender<Completion>, receiver: &Receiver<Completion>) -> Ending {
        let capacity = self.options.scheduling.capacity();
        let mut in_flight = 0usize;
        loop {
            if let Some(reason) = self.shutdown.reason() {
                return Ending::Stopped(stop_reason(reason));
            }
            while in_flight < capacity && !self.ready.is_empty() {
                if let Some(limit) = self.options.max_dispatches {
                    if self.statistics.dispatches >= limit as u64 {
                        return Ending::Stopped(UnknownReason::BudgetExhausted { dispatches: limit });
                    }
                }
                let Some(id) = self.ready.pop_front() else {
                    break;
                };
                if self.dispatch(id, sender) {
                    in_flight += 1;
                }
            }
            if in_flight == 0 {
                return Ending::Drained;
            }

            let completion = match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(completion) => completion,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ending::Drained,
            };
            in_flight -= 1;
            if let Some(ending) = self.complete(completion) {
                return ending;
            }
        }
    }

    fn dispatch(&mut self, id: BlockId, sender: &Sender<Completion>) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        let Some(delivery) = slot.inbox.pop_front() else {
            slot.state = BlockState::Idle;
            return false;
        };
        slot.state = BlockState::Running;
        self.statistics.dispatches += 1;
        debug!(
            block = %id,
            direction = %delivery.direction,
            location = delivery.location,
            "dispatching {}",
            delivery.message.kind()
        );

        let workers = Arc::clone(&slot.workers);
        let oracle = Arc::clone(&self.oracle);
        let shutdown = self.shutdown.clone();
        let sender = sender.clone();
        let task = move || {
            let result = {
                let mut guard = workers.lock();
                let worker = guard.for_direction(delivery.direction);
                worker
                    .process(
                        &*oracle,
                        delivery.message.formula().clone(),
                        delivery.location,
                        &shutdown,
                    )
                    .map(|messages| (messages, worker.status()))
            };
            // Fails only once the run has already decided.
            let _ = sender.send(Completion {
                block: id,
                delivery,
                result,
            });
        };
        match &self.pool {
            Some(pool) => pool.spawn(task),
            None => task(),
        }
        true
    }

    fn complete(&mut self, completion: Completion) -> Option<Ending> {
        let Completion {
            block: id,
            delivery,
            result,
        } = completion;
        let Some(slot) = self.slots.get_mut(&id) else {
            return None;
        };
        if slot.inbox.is_empty() {
            slot.state = BlockState::Idle;
        } else {
            slot.state = BlockState::Pending;
            self.ready.push_back(id.clone());
        }
        let block = Arc::clone(&slot.block);
        let enabled = match delivery.direction {
            Direction::Forward => slot.directions.forward,
            Direction::Backward => slot.directions.backward,
        };

        let (messages, status) = match result {
            Ok(output) => output,
            Err(OracleError::Interrupted) => {
                let reason = self.shutdown.reason().unwrap_or(ShutdownReason::Requested);
                return Some(Ending::Stopped(stop_reason(reason)));
            }
            Err(OracleError::Analysis(message)) => {
                warn!(block = %id, "block analysis failed: {message}");
                return Some(Ending::Stopped(UnknownReason::Failed(
                    VerificationError::Analysis { block: id, message },
                )));
            }
        };

        match (delivery.direction, enabled) {
            (Direction::Forward, true) => self.statistics.forward_invocations += 1,
            (Direction::Backward, true) => self.statistics.backward_invocations += 1,
            _ => self.statistics.noop_invocations += 1,
        }
        self.record_status(&id, status);

        let mut summary_grew = false;
        for message in messages {
            self.statistics.count_message(message.kind());
            if let Some(log) = &mut self.message_log {
                log.record(self.started.elapsed().as_millis(), &message);
            }
            match message.kind() {
                MessageKind::Postcondition => {
                    self.extend_summary(&id, message.formula());
                    summary_grew = true;
                    self.route_postcondition(&block, &message);
                }
                MessageKind::ErrorCondition => {
                    let seed = delivery.direction == Direction::Forward;
                    match self.route_error_condition(&block, message, &delivery.trail, seed) {
                        Ok(Some(ending)) => return Some(ending),
                        Ok(None) => {}
                        Err(err) => return Some(Ending::Stopped(UnknownReason::Failed(err))),
                    }
                }
                MessageKind::ErrorUnreachable => {
                    debug!(block = %id, "block proved the violation unreachable");
                }
            }
        }
        if summary_grew {
            if let Err(err) = self.release_parked(&id) {
                return Some(Ending::Stopped(UnknownReason::Failed(err)));
            }
        }
        None
    }

    fn record_status(&mut self, id: &BlockId, status: ExplorationStatus) {
        self.status = self.status.update(status);
        if !status.is_sound && self.safe_blocker.is_none() {
            self.safe_blocker = Some(UnknownReason::Incomplete {
                block: id.clone(),
                detail: "exploration may have missed states".to_string(),
            });
        }
        if !status.is_precise && self.unsafe_blocker.is_none() {
            self.unsafe_blocker = Some(UnknownReason::Incomplete {
                block: id.clone(),
                detail: "exploration may report spurious states".to_string(),
            });
        }
    }

    fn enqueue(&mut self, id: &BlockId, delivery: Delivery) {
        let Some(slot) = self.slots.get_mut(id) else {
            warn!(block = %id, "dropping message for unknown block");
            return;
        };
        slot.inbox.push_back(delivery);
        if slot.state == BlockState::Idle {
            slot.state = BlockState::Pending;
            self.ready.push_back(id.clone());
        }
    }

    fn extend_summary(&mut self, id: &BlockId, postcondition: &Formula) {
        if let Some(slot) = self.slots.get_mut(id) {
            slot.summary = Some(match slot.summary.take() {
                None => postcondition.clone(),
                Some(summary) => Formula::disjunction([summary, postcondition.clone()]),
            });
        }
    }

    fn route_postcondition(&mut self, block: &Block, message: &Message) {
        for successor in block.successors() {
            let Some(entry) = self.slots.get(successor).map(|s| s.block.start_location()) else {
                continue;
            };
            self.enqueue(
                successor,
                Delivery {
                    message: message.clone(),
                    direction: Direction::Forward,
                    location: entry,
                    trail: Vec::new(),
                },
            );
        }
    }

    fn route_error_condition(
        &mut self,
        block: &Block,
        message: Message,
        trail: &[BlockId],
        seed: bool,
    ) -> Result<Option<Ending>, VerificationError> {
        // A violation seed from the forward analysis is explored backwards
        // within the same block first, wherever it is anchored.
        if seed {
            info!(
                block = %block.id(),
                location = message.target_location(),
                "violation found, starting backward analysis"
            );
            let location = message.target_location();
            self.enqueue(
                block.id(),
                Delivery {
                    message,
                    direction: Direction::Backward,
                    location,
                    trail: vec![block.id().clone()],
                },
            );
            return Ok(None);
        }

        if block.is_root() {
            return self.check_entry_condition(block, &message, trail);
        }

        for predecessor in block.predecessors() {
            let Some(slot) = self.slots.get(predecessor) else {
                continue;
            };
            let mut pred_trail = trail.to_vec();
            pred_trail.push(predecessor.clone());
            let delivery = Delivery {
                message: message.clone(),
                direction: Direction::Backward,
                location: slot.block.end_location(),
                trail: pred_trail,
            };

            let blocked = if self.options.short_circuit && slot.directions.forward {
                match &slot.summary {
                    None => true,
                    Some(summary) => cannot_continue(&mut self.solver, summary, message.formula())
                        .map_err(|e| VerificationError::Solver(e.to_string()))?,
                }
            } else {
                false
            };
            if blocked {
                debug!(
                    block = %predecessor,
                    from = %block.id(),
                    "error condition contradicts forward summary, parking"
                );
                self.statistics.short_circuited += 1;
                if let Some(slot) = self.slots.get_mut(predecessor) {
                    slot.parked.push(delivery);
                }
                continue;
            }
            self.enqueue(predecessor, delivery);
        }
        Ok(None)
    }

    fn check_entry_condition(
        &mut self,
        block: &Block,
        message: &Message,
        trail: &[BlockId],
    ) -> Result<Option<Ending>, VerificationError> {
        let (result, model) = self
            .solver
            .check_sat_with_model(message.formula())
            .map_err(|e| VerificationError::Solver(e.to_string()))?;
        match result {
            SatResult::Sat => {
                if let Some(reason) = self.unsafe_blocker.clone() {
                    warn!(block = %block.id(), "violation reached entry, but an exploration was imprecise");
                    return Ok(Some(Ending::Stopped(reason)));
                }
                let block_chain: Vec<BlockId> = trail.iter().rev().cloned().collect();
                info!(
                    block = %block.id(),
                    chain_len = block_chain.len(),
                    "satisfiable violation condition reached program entry"
                );
                Ok(Some(Ending::Violation(ViolationWitness {
                    formula: message.formula().clone(),
                    model,
                    block_chain,
                })))
            }
            SatResult::Unsat => {
                debug!(block = %block.id(), "violation condition at entry is unsatisfiable");
                Ok(None)
            }
            SatResult::Unknown(reason) => {
                warn!(block = %block.id(), "solver could not decide entry condition: {reason}");
                if self.safe_blocker.is_none() {
                    self.safe_blocker = Some(UnknownReason::Incomplete {
                        block: block.id().clone(),
                        detail: format!("solver could not decide entry condition: {reason}"),
                    });
                }
                Ok(None)
            }
        }
    }

    /// Re-check parked error conditions of `id` against its grown summary.
    fn release_parked(&mut self, id: &BlockId) -> Result<(), VerificationError> {
        let Some(slot) = self.slots.get_mut(id) else {
            return Ok(());
        };
        let Some(summary) = slot.summary.clone() else {
            return Ok(());
        };
        let mut released = Vec::new();
        let mut still_parked = Vec::new();
        for delivery in std::mem::take(&mut slot.parked) {
            let blocked = cannot_continue(&mut self.solver, &summary, delivery.message.formula())
                .map_err(|e| VerificationError::Solver(e.to_string()))?;
            if blocked {
                still_parked.push(delivery);
            } else {
                released.push(delivery);
            }
        }
        slot.parked = still_parked;

        for delivery in released {
            debug!(block = %id, "releasing parked error condition");
            self.statistics.released += 1;
            self.enqueue(id, delivery);
        }
        Ok(())
    }

    fn finish(mut self, ending: Ending) -> VerificationOutcome {
        if !matches!(ending, Ending::Drained) {
            // Workers may still be running on the pool; they hold their
            // block's lock until they observe this.
            self.shutdown.request_shutdown();
        }
        let (verdict, witness, unknown_reason) = match ending {
            Ending::Drained => {
                self.statistics.dropped =
                    self.slots.values().map(|s| s.parked.len() as u64).sum();
                match self.safe_blocker.take() {
                    Some(reason) => (Verdict::Unknown, None, Some(reason)),
                    None => (Verdict::Safe, None, None),
                }
            }
            Ending::Violation(witness) => (Verdict::Unsafe, Some(witness), None),
            Ending::Stopped(reason) => (Verdict::Unknown, None, Some(reason)),
        };
        self.statistics.set_elapsed(self.started.elapsed());

        info!(
            verdict = %verdict,
            dispatches = self.statistics.dispatches,
            elapsed_ms = self.statistics.elapsed_ms as u64,
            "block-wise verification finished"
        );
        if let Some(reason) = &unknown_reason {
            info!("verdict is unknown: {reason}");
        }

        VerificationOutcome {
            verdict,
            witness,
            unknown_reason,
            statistics: self.statistics,
            blocks: self.slots.values().map(diagnostics).collect(),
            message_log: self.message_log,
        }
    }
}

fn diagnostics(slot: &BlockSlot) -> BlockDiagnostics {
    let workers = slot.workers.lock();
    let (last_precondition, reported_violation) = match &workers.forward {
        BlockWorker::Forward(worker) => (
            worker.last_precondition().cloned(),
            worker.reported_violation(),
        ),
        _ => (None, false),
    };
    let last_postcondition = match &workers.backward {
        BlockWorker::Backward(worker) => worker.last_postcondition().cloned(),
        _ => None,
    };
    BlockDiagnostics {
        id: slot.block.id().clone(),
        forward: workers.forward.kind(),
        backward: workers.backward.kind(),
        last_precondition,
        last_postcondition,
        forward_summary: slot.summary.clone(),
        reported_violation,
        forward_runs: workers.forward.runs(),
        backward_runs: workers.backward.runs(),
        parked: slot.parked.len(),
    }
}

fn stop_reason(reason: ShutdownReason) -> UnknownReason {
    match reason {
        ShutdownReason::Requested => UnknownReason::Cancelled,
        ShutdownReason::DeadlineExceeded => UnknownReason::TimedOut,
    }
}

/// Build an orchestrator for `graph` and run it to a verdict.
pub fn verify<O, S>(
    graph: BlockGraph,
    oracle: O,
    solver: S,
    options: &OrchestratorOptions,
) -> Result<VerificationOutcome, VerificationError>
where
    O: BlockOracle + 'static,
    S: SatSolver,
{
    Ok(Orchestrator::new(graph, oracle, solver, options.clone())?.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Exploration;
    use partita_ir::GraphEdge;
    use partita_smt::backends::truth_table::TruthTableSolver;

    struct Silent;

    impl BlockOracle for Silent {
        fn explore(
            &self,
            _block: &Block,
            _direction: Direction,
            _condition: &Formula,
            _location: LocationId,
            _shutdown: &ShutdownNotifier,
        ) -> Result<Exploration, OracleError> {
            Ok(Exploration::default())
        }
    }

    fn chain() -> BlockGraph {
        BlockGraph::build(
            "A",
            [
                Block::new("A", 0, 5)
                    .with_successor("B")
                    .with_edge(GraphEdge::new(0, 5, "x = 1")),
                Block::new("B", 5, 9)
                    .with_predecessor("A")
                    .with_edge(GraphEdge::new(5, 9, "assert x")),
            ],
        )
        .expect("valid chain")
    }

    fn orchestrator(options: OrchestratorOptions) -> Orchestrator<Silent, TruthTableSolver> {
        Orchestrator::new(chain(), Silent, TruthTableSolver::default(), options)
            .expect("valid options")
    }

    fn error_condition_from_b(formula: Formula) -> Message {
        Message::error_condition(BlockId::from("B"), 5, formula, false)
    }

    #[test]
    fn idle_block_is_queued_once() {
        let mut orch = orchestrator(OrchestratorOptions::default());
        let b = BlockId::from("B");
        for _ in 0..2 {
            orch.enqueue(
                &b,
                Delivery {
                    message: Message::postcondition(BlockId::from("A"), 5, Formula::tt(), true),
                    direction: Direction::Forward,
                    location: 5,
                    trail: Vec::new(),
                },
            );
        }
        assert_eq!(orch.ready.len(), 1);
        assert_eq!(orch.slots[&b].state, BlockState::Pending);
        assert_eq!(orch.slots[&b].inbox.len(), 2);
    }

    #[test]
    fn error_condition_without_summary_is_parked() {
        let mut orch = orchestrator(OrchestratorOptions::default());
        let b = Arc::clone(&orch.slots[&BlockId::from("B")].block);
        let ending = orch
            .route_error_condition(&b, error_condition_from_b(Formula::var("x")), &[], false)
            .expect("solver is infallible");
        assert!(ending.is_none());
        assert_eq!(orch.statistics.short_circuited, 1);
        assert_eq!(orch.slots[&BlockId::from("A")].parked.len(), 1);
        assert!(orch.ready.is_empty());
    }

    #[test]
    fn parked_condition_is_released_when_summary_admits_it() {
        let mut orch = orchestrator(OrchestratorOptions::default());
        let a = BlockId::from("A");
        let b = Arc::clone(&orch.slots[&BlockId::from("B")].block);
        orch.route_error_condition(
            &b,
            error_condition_from_b(Formula::var("x")),
            &[b.id().clone()],
            false,
        )
        .expect("solver is infallible");

        orch.extend_summary(&a, &Formula::var("x").not());
        orch.release_parked(&a).expect("solver is infallible");
        assert_eq!(orch.statistics.released, 0);
        assert_eq!(orch.slots[&a].parked.len(), 1);

        orch.extend_summary(&a, &Formula::var("x"));
        orch.release_parked(&a).expect("solver is infallible");
        assert_eq!(orch.statistics.released, 1);
        assert!(orch.slots[&a].parked.is_empty());
        let delivery = &orch.slots[&a].inbox[0];
        assert_eq!(delivery.direction, Direction::Backward);
        assert_eq!(delivery.location, 5);
        assert_eq!(delivery.trail, vec![BlockId::from("B"), a.clone()]);
    }

    #[test]
    fn disabled_short_circuit_forwards_immediately() {
        let options = OrchestratorOptions {
            short_circuit: false,
            ..OrchestratorOptions::default()
        };
        let mut orch = orchestrator(options);
        let b = Arc::clone(&orch.slots[&BlockId::from("B")].block);
        orch.route_error_condition(&b, error_condition_from_b(Formula::var("x")), &[], false)
            .expect("solver is infallible");
        assert_eq!(orch.statistics.short_circuited, 0);
        assert_eq!(orch.ready, VecDeque::from([BlockId::from("A")]));
    }

    #[test]
    fn internal_violation_goes_to_own_backward_worker() {
        let mut orch = orchestrator(OrchestratorOptions::default());
        let b = Arc::clone(&orch.slots[&BlockId::from("B")].block);
        let seed = Message::error_condition(BlockId::from("B"), 7, Formula::tt(), false);
        orch.route_error_condition(&b, seed, &[], true).expect("solver is infallible");
        let delivery = &orch.slots[b.id()].inbox[0];
        assert_eq!(delivery.direction, Direction::Backward);
        assert_eq!(delivery.location, 7);
        assert_eq!(delivery.trail, vec![b.id().clone()]);
    }

    #[test]
    fn violation_at_block_start_still_seeds_own_block() {
        let mut orch = orchestrator(OrchestratorOptions::default());
        let a = Arc::clone(&orch.slots[&BlockId::from("A")].block);
        let seed = Message::error_condition(BlockId::from("A"), 0, Formula::tt(), false);
        let ending = orch
            .route_error_condition(&a, seed, &[], true)
            .expect("solver is infallible");
        assert!(ending.is_none());
        let delivery = &orch.slots[a.id()].inbox[0];
        assert_eq!(delivery.direction, Direction::Backward);
        assert_eq!(delivery.location, 0);
        assert_eq!(delivery.trail, vec![a.id().clone()]);
    }

    #[test]
    fn unknown_direction_override_is_rejected() {
        let mut options = OrchestratorOptions::default();
        options
            .directions
            .insert(BlockId::from("Z"), AnalysisDirections::NONE);
        let err = Orchestrator::new(chain(), Silent, TruthTableSolver::default(), options)
            .err()
            .expect("unknown block must be rejected");
        assert_eq!(err, VerificationError::UnknownBlock(BlockId::from("Z")));
    }

    #[test]
    fn silent_oracle_drains_to_safe() {
        let outcome = orchestrator(OrchestratorOptions::default()).run();
        assert_eq!(outcome.verdict, Verdict::Safe);
        // Root emits a vacuous postcondition, B's forward pass stays silent.
        assert_eq!(outcome.statistics.forward_invocations, 2);
        assert_eq!(outcome.statistics.backward_invocations, 0);
    }
}
