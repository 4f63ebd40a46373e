use serde::Serialize;
use std::fmt;
use std::time::Duration;

use partita_ir::BlockId;
use partita_smt::{Formula, Model};

use crate::error::VerificationError;
use crate::message::MessageKind;
use crate::trace::MessageLog;
use crate::worker::WorkerKind;

/// Overall answer of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// No violation is reachable from the program entry.
    Safe,
    /// A violation condition reached the program entry and is satisfiable.
    Unsafe,
    /// The run could not decide.
    Unknown,
}

impl Verdict {
    /// Stable machine-readable verdict class.
    pub fn verdict_class(&self) -> &'static str {
        match self {
            Verdict::Safe => "safe",
            Verdict::Unsafe => "unsafe",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe => write!(f, "SAFE"),
            Verdict::Unsafe => write!(f, "UNSAFE"),
            Verdict::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Why a run ended with [`Verdict::Unknown`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnknownReason {
    /// Shutdown was requested by the caller.
    Cancelled,
    /// The configured deadline passed.
    TimedOut,
    /// An oracle reported an unsound or imprecise exploration, or the solver
    /// could not decide the condition at the root.
    Incomplete { block: BlockId, detail: String },
    /// `max_dispatches` worker invocations were used up.
    BudgetExhausted { dispatches: usize },
    /// The run was aborted by a hard failure.
    Failed(VerificationError),
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::Cancelled => write!(f, "verification was cancelled"),
            UnknownReason::TimedOut => write!(f, "verification timed out before completion"),
            UnknownReason::Incomplete { block, detail } => {
                write!(f, "incomplete analysis in block '{block}': {detail}")
            }
            UnknownReason::BudgetExhausted { dispatches } => {
                write!(f, "dispatch budget exhausted after {dispatches} worker invocations")
            }
            UnknownReason::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Evidence handed to counterexample reconstruction on `UNSAFE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationWitness {
    /// Satisfiable violation condition at the program entry.
    pub formula: Formula,
    /// A satisfying assignment of `formula`, when the solver produced one.
    pub model: Option<Model>,
    /// Originating blocks from the root to the block where the violation
    /// was first seen.
    pub block_chain: Vec<BlockId>,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub forward_invocations: u64,
    pub backward_invocations: u64,
    pub noop_invocations: u64,
    pub postconditions_sent: u64,
    pub error_conditions_sent: u64,
    pub unreachable_reports: u64,
    /// Error conditions parked by the short-circuit check.
    pub short_circuited: u64,
    /// Parked error conditions later released because the summary grew.
    pub released: u64,
    /// Parked error conditions still parked when the queue drained.
    pub dropped: u64,
    pub dispatches: u64,
    pub elapsed_ms: u128,
}

impl RunStatistics {
    pub(crate) fn count_message(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Postcondition => self.postconditions_sent += 1,
            MessageKind::ErrorCondition => self.error_conditions_sent += 1,
            MessageKind::ErrorUnreachable => self.unreachable_reports += 1,
        }
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = elapsed.as_millis();
    }
}

/// Last-known per-block state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDiagnostics {
    pub id: BlockId,
    pub forward: WorkerKind,
    pub backward: WorkerKind,
    pub last_precondition: Option<Formula>,
    pub last_postcondition: Option<Formula>,
    /// Disjunction of every postcondition the block emitted.
    pub forward_summary: Option<Formula>,
    pub reported_violation: bool,
    pub forward_runs: u64,
    pub backward_runs: u64,
    pub parked: usize,
}

/// Complete result of one orchestrated run.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub verdict: Verdict,
    pub witness: Option<ViolationWitness>,
    pub unknown_reason: Option<UnknownReason>,
    pub statistics: RunStatistics,
    pub blocks: Vec<BlockDiagnostics>,
    pub message_log: Option<MessageLog>,
}

impl VerificationOutcome {
    pub fn is_safe(&self) -> bool {
        self.verdict == Verdict::Safe
    }

    pub fn is_unsafe(&self) -> bool {
        self.verdict == Verdict::Unsafe
    }

    pub fn block(&self, id: &BlockId) -> Option<&BlockDiagnostics> {
        self.blocks.iter().find(|b| &b.id == id)
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RESULT: {}", self.verdict)?;
        if let Some(witness) = &self.witness {
            let chain: Vec<&str> = witness.block_chain.iter().map(BlockId::as_str).collect();
            writeln!(f, "Violation condition at entry: {}", witness.formula)?;
            writeln!(f, "Block chain: {}", chain.join(" -> "))?;
        }
        if let Some(reason) = &self.unknown_reason {
            writeln!(f, "Reason: {reason}")?;
        }
        let stats = &self.statistics;
        write!(
            f,
            "{} forward / {} backward runs, {} messages, {} short-circuited, {} ms",
            stats.forward_invocations,
            stats.backward_invocations,
            stats.postconditions_sent + stats.error_conditions_sent + stats.unreachable_reports,
            stats.short_circuited,
            stats.elapsed_ms
        )
    }
}
