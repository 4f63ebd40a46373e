use std::collections::BTreeMap;

use partita_ir::BlockId;

/// How ready blocks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheduling {
    /// One block at a time on the calling thread, FIFO.
    #[default]
    Sequential,
    /// Up to `threads` blocks at once on a dedicated pool.
    Parallel { threads: usize },
}

impl Scheduling {
    /// Maximum number of blocks running at the same time.
    pub fn capacity(&self) -> usize {
        match self {
            Scheduling::Sequential => 1,
            Scheduling::Parallel { threads } => (*threads).max(1),
        }
    }
}

/// Which of a block's two analyses are real; disabled ones are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisDirections {
    pub forward: bool,
    pub backward: bool,
}

impl AnalysisDirections {
    pub const BOTH: AnalysisDirections = AnalysisDirections {
        forward: true,
        backward: true,
    };
    pub const FORWARD_ONLY: AnalysisDirections = AnalysisDirections {
        forward: true,
        backward: false,
    };
    pub const BACKWARD_ONLY: AnalysisDirections = AnalysisDirections {
        forward: false,
        backward: true,
    };
    pub const NONE: AnalysisDirections = AnalysisDirections {
        forward: false,
        backward: false,
    };
}

impl Default for AnalysisDirections {
    fn default() -> Self {
        Self::BOTH
    }
}

/// Options for one orchestrated verification run.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub scheduling: Scheduling,
    /// Park error conditions that contradict the receiving block's forward
    /// summary instead of running the backward analysis on them.
    pub short_circuit: bool,
    /// Wall-clock limit in seconds; `0` disables it.
    pub timeout_secs: u64,
    /// Upper bound on worker invocations; `None` is unbounded.
    pub max_dispatches: Option<usize>,
    pub record_message_log: bool,
    /// Per-block overrides; blocks not listed run both directions.
    pub directions: BTreeMap<BlockId, AnalysisDirections>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            scheduling: Scheduling::Sequential,
            short_circuit: true,
            timeout_secs: 0,
            max_dispatches: None,
            record_message_log: false,
            directions: BTreeMap::new(),
        }
    }
}

impl OrchestratorOptions {
    pub fn directions_for(&self, block: &BlockId) -> AnalysisDirections {
        self.directions.get(block).copied().unwrap_or_default()
    }
}
