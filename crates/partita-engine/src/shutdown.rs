//! Cooperative cancellation and deadline handling.
//!
//! A [`ShutdownNotifier`] is checked by the orchestrator before every
//! dispatch and handed to the oracle so long explorations can bail out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::oracle::OracleError;

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Requested,
    DeadlineExceeded,
}

/// Cloneable cancellation token with an optional wall-clock deadline.
///
/// A [`child`](ShutdownNotifier::child) observes every request made on its
/// ancestors, while its own requests stay invisible to them.
#[derive(Debug, Clone, Default)]
pub struct ShutdownNotifier {
    requested: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl ShutdownNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same token, additionally bounded by `deadline`.
    pub fn with_deadline(&self, deadline: Option<Instant>) -> Self {
        let deadline = match (self.deadline, deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            requested: Arc::clone(&self.requested),
            ancestors: self.ancestors.clone(),
            deadline,
        }
    }

    /// A token that also fires when `self` does, but can be shut down alone.
    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.requested));
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            ancestors,
            deadline: self.deadline,
        }
    }

    pub fn request_shutdown(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        let requested = std::iter::once(&self.requested)
            .chain(&self.ancestors)
            .any(|flag| flag.load(Ordering::Acquire));
        if requested {
            Some(ShutdownReason::Requested)
        } else if deadline_exceeded(self.deadline) {
            Some(ShutdownReason::DeadlineExceeded)
        } else {
            None
        }
    }

    pub fn shutdown_requested(&self) -> bool {
        self.reason().is_some()
    }

    /// Returns `Err(OracleError::Interrupted)` once shutdown was requested
    /// or the deadline passed.
    pub fn shutdown_if_necessary(&self) -> Result<(), OracleError> {
        match self.reason() {
            Some(_) => Err(OracleError::Interrupted),
            None => Ok(()),
        }
    }
}

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

pub(crate) fn overall_timeout_duration(timeout_secs: u64) -> Option<Duration> {
    if timeout_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(timeout_secs))
    }
}

pub(crate) fn deadline_from_timeout_secs(timeout_secs: u64) -> Option<Instant> {
    overall_timeout_duration(timeout_secs).and_then(|t| Instant::now().checked_add(t))
}
