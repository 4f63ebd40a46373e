//! Exact propositional backend by exhaustive enumeration.

use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::solver::{Model, SatResult, SatSolver};
use crate::terms::Formula;

/// Default variable bound: 2^20 assignments.
pub const DEFAULT_MAX_VARS: usize = 20;

/// Largest bound the `u64` assignment counter can enumerate.
pub const MAX_ENUMERABLE_VARS: usize = 63;

/// Decides satisfiability by enumerating every assignment.
///
/// Formulas over more than `max_vars` variables yield `SatResult::Unknown`.
#[derive(Debug, Clone)]
pub struct TruthTableSolver {
    max_vars: usize,
    checks: u64,
}

impl Default for TruthTableSolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_VARS)
    }
}

impl TruthTableSolver {
    /// Bounds above [`MAX_ENUMERABLE_VARS`] are clamped to it.
    pub fn new(max_vars: usize) -> Self {
        Self {
            max_vars: max_vars.min(MAX_ENUMERABLE_VARS),
            checks: 0,
        }
    }

    /// Number of satisfiability checks answered so far.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    fn search(&mut self, formula: &Formula) -> (SatResult, Option<Model>) {
        self.checks += 1;
        let vars: Vec<String> = formula.variables().into_iter().collect();
        if vars.len() > self.max_vars {
            return (
                SatResult::Unknown(format!(
                    "{} variables exceed the truth-table bound of {}",
                    vars.len(),
                    self.max_vars
                )),
                None,
            );
        }
        for bits in 0u64..(1u64 << vars.len()) {
            let lookup = |name: &str| {
                vars.iter()
                    .position(|v| v == name)
                    .map(|idx| bits & (1 << idx) != 0)
            };
            if formula.evaluate(&lookup) == Some(true) {
                let values: BTreeMap<String, bool> = vars
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| (name.clone(), bits & (1 << idx) != 0))
                    .collect();
                return (SatResult::Sat, Some(Model { values }));
            }
        }
        (SatResult::Unsat, None)
    }
}

impl SatSolver for TruthTableSolver {
    type Error = Infallible;

    fn check_sat(&mut self, formula: &Formula) -> Result<SatResult, Self::Error> {
        Ok(self.search(formula).0)
    }

    fn check_sat_with_model(
        &mut self,
        formula: &Formula,
    ) -> Result<(SatResult, Option<Model>), Self::Error> {
        Ok(self.search(formula))
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        self.checks = 0;
        Ok(())
    }
}
