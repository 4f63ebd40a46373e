use std::collections::BTreeMap;

use crate::terms::Formula;

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

/// A model (variable assignments) extracted from a SAT result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub values: BTreeMap<String, bool>,
}

impl Model {
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).copied()
    }

    /// The model as a conjunction of literals.
    pub fn as_formula(&self) -> Formula {
        Formula::conjunction(self.values.iter().map(|(name, value)| {
            let var = Formula::var(name.clone());
            if *value {
                var
            } else {
                var.not()
            }
        }))
    }
}

/// Abstract satisfiability interface.
///
/// Backends take `&mut self` so stateful solvers fit behind it; callers
/// that share one solver across threads wrap it in a mutex.
pub trait SatSolver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Check satisfiability of a single formula.
    fn check_sat(&mut self, formula: &Formula) -> Result<SatResult, Self::Error>;

    /// Check satisfiability and extract a model if SAT.
    fn check_sat_with_model(
        &mut self,
        formula: &Formula,
    ) -> Result<(SatResult, Option<Model>), Self::Error>;

    /// True only when the backend proved the formula unsatisfiable.
    /// `Unknown` is never reported as unsatisfiable.
    fn is_unsat(&mut self, formula: &Formula) -> Result<bool, Self::Error> {
        if formula.is_false() {
            return Ok(true);
        }
        Ok(self.check_sat(formula)? == SatResult::Unsat)
    }

    /// Reset the solver state.
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct MockSolver {
        sat_result: SatResult,
        check_sat_calls: usize,
    }

    impl MockSolver {
        fn new(sat_result: SatResult) -> Self {
            Self {
                sat_result,
                check_sat_calls: 0,
            }
        }
    }

    impl SatSolver for MockSolver {
        type Error = io::Error;

        fn check_sat(&mut self, _formula: &Formula) -> Result<SatResult, Self::Error> {
            self.check_sat_calls += 1;
            Ok(self.sat_result.clone())
        }

        fn check_sat_with_model(
            &mut self,
            formula: &Formula,
        ) -> Result<(SatResult, Option<Model>), Self::Error> {
            Ok((self.check_sat(formula)?, None))
        }
    }

    #[test]
    fn unknown_is_not_unsat() {
        let mut solver = MockSolver::new(SatResult::Unknown("timeout".to_string()));
        assert!(!solver
            .is_unsat(&Formula::var("x"))
            .expect("mock never fails"));
        assert_eq!(solver.check_sat_calls, 1);
    }

    #[test]
    fn literal_false_is_unsat_without_solver_call() {
        let mut solver = MockSolver::new(SatResult::Sat);
        assert!(solver.is_unsat(&Formula::ff()).expect("mock never fails"));
        assert_eq!(solver.check_sat_calls, 0);
    }

    #[test]
    fn model_renders_as_literal_conjunction() {
        let mut values = BTreeMap::new();
        values.insert("x".to_string(), true);
        values.insert("y".to_string(), false);
        let model = Model { values };

        assert_eq!(model.get_bool("x"), Some(true));
        assert_eq!(model.get_bool("missing"), None);
        assert_eq!(
            model.as_formula(),
            Formula::And(vec![Formula::var("x"), Formula::var("y").not()])
        );
    }
}
