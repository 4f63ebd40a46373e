use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::backends::smtlib_printer::to_smtlib;

/// Solver-agnostic boolean formula over named propositional variables.
///
/// Formulas are immutable values; cloning is the way to share them between
/// messages. The smart constructors [`Formula::conjunction`] and
/// [`Formula::disjunction`] keep terms flat and fold literal constants, so
/// `is_true`/`is_false` are reliable for anything built through them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Formula {
    /// Variable reference by name.
    Var(String),
    /// Boolean literal.
    BoolLit(bool),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Not(Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

#[allow(clippy::should_implement_trait)]
impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var(name.into())
    }

    pub fn bool(b: bool) -> Self {
        Formula::BoolLit(b)
    }

    pub fn tt() -> Self {
        Formula::BoolLit(true)
    }

    pub fn ff() -> Self {
        Formula::BoolLit(false)
    }

    /// Binary conjunction, folded through [`Formula::conjunction`].
    pub fn and(self, other: Formula) -> Self {
        Formula::conjunction([self, other])
    }

    /// Binary disjunction, folded through [`Formula::disjunction`].
    pub fn or(self, other: Formula) -> Self {
        Formula::disjunction([self, other])
    }

    pub fn not(self) -> Self {
        match self {
            Formula::BoolLit(b) => Formula::BoolLit(!b),
            Formula::Not(inner) => *inner,
            other => Formula::Not(Box::new(other)),
        }
    }

    pub fn implies(self, other: Formula) -> Self {
        Formula::Implies(Box::new(self), Box::new(other))
    }

    /// Conjunction of all `terms`. The empty conjunction is `true`.
    pub fn conjunction(terms: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Formula::BoolLit(true) => {}
                Formula::BoolLit(false) => return Formula::ff(),
                Formula::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        dedup_in_order(&mut flat);
        match flat.len() {
            0 => Formula::tt(),
            1 => flat.pop().unwrap_or_else(Formula::tt),
            _ => Formula::And(flat),
        }
    }

    /// Disjunction of all `terms`. The empty disjunction is `false`.
    pub fn disjunction(terms: impl IntoIterator<Item = Formula>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Formula::BoolLit(false) => {}
                Formula::BoolLit(true) => return Formula::tt(),
                Formula::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        dedup_in_order(&mut flat);
        match flat.len() {
            0 => Formula::ff(),
            1 => flat.pop().unwrap_or_else(Formula::ff),
            _ => Formula::Or(flat),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Formula::BoolLit(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Formula::BoolLit(false))
    }

    /// Names of all variables occurring in the formula, sorted.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Var(name) => {
                out.insert(name.clone());
            }
            Formula::BoolLit(_) => {}
            Formula::And(terms) | Formula::Or(terms) => {
                for term in terms {
                    term.collect_variables(out);
                }
            }
            Formula::Not(inner) => inner.collect_variables(out),
            Formula::Implies(lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }

    /// Evaluate under an assignment. Returns `None` if a variable is unassigned.
    pub fn evaluate(&self, assignment: &impl Fn(&str) -> Option<bool>) -> Option<bool> {
        match self {
            Formula::Var(name) => assignment(name),
            Formula::BoolLit(b) => Some(*b),
            Formula::And(terms) => {
                for term in terms {
                    if !term.evaluate(assignment)? {
                        return Some(false);
                    }
                }
                Some(true)
            }
            Formula::Or(terms) => {
                for term in terms {
                    if term.evaluate(assignment)? {
                        return Some(true);
                    }
                }
                Some(false)
            }
            Formula::Not(inner) => inner.evaluate(assignment).map(|b| !b),
            Formula::Implies(lhs, rhs) => {
                if !lhs.evaluate(assignment)? {
                    Some(true)
                } else {
                    rhs.evaluate(assignment)
                }
            }
        }
    }

    /// Number of nodes in the term tree.
    pub fn size(&self) -> usize {
        match self {
            Formula::Var(_) | Formula::BoolLit(_) => 1,
            Formula::And(terms) | Formula::Or(terms) => {
                1 + terms.iter().map(Formula::size).sum::<usize>()
            }
            Formula::Not(inner) => 1 + inner.size(),
            Formula::Implies(lhs, rhs) => 1 + lhs.size() + rhs.size(),
        }
    }
}

fn dedup_in_order(terms: &mut Vec<Formula>) {
    let mut seen = Vec::with_capacity(terms.len());
    terms.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_smtlib(self))
    }
}
