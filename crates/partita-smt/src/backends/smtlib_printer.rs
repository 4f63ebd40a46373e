use crate::terms::Formula;

/// Print a formula in SMT-LIB2 format.
pub fn to_smtlib(term: &Formula) -> String {
    match term {
        Formula::Var(name) => name.clone(),
        Formula::BoolLit(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        Formula::And(terms) => {
            if terms.is_empty() {
                "true".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(and {})", inner.join(" "))
            }
        }
        Formula::Or(terms) => {
            if terms.is_empty() {
                "false".to_string()
            } else if terms.len() == 1 {
                to_smtlib(&terms[0])
            } else {
                let inner: Vec<String> = terms.iter().map(to_smtlib).collect();
                format!("(or {})", inner.join(" "))
            }
        }
        Formula::Not(inner) => format!("(not {})", to_smtlib(inner)),
        Formula::Implies(lhs, rhs) => {
            format!("(=> {} {})", to_smtlib(lhs), to_smtlib(rhs))
        }
    }
}

/// Render a standalone SMT-LIB2 script that checks `term` for satisfiability.
pub fn to_smtlib_script(term: &Formula) -> String {
    let mut script = String::new();
    for var in term.variables() {
        script.push_str(&format!("(declare-const {var} Bool)\n"));
    }
    script.push_str(&format!("(assert {})\n(check-sat)\n", to_smtlib(term)));
    script
}
