//! Union of run forms.
//!
//! Each operand is restored to its range-labelled graph, the graphs are joined
//! under a fresh initial state, and the result is determinized and flattened
//! again. The united run form recognizes exactly the union of the operands'
//! languages.

use tracing::debug;

use super::arena::Automaton;
use super::builder::DictionaryBuilder;
use super::run_form::{Dfa, RunForm};

/// Merge several deterministic automata into one dense run form.
///
/// An empty operand list yields the empty language.
pub fn unite<D: Dfa>(operands: &[D]) -> RunForm {
    let restored: Vec<Automaton> = operands.iter().map(Automaton::from_dfa).collect();
    let united = Automaton::union_all(&restored);
    let form = RunForm::new(&united);
    debug!(
        operands = operands.len(),
        states = form.state_count(),
        "united automata"
    );
    form
}

/// Build a dense run form for a set of terms in one step.
pub fn build_run_form<I, S>(terms: I) -> RunForm
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RunForm::new(&DictionaryBuilder::build(terms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unite_two() {
        let a = build_run_form(["iron", "zinc"]);
        let b = build_run_form(["iodine", "iron oxide"]);
        let united = unite(&[a, b]);
        for term in ["iron", "zinc", "iodine", "iron oxide"] {
            assert!(united.run(term), "{term}");
        }
        for other in ["io", "iron ", "zin", "iodines"] {
            assert!(!united.run(other), "{other}");
        }
    }

    #[test]
    fn test_unite_empty_list() {
        let united = unite::<RunForm>(&[]);
        assert_eq!(united.state_count(), 1);
        assert!(!united.run(""));
        assert!(!united.run("a"));
    }

    #[test]
    fn test_unite_mixed_representations() {
        use crate::automaton::AnyDfa;
        let dense = AnyDfa::from(build_run_form(["benzene"]));
        let sparse = AnyDfa::from(build_run_form(["toluene", "benzol"])).compress();
        let united = unite(&[dense, sparse]);
        assert!(united.run("benzene"));
        assert!(united.run("benzol"));
        assert!(united.run("toluene"));
        assert!(!united.run("benz"));
    }
}
