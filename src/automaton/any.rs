//! The closed set of run form representations.

use super::arena::{Automaton, StateId};
use super::compressed::CompressedRunForm;
use super::run_form::{Dfa, RunForm};

/// Which table layout a run form uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DfaKind {
    Dense,
    Compressed,
}

/// A matcher-ready automaton in either representation.
#[derive(Clone, Debug)]
pub enum AnyDfa {
    Dense(RunForm),
    Compressed(CompressedRunForm),
}

impl AnyDfa {
    pub fn kind(&self) -> DfaKind {
        match self {
            AnyDfa::Dense(_) => DfaKind::Dense,
            AnyDfa::Compressed(_) => DfaKind::Compressed,
        }
    }

    /// Switch to the sparse layout. Already-compressed automata are returned as is.
    pub fn compress(self) -> AnyDfa {
        match self {
            AnyDfa::Dense(form) => AnyDfa::Compressed(form.compress()),
            compressed => compressed,
        }
    }

    /// Rebuild the range-labelled automaton graph.
    pub fn to_automaton(&self) -> Automaton {
        match self {
            AnyDfa::Dense(form) => Automaton::from_dfa(form),
            AnyDfa::Compressed(form) => Automaton::from_dfa(form),
        }
    }

    pub fn memory_usage(&self) -> usize {
        match self {
            AnyDfa::Dense(form) => form.memory_usage(),
            AnyDfa::Compressed(form) => form.memory_usage(),
        }
    }
}

impl From<RunForm> for AnyDfa {
    fn from(form: RunForm) -> Self {
        AnyDfa::Dense(form)
    }
}

impl From<CompressedRunForm> for AnyDfa {
    fn from(form: CompressedRunForm) -> Self {
        AnyDfa::Compressed(form)
    }
}

impl Dfa for AnyDfa {
    #[inline]
    fn initial_state(&self) -> StateId {
        match self {
            AnyDfa::Dense(f) => f.initial_state(),
            AnyDfa::Compressed(f) => f.initial_state(),
        }
    }

    #[inline]
    fn step(&self, state: StateId, c: char) -> Option<StateId> {
        match self {
            AnyDfa::Dense(f) => f.step(state, c),
            AnyDfa::Compressed(f) => f.step(state, c),
        }
    }

    #[inline]
    fn is_accepting(&self, state: StateId) -> bool {
        match self {
            AnyDfa::Dense(f) => f.is_accepting(state),
            AnyDfa::Compressed(f) => f.is_accepting(state),
        }
    }

    fn state_count(&self) -> usize {
        match self {
            AnyDfa::Dense(f) => f.state_count(),
            AnyDfa::Compressed(f) => f.state_count(),
        }
    }

    fn break_points(&self) -> &[u32] {
        match self {
            AnyDfa::Dense(f) => f.break_points(),
            AnyDfa::Compressed(f) => f.break_points(),
        }
    }

    #[inline]
    fn step_class(&self, state: StateId, class: usize) -> Option<StateId> {
        match self {
            AnyDfa::Dense(f) => f.step_class(state, class),
            AnyDfa::Compressed(f) => f.step_class(state, class),
        }
    }
}
