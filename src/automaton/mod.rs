//! Dictionary automata.
//!
//! The key components are:
//!
//! - `Automaton`: arena-allocated state graph with code point range transitions
//! - `DictionaryBuilder`: minimal acyclic automaton from sorted terms
//! - `RunForm`: dense, flattened DFA for fast stepping
//! - `CompressedRunForm`: sparse variant storing only each state's live run
//! - `AnyDfa`: either representation behind the `Dfa` capability trait
//!
//! # Module Organization
//!
//! - `arena`: StateId, Transition, Automaton, restore and union
//! - `builder`: incremental sorted-input construction
//! - `determinize`: subset construction over character classes
//! - `run_form`: dense tables and the `Dfa` trait
//! - `compressed`: sparse tables
//! - `union`: run form union

mod any;
mod arena;
mod builder;
mod compressed;
mod determinize;
mod run_form;
mod union;

pub use any::{AnyDfa, DfaKind};
pub use arena::{Automaton, AutomatonState, StateId, Transition, MAX_CODE_POINT};
pub use builder::DictionaryBuilder;
pub use compressed::CompressedRunForm;
pub use determinize::determinize;
pub use run_form::{Dfa, RunForm, DEAD};
pub use union::{build_run_form, unite};

#[cfg(test)]
mod tests;
