//! Dense, flattened deterministic automaton.
//!
//! A run form partitions the code point space into character classes at a
//! sorted list of break points and stores one transition per (state, class)
//! in a single `Vec<u32>`, using [`DEAD`] for "no transition". Stepping is a
//! class lookup plus one index operation.
//!
//! ```text
//! points:      [0, 'a', 'c', 'd']          4 classes
//! transitions: state 0 -> [DEAD, 1, DEAD, 2]
//!              state 1 -> [DEAD, DEAD, 2, DEAD]
//! ```

use super::arena::{Automaton, StateId};
use super::compressed::CompressedRunForm;
use super::determinize::{class_of, determinize};
use crate::error::DecodeError;

/// Raw "no transition" marker inside transition tables.
pub const DEAD: u32 = u32::MAX;

/// Code points below this bound are classified by direct table lookup.
const FAST_CLASS_LIMIT: usize = 0x100;

/// The stepping capability shared by every run form representation.
///
/// Implementations are immutable, so all methods are safe to call concurrently.
pub trait Dfa {
    fn initial_state(&self) -> StateId;

    /// The next state on `c`, or `None` when the automaton dies.
    fn step(&self, state: StateId, c: char) -> Option<StateId>;

    fn is_accepting(&self, state: StateId) -> bool;

    fn state_count(&self) -> usize;

    /// Sorted break points of the character classes; `break_points()[0] == 0`.
    fn break_points(&self) -> &[u32];

    /// The next state on any character of class `class`.
    fn step_class(&self, state: StateId, class: usize) -> Option<StateId>;

    /// Whole-string acceptance.
    fn run(&self, input: &str) -> bool {
        let mut state = self.initial_state();
        for c in input.chars() {
            match self.step(state, c) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.is_accepting(state)
    }
}

/// Break points plus a direct lookup table for the low code points.
#[derive(Clone, Debug)]
pub(crate) struct CharClasses {
    points: Vec<u32>,
    fast: Box<[u32]>,
}

impl CharClasses {
    pub(crate) fn new(points: Vec<u32>) -> Self {
        debug_assert_eq!(points.first(), Some(&0));
        let fast = (0..FAST_CLASS_LIMIT as u32)
            .map(|cp| class_of(&points, cp) as u32)
            .collect();
        Self { points, fast }
    }

    /// Validate externally supplied break points before use.
    pub(crate) fn from_points(points: Vec<u32>) -> Result<Self, DecodeError> {
        if points.first() != Some(&0) {
            return Err(DecodeError::Invalid(
                "break points must start at 0".to_string(),
            ));
        }
        if points.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DecodeError::Invalid(
                "break points must be strictly ascending".to_string(),
            ));
        }
        if points.last().is_some_and(|&p| p > super::arena::MAX_CODE_POINT) {
            return Err(DecodeError::Invalid(
                "break point beyond the Unicode range".to_string(),
            ));
        }
        Ok(Self::new(points))
    }

    #[inline]
    pub(crate) fn class(&self, c: char) -> usize {
        let cp = c as u32;
        match self.fast.get(cp as usize) {
            Some(&class) => class as usize,
            None => class_of(&self.points, cp),
        }
    }

    #[inline]
    pub(crate) fn points(&self) -> &[u32] {
        &self.points
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }
}

/// Dense run form: `size × classes` transition table.
#[derive(Clone, Debug)]
pub struct RunForm {
    pub(crate) size: usize,
    pub(crate) initial: u32,
    pub(crate) accept: Vec<bool>,
    pub(crate) classes: CharClasses,
    pub(crate) transitions: Vec<u32>,
}

impl RunForm {
    /// Flatten an automaton, determinizing it first when needed.
    ///
    /// States are numbered breadth-first from the initial state, which
    /// therefore always gets index 0; unreachable states are dropped.
    pub fn new(automaton: &Automaton) -> Self {
        if automaton.is_deterministic() {
            Self::flatten(automaton)
        } else {
            Self::flatten(&determinize(automaton))
        }
    }

    fn flatten(automaton: &Automaton) -> Self {
        let points = automaton.start_points();
        let classes = points.len();
        let order = automaton.reachable();

        let mut index = vec![DEAD; automaton.len()];
        for (i, id) in order.iter().enumerate() {
            index[id.index()] = i as u32;
        }

        let mut transitions = vec![DEAD; order.len() * classes];
        let mut accept = Vec::with_capacity(order.len());
        for (row, &id) in order.iter().enumerate() {
            let state = &automaton[id];
            accept.push(state.accept);
            let base = row * classes;
            for t in &state.transitions {
                let lo = class_of(&points, t.min);
                let hi = class_of(&points, t.max);
                transitions[base + lo..=base + hi].fill(index[t.to.index()]);
            }
        }

        Self {
            size: order.len(),
            initial: 0,
            accept,
            classes: CharClasses::new(points),
            transitions,
        }
    }

    /// Reassemble a run form from decoded parts, checking every structural
    /// invariant the stepping code relies on.
    pub(crate) fn from_parts(
        size: usize,
        initial: u32,
        accept: Vec<bool>,
        points: Vec<u32>,
        transitions: Vec<u32>,
    ) -> Result<Self, DecodeError> {
        check_header(size, initial, &accept)?;
        let classes = CharClasses::from_points(points)?;
        let expected = size
            .checked_mul(classes.len())
            .ok_or_else(|| DecodeError::Invalid("transition table size overflow".to_string()))?;
        if transitions.len() != expected {
            return Err(DecodeError::Invalid(format!(
                "transition table has {} entries, expected {}",
                transitions.len(),
                expected
            )));
        }
        check_targets(&transitions, size)?;
        Ok(Self {
            size,
            initial,
            accept,
            classes,
            transitions,
        })
    }

    /// Build the sparse representation of this run form.
    pub fn compress(&self) -> CompressedRunForm {
        CompressedRunForm::new(self)
    }

    /// Number of character classes.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Raw transition row of a state (one entry per class).
    pub fn row(&self, state: StateId) -> &[u32] {
        let classes = self.classes.len();
        let base = state.index() * classes;
        &self.transitions[base..base + classes]
    }

    /// Approximate heap size of the tables, in bytes.
    pub fn memory_usage(&self) -> usize {
        self.transitions.len() * std::mem::size_of::<u32>()
            + self.accept.len()
            + self.classes.len() * std::mem::size_of::<u32>()
    }
}

impl Dfa for RunForm {
    #[inline]
    fn initial_state(&self) -> StateId {
        StateId::from_raw(self.initial)
    }

    #[inline]
    fn step(&self, state: StateId, c: char) -> Option<StateId> {
        self.step_class(state, self.classes.class(c))
    }

    #[inline]
    fn is_accepting(&self, state: StateId) -> bool {
        self.accept[state.index()]
    }

    fn state_count(&self) -> usize {
        self.size
    }

    fn break_points(&self) -> &[u32] {
        self.classes.points()
    }

    #[inline]
    fn step_class(&self, state: StateId, class: usize) -> Option<StateId> {
        let next = self.transitions[state.index() * self.classes.len() + class];
        (next != DEAD).then_some(StateId::from_raw(next))
    }
}

pub(crate) fn check_header(size: usize, initial: u32, accept: &[bool]) -> Result<(), DecodeError> {
    if size == 0 {
        return Err(DecodeError::Invalid("automaton has no states".to_string()));
    }
    if initial as usize >= size {
        return Err(DecodeError::Invalid(format!(
            "initial state {initial} out of range for {size} states"
        )));
    }
    if accept.len() != size {
        return Err(DecodeError::Invalid(format!(
            "{} accept flags for {size} states",
            accept.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_targets(targets: &[u32], size: usize) -> Result<(), DecodeError> {
    match targets.iter().find(|&&t| t != DEAD && t as usize >= size) {
        Some(t) => Err(DecodeError::Invalid(format!(
            "transition target {t} out of range for {size} states"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::builder::DictionaryBuilder;

    #[test]
    fn test_run_form_language() {
        let form = RunForm::new(&DictionaryBuilder::build(["iron", "iodine"]));
        assert!(form.run("iron"));
        assert!(form.run("iodine"));
        assert!(!form.run("io"));
        assert!(!form.run("irony"));
        assert_eq!(form.initial_state(), StateId::new(0));
    }

    #[test]
    fn test_unknown_characters_are_dead() {
        let form = RunForm::new(&DictionaryBuilder::build(["abc"]));
        let s = form.initial_state();
        assert_eq!(form.step(s, 'z'), None);
        assert_eq!(form.step(s, '\u{1F600}'), None);
        assert_eq!(form.step(s, '\0'), None);
        assert!(form.step(s, 'a').is_some());
    }

    #[test]
    fn test_classes_cover_high_code_points() {
        let form = RunForm::new(&DictionaryBuilder::build(["\u{10FFFF}x", "é"]));
        assert!(form.run("\u{10FFFF}x"));
        assert!(form.run("é"));
        assert!(!form.run("e"));
    }

    #[test]
    fn test_flatten_is_total() {
        let form = RunForm::new(&DictionaryBuilder::build(["ab", "cd", "ef"]));
        assert_eq!(form.transitions.len(), form.state_count() * form.class_count());
        for (i, &t) in form.transitions.iter().enumerate() {
            assert!(t == DEAD || (t as usize) < form.state_count(), "entry {i}");
        }
    }

    #[test]
    fn test_from_parts_rejects_bad_tables() {
        let ok = RunForm::from_parts(1, 0, vec![true], vec![0], vec![DEAD]);
        assert!(ok.is_ok());

        let bad_initial = RunForm::from_parts(1, 1, vec![true], vec![0], vec![DEAD]);
        assert!(matches!(bad_initial, Err(DecodeError::Invalid(_))));

        let bad_points = RunForm::from_parts(1, 0, vec![true], vec![5], vec![DEAD]);
        assert!(matches!(bad_points, Err(DecodeError::Invalid(_))));

        let bad_target = RunForm::from_parts(1, 0, vec![true], vec![0], vec![3]);
        assert!(matches!(bad_target, Err(DecodeError::Invalid(_))));

        let bad_len = RunForm::from_parts(1, 0, vec![true], vec![0, 10], vec![DEAD]);
        assert!(matches!(bad_len, Err(DecodeError::Invalid(_))));
    }
}
