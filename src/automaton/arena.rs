//! Arena-based automaton graph.
//!
//! States live contiguously in a `Vec` and refer to each other through `StateId`
//! indices, so the graph can share suffixes (and, after union, branch
//! nondeterministically) without any ownership cycles.
//!
//! Transitions are labelled with inclusive code point ranges. A freshly built
//! dictionary automaton only uses single-character ranges; automata restored
//! from a run form use one range per character class.

use std::collections::VecDeque;

use smallvec::SmallVec;

use super::run_form::Dfa;

/// Largest Unicode scalar value, the upper bound of every character class.
pub const MAX_CODE_POINT: u32 = char::MAX as u32;

/// A state identifier - just an index into the arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(u32);

impl StateId {
    /// Sentinel for "no transition". Never a valid index.
    pub const DEAD: StateId = StateId(u32::MAX);

    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index < u32::MAX as usize, "state index overflow");
        StateId(index as u32)
    }

    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        StateId(raw)
    }

    #[inline]
    pub fn is_dead(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A transition on every code point in `min..=max`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Transition {
    pub min: u32,
    pub max: u32,
    pub to: StateId,
}

impl Transition {
    pub fn new(min: u32, max: u32, to: StateId) -> Self {
        debug_assert!(min <= max);
        Self { min, max, to }
    }

    /// A transition on a single character.
    pub fn single(c: char, to: StateId) -> Self {
        Self::new(c as u32, c as u32, to)
    }

    #[inline]
    pub fn contains(&self, code_point: u32) -> bool {
        self.min <= code_point && code_point <= self.max
    }
}

/// A state in the arena.
#[derive(Clone, Debug, Default)]
pub struct AutomatonState {
    /// Whether a string ending here is recognized
    pub accept: bool,
    /// Outgoing transitions, kept sorted by `min`
    pub transitions: Vec<Transition>,
}

/// Finite automaton over Unicode scalar values.
///
/// Determinism is a property of the transition graph, not a flag: see
/// [`Automaton::is_deterministic`].
#[derive(Clone, Debug)]
pub struct Automaton {
    states: Vec<AutomatonState>,
    initial: StateId,
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    /// An automaton with a single, non-accepting initial state (the empty language).
    pub fn new() -> Self {
        Self {
            states: vec![AutomatonState::default()],
            initial: StateId(0),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut states = Vec::with_capacity(capacity.max(1));
        states.push(AutomatonState::default());
        Self {
            states,
            initial: StateId(0),
        }
    }

    /// Allocate a new state, returning its ID.
    pub fn alloc(&mut self, accept: bool) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(AutomatonState {
            accept,
            transitions: Vec::new(),
        });
        id
    }

    /// Add a transition, keeping the state's transition list sorted.
    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        let transitions = &mut self.states[from.index()].transitions;
        let pos = transitions.partition_point(|t| (t.min, t.max) <= (transition.min, transition.max));
        transitions.insert(pos, transition);
    }

    pub fn set_accept(&mut self, state: StateId, accept: bool) {
        self.states[state.index()].accept = accept;
    }

    pub fn set_initial(&mut self, state: StateId) {
        self.initial = state;
    }

    #[inline]
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Number of allocated states, reachable or not.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    #[inline]
    pub fn state(&self, id: StateId) -> &AutomatonState {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &AutomatonState)> {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateId::new(i), s))
    }

    /// States reachable from the initial state, in breadth-first order.
    pub fn reachable(&self) -> Vec<StateId> {
        let mut seen = vec![false; self.states.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        seen[self.initial.index()] = true;
        queue.push_back(self.initial);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for t in &self.states[id.index()].transitions {
                if !seen[t.to.index()] {
                    seen[t.to.index()] = true;
                    queue.push_back(t.to);
                }
            }
        }
        order
    }

    /// True when no reachable state has two transitions on the same code point.
    pub fn is_deterministic(&self) -> bool {
        self.reachable().into_iter().all(|id| {
            self.states[id.index()]
                .transitions
                .windows(2)
                .all(|w| w[0].max < w[1].min)
        })
    }

    /// Whole-string acceptance by set simulation. Works for nondeterministic
    /// automata too.
    pub fn run(&self, input: &str) -> bool {
        let mut current: SmallVec<[StateId; 8]> = SmallVec::new();
        current.push(self.initial);
        let mut next: SmallVec<[StateId; 8]> = SmallVec::new();
        for c in input.chars() {
            let cp = c as u32;
            next.clear();
            for &id in &current {
                for t in &self.states[id.index()].transitions {
                    if t.contains(cp) && !next.contains(&t.to) {
                        next.push(t.to);
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            std::mem::swap(&mut current, &mut next);
        }
        current.iter().any(|id| self.states[id.index()].accept)
    }

    /// Every break point of the character-class partition: 0 plus the start and
    /// one-past-the-end of each transition range, sorted and deduplicated.
    pub fn start_points(&self) -> Vec<u32> {
        let mut points = vec![0u32];
        for state in &self.states {
            for t in &state.transitions {
                points.push(t.min);
                if t.max < MAX_CODE_POINT {
                    points.push(t.max + 1);
                }
            }
        }
        points.sort_unstable();
        points.dedup();
        points
    }

    /// Rebuild a range-labelled automaton from any deterministic run form,
    /// visiting only the states reachable from its initial state.
    pub fn from_dfa<D: Dfa + ?Sized>(dfa: &D) -> Self {
        let points = dfa.break_points();
        let mut automaton = Automaton::with_capacity(dfa.state_count());
        let mut mapped = vec![StateId::DEAD; dfa.state_count()];
        let mut queue = VecDeque::new();

        let start = dfa.initial_state();
        mapped[start.index()] = automaton.initial;
        automaton.set_accept(automaton.initial, dfa.is_accepting(start));
        queue.push_back(start);

        while let Some(source) = queue.pop_front() {
            let from = mapped[source.index()];
            let mut pending: Option<Transition> = None;
            for class in 0..points.len() {
                let Some(target) = dfa.step_class(source, class) else {
                    if let Some(t) = pending.take() {
                        automaton.states[from.index()].transitions.push(t);
                    }
                    continue;
                };
                let to = if mapped[target.index()].is_dead() {
                    let id = automaton.alloc(dfa.is_accepting(target));
                    mapped[target.index()] = id;
                    queue.push_back(target);
                    id
                } else {
                    mapped[target.index()]
                };
                let min = points[class];
                let max = points
                    .get(class + 1)
                    .map(|p| p - 1)
                    .unwrap_or(MAX_CODE_POINT);
                pending = match pending {
                    // Adjacent classes with the same target collapse into one range.
                    Some(t) if t.to == to && t.max + 1 == min => Some(Transition::new(t.min, max, to)),
                    Some(t) => {
                        automaton.states[from.index()].transitions.push(t);
                        Some(Transition::new(min, max, to))
                    }
                    None => Some(Transition::new(min, max, to)),
                };
            }
            if let Some(t) = pending {
                automaton.states[from.index()].transitions.push(t);
            }
        }
        automaton
    }

    /// Union of several automata: the disjoint sum of their state graphs plus a
    /// fresh initial state carrying copies of every operand's initial
    /// transitions. The result is generally nondeterministic.
    pub fn union_all<'a, I>(operands: I) -> Self
    where
        I: IntoIterator<Item = &'a Automaton>,
    {
        let mut result = Automaton::new();
        let initial = result.initial;
        for operand in operands {
            let offset = result.states.len() as u32;
            let relocate = |t: &Transition| Transition::new(t.min, t.max, StateId(t.to.0 + offset));
            for state in &operand.states {
                result.states.push(AutomatonState {
                    accept: state.accept,
                    transitions: state.transitions.iter().map(relocate).collect(),
                });
            }
            let operand_initial = operand.state(operand.initial);
            if operand_initial.accept {
                result.states[initial.index()].accept = true;
            }
            for t in &operand_initial.transitions {
                result.add_transition(initial, relocate(t));
            }
        }
        result
    }

    /// Union of two automata. See [`Automaton::union_all`].
    pub fn union(&self, other: &Automaton) -> Self {
        Self::union_all([self, other])
    }
}

impl std::ops::Index<StateId> for Automaton {
    type Output = AutomatonState;

    #[inline]
    fn index(&self, id: StateId) -> &Self::Output {
        &self.states[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(automaton: &mut Automaton, w: &str) {
        let mut current = automaton.initial();
        for c in w.chars() {
            let next = automaton.alloc(false);
            automaton.add_transition(current, Transition::single(c, next));
            current = next;
        }
        automaton.set_accept(current, true);
    }

    #[test]
    fn test_state_id_dead() {
        assert!(StateId::DEAD.is_dead());
        assert!(!StateId::new(0).is_dead());
        assert_eq!(StateId::new(7).index(), 7);
    }

    #[test]
    fn test_empty_automaton_rejects_everything() {
        let automaton = Automaton::new();
        assert_eq!(automaton.len(), 1);
        assert!(!automaton.run(""));
        assert!(!automaton.run("a"));
        assert!(automaton.is_deterministic());
    }

    #[test]
    fn test_transitions_stay_sorted() {
        let mut automaton = Automaton::new();
        let target = automaton.alloc(true);
        automaton.add_transition(automaton.initial(), Transition::single('c', target));
        automaton.add_transition(automaton.initial(), Transition::single('a', target));
        automaton.add_transition(automaton.initial(), Transition::single('b', target));
        let mins: Vec<u32> = automaton[automaton.initial()]
            .transitions
            .iter()
            .map(|t| t.min)
            .collect();
        assert_eq!(mins, vec!['a' as u32, 'b' as u32, 'c' as u32]);
    }

    #[test]
    fn test_start_points() {
        let mut automaton = Automaton::new();
        let target = automaton.alloc(true);
        automaton.add_transition(automaton.initial(), Transition::new('a' as u32, 'c' as u32, target));
        automaton.add_transition(target, Transition::single('b', target));
        assert_eq!(
            automaton.start_points(),
            vec![0, 'a' as u32, 'b' as u32, 'c' as u32, 'd' as u32]
        );
    }

    #[test]
    fn test_union_is_nondeterministic_but_correct() {
        let mut a = Automaton::new();
        word(&mut a, "iron");
        let mut b = Automaton::new();
        word(&mut b, "iodine");

        let united = a.union(&b);
        assert!(!united.is_deterministic(), "both operands start with 'i'");
        assert!(united.run("iron"));
        assert!(united.run("iodine"));
        assert!(!united.run("io"));
        assert!(!united.run("ironine"));
    }

    #[test]
    fn test_union_keeps_empty_string_acceptance() {
        let mut a = Automaton::new();
        a.set_accept(a.initial(), true);
        let b = Automaton::new();
        assert!(a.union(&b).run(""));
        assert!(!b.union(&Automaton::new()).run(""));
    }
}
