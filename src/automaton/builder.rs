//! Incremental construction of a minimal acyclic automaton from sorted terms.
//!
//! Terms must arrive in ascending code point order. The builder keeps the path
//! of the previously inserted term open (the *frontier*). When a new term
//! diverges from it, every frontier state past the common prefix can never be
//! extended again: it is closed, and either registered or replaced by an
//! already-registered state with the same acceptance and outgoing edges. Closed
//! states therefore share common suffixes, and the finished automaton is
//! minimal for the term set.
//!
//! Nodes are arena-allocated and the register is keyed by the node's full
//! signature, so equivalence checks are exact rather than hash-based.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use super::arena::{Automaton, StateId, Transition};
use crate::error::BuildError;

/// A node under construction.
///
/// Edges are pushed in ascending character order because terms arrive sorted,
/// so two nodes with the same right language have identical signatures.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
struct BuildNode {
    accept: bool,
    edges: SmallVec<[(char, StateId); 4]>,
}

/// Builds a deterministic automaton recognizing exactly the inserted terms.
pub struct DictionaryBuilder {
    nodes: Vec<BuildNode>,
    /// Closed, canonical nodes by signature
    register: FxHashMap<BuildNode, StateId>,
    /// `frontier[i]` is the state reached after the first `i` characters of
    /// the previous term; `frontier[0]` is the root.
    frontier: Vec<StateId>,
    previous: Option<String>,
    terms: usize,
}

impl Default for DictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![BuildNode::default()],
            register: FxHashMap::default(),
            frontier: vec![StateId::new(0)],
            previous: None,
            terms: 0,
        }
    }

    /// Build an automaton from an unsorted collection of terms.
    ///
    /// Terms are sorted and deduplicated first, so this never fails.
    pub fn build<I, S>(terms: I) -> Automaton
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned: Vec<S> = terms.into_iter().collect();
        let mut sorted: Vec<&str> = owned.iter().map(|t| t.as_ref()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut builder = DictionaryBuilder::new();
        for term in sorted {
            builder.insert(term);
        }
        builder.finish()
    }

    /// Insert the next term.
    ///
    /// Returns [`BuildError::OutOfOrder`] if `term` sorts before the previous
    /// term. Re-inserting the previous term is accepted and changes nothing.
    pub fn add(&mut self, term: &str) -> Result<(), BuildError> {
        if let Some(previous) = &self.previous {
            if term < previous.as_str() {
                return Err(BuildError::OutOfOrder {
                    previous: previous.clone(),
                    got: term.to_string(),
                });
            }
        }
        self.insert(term);
        Ok(())
    }

    /// Number of distinct terms inserted so far.
    pub fn len(&self) -> usize {
        self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms == 0
    }

    fn insert(&mut self, term: &str) {
        let prefix = match &self.previous {
            Some(previous) if previous == term => return,
            Some(previous) => previous
                .chars()
                .zip(term.chars())
                .take_while(|(a, b)| a == b)
                .count(),
            None => 0,
        };

        self.close_from(prefix);

        let mut current = self.frontier[prefix];
        for c in term.chars().skip(prefix) {
            let next = self.alloc();
            self.nodes[current.index()].edges.push((c, next));
            self.frontier.push(next);
            current = next;
        }
        self.nodes[current.index()].accept = true;

        self.previous = Some(term.to_string());
        self.terms += 1;
    }

    /// Close every frontier state deeper than `depth`, deepest first, and
    /// truncate the frontier to `depth + 1` states.
    fn close_from(&mut self, depth: usize) {
        while self.frontier.len() > depth + 1 {
            let Some(state) = self.frontier.pop() else {
                break;
            };
            let parent = self.frontier[self.frontier.len() - 1];
            let canonical = self.replace_or_register(state);
            if canonical != state {
                if let Some(edge) = self.nodes[parent.index()].edges.last_mut() {
                    edge.1 = canonical;
                }
            }
        }
    }

    fn replace_or_register(&mut self, state: StateId) -> StateId {
        let node = &self.nodes[state.index()];
        if let Some(&existing) = self.register.get(node) {
            // The frontier tail is always the most recent allocation, so a
            // replaced state can usually be reclaimed immediately.
            if state.index() == self.nodes.len() - 1 {
                self.nodes.pop();
            }
            return existing;
        }
        self.register.insert(node.clone(), state);
        state
    }

    fn alloc(&mut self) -> StateId {
        let id = StateId::new(self.nodes.len());
        self.nodes.push(BuildNode::default());
        id
    }

    /// Close the remaining frontier and emit the automaton.
    ///
    /// States are renumbered breadth-first from the root, so orphaned build
    /// nodes do not appear in the output.
    pub fn finish(mut self) -> Automaton {
        self.close_from(0);

        let root = StateId::new(0);
        let mut automaton = Automaton::with_capacity(self.register.len() + 1);
        let mut mapped = vec![StateId::DEAD; self.nodes.len()];
        mapped[root.index()] = automaton.initial();
        automaton.set_accept(automaton.initial(), self.nodes[root.index()].accept);

        let mut queue = std::collections::VecDeque::from([root]);
        while let Some(node_id) = queue.pop_front() {
            let from = mapped[node_id.index()];
            for &(c, child) in &self.nodes[node_id.index()].edges {
                let to = if mapped[child.index()].is_dead() {
                    let id = automaton.alloc(self.nodes[child.index()].accept);
                    mapped[child.index()] = id;
                    queue.push_back(child);
                    id
                } else {
                    mapped[child.index()]
                };
                automaton.add_transition(from, Transition::single(c, to));
            }
        }

        debug!(
            terms = self.terms,
            states = automaton.len(),
            "built dictionary automaton"
        );
        automaton
    }
}
