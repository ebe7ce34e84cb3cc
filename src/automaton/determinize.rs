//! Subset construction.
//!
//! The character space is partitioned into classes at [`Automaton::start_points`];
//! every code point inside a class behaves identically in every state, so the
//! construction only has to consider one step per class.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::arena::{Automaton, StateId, Transition, MAX_CODE_POINT};

/// A set of source states, sorted and deduplicated so it can key a hash map.
type Subset = SmallVec<[StateId; 4]>;

/// Class index of a code point given the sorted break points (`points[0] == 0`).
#[inline]
pub(crate) fn class_of(points: &[u32], code_point: u32) -> usize {
    points.partition_point(|&p| p <= code_point) - 1
}

/// Convert any automaton into an equivalent deterministic one.
///
/// Deterministic inputs are returned as a structural copy restricted to their
/// reachable states.
pub fn determinize(automaton: &Automaton) -> Automaton {
    let points = automaton.start_points();
    let classes = points.len();

    let mut result = Automaton::new();
    let mut subsets: FxHashMap<Subset, StateId> = FxHashMap::default();
    let mut queue: VecDeque<(Subset, StateId)> = VecDeque::new();

    let start: Subset = SmallVec::from_elem(automaton.initial(), 1);
    let initial = result.initial();
    result.set_accept(initial, automaton[automaton.initial()].accept);
    subsets.insert(start.clone(), initial);
    queue.push_back((start, initial));

    // Per-class target buckets, reused across subsets.
    let mut buckets: Vec<Subset> = vec![SmallVec::new(); classes];
    let mut touched: Vec<usize> = Vec::new();

    while let Some((subset, from)) = queue.pop_front() {
        for &member in &subset {
            for t in &automaton[member].transitions {
                let lo = class_of(&points, t.min);
                let hi = class_of(&points, t.max);
                for class in lo..=hi {
                    if buckets[class].is_empty() {
                        touched.push(class);
                    }
                    buckets[class].push(t.to);
                }
            }
        }

        touched.sort_unstable();
        let mut pending: Option<Transition> = None;
        for &class in &touched {
            let mut target_set = std::mem::take(&mut buckets[class]);
            target_set.sort_unstable();
            target_set.dedup();

            let to = match subsets.get(&target_set) {
                Some(&id) => id,
                None => {
                    let accept = target_set.iter().any(|&s| automaton[s].accept);
                    let id = result.alloc(accept);
                    subsets.insert(target_set.clone(), id);
                    queue.push_back((target_set, id));
                    id
                }
            };

            let min = points[class];
            let max = points
                .get(class + 1)
                .map(|p| p - 1)
                .unwrap_or(MAX_CODE_POINT);
            pending = match pending {
                Some(t) if t.to == to && t.max + 1 == min => Some(Transition::new(t.min, max, to)),
                Some(t) => {
                    result.add_transition(from, t);
                    Some(Transition::new(min, max, to))
                }
                None => Some(Transition::new(min, max, to)),
            };
        }
        if let Some(t) = pending {
            result.add_transition(from, t);
        }
        touched.clear();
    }

    result
}
