//! A matcher that can be swapped while other threads are matching.
//!
//! Readers load the current snapshot without locking. Writers build a new
//! [`Matcher`] off to the side and publish it atomically; writes are serialized
//! by a mutex so that concurrent `extend` calls never lose automata.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::automaton::AnyDfa;
use crate::scanner::{MatchStats, Matcher, Mention};

/// Thread-safe, hot-swappable [`Matcher`].
pub struct SharedMatcher {
    current: ArcSwap<Matcher>,
    write_lock: Mutex<()>,
}

impl SharedMatcher {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            current: ArcSwap::from_pointee(matcher),
            write_lock: Mutex::new(()),
        }
    }

    /// The matcher currently published. Holding it keeps that snapshot alive.
    pub fn snapshot(&self) -> Arc<Matcher> {
        self.current.load_full()
    }

    pub fn match_text(&self, text: &str) -> HashSet<Mention> {
        self.current.load().match_text(text)
    }

    pub fn match_text_with_stats(&self, text: &str, stats: &mut MatchStats) -> HashSet<Mention> {
        self.current.load().match_text_with_stats(text, stats)
    }

    pub fn match_many<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<HashSet<Mention>> {
        self.current.load().match_many(texts)
    }

    /// Publish `matcher`, returning the previous snapshot.
    pub fn replace(&self, matcher: Matcher) -> Arc<Matcher> {
        let _guard = self.write_lock.lock();
        let previous = self.current.swap(Arc::new(matcher));
        debug!(automata = self.current.load().len(), "replaced matcher");
        previous
    }

    /// Publish a snapshot with `automata` appended to the current ones.
    pub fn extend(&self, automata: Vec<AnyDfa>) {
        let _guard = self.write_lock.lock();
        let mut next = Matcher::new(self.current.load().policy());
        for dfa in self.current.load().automata() {
            next.push_shared(Arc::clone(dfa));
        }
        for dfa in automata {
            next.push(dfa);
        }
        debug!(automata = next.len(), "extended matcher");
        self.current.store(Arc::new(next));
    }
}

impl Default for SharedMatcher {
    fn default() -> Self {
        Self::new(Matcher::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::build_run_form;
    use std::thread;

    #[test]
    fn test_replace() {
        let shared = SharedMatcher::new(Matcher::from_terms(["aspirin"]));
        assert_eq!(shared.match_text("aspirin").len(), 1);

        let old = shared.replace(Matcher::from_terms(["caffeine"]));
        assert_eq!(old.match_text("aspirin").len(), 1);
        assert!(shared.match_text("aspirin").is_empty());
        assert_eq!(shared.match_text("caffeine").len(), 1);
    }

    #[test]
    fn test_extend_keeps_existing() {
        let shared = SharedMatcher::default();
        assert!(shared.match_text("iron").is_empty());
        shared.extend(vec![AnyDfa::from(build_run_form(["iron"]))]);
        shared.extend(vec![AnyDfa::from(build_run_form(["zinc"])).compress()]);
        assert_eq!(shared.snapshot().len(), 2);
        assert_eq!(shared.match_text("iron and zinc").len(), 2);
    }

    #[test]
    fn test_snapshot_is_stable() {
        let shared = SharedMatcher::new(Matcher::from_terms(["benzene"]));
        let before = shared.snapshot();
        shared.extend(vec![AnyDfa::from(build_run_form(["toluene"]))]);
        assert_eq!(before.len(), 1);
        assert!(before.match_text("toluene").is_empty());
        assert_eq!(shared.match_text("toluene").len(), 1);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let shared = Arc::new(SharedMatcher::new(Matcher::from_terms(["aspirin"])));
        let terms = ["caffeine", "iodine", "toluene", "benzene"];

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let found = shared.match_text("aspirin tablet");
                        assert_eq!(found.len(), 1);
                    }
                })
            })
            .collect();
        let writers: Vec<_> = terms
            .iter()
            .map(|&term| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    shared.extend(vec![AnyDfa::from(build_run_form([term]))]);
                })
            })
            .collect();

        for handle in readers.into_iter().chain(writers) {
            handle.join().unwrap();
        }
        assert_eq!(shared.snapshot().len(), 1 + terms.len());
        assert_eq!(
            shared.match_text("caffeine iodine toluene benzene").len(),
            4
        );
    }
}
