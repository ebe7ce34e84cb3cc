//! Building large vocabularies in batches.
//!
//! Terms are split into consecutive batches of at most
//! `terms_per_automaton`, each compiled into its own automaton. Runs of
//! `piece_size` consecutive automata can then be united into one, trading
//! construction memory for fewer automata at match time. The resulting set of
//! automata recognizes the same language as a single automaton over all terms.

use std::path::Path;

use tracing::{debug, info};

use crate::automaton::{build_run_form, unite, AnyDfa, Dfa};
use crate::codec;
use crate::config::MatcherConfig;
use crate::error::{BuildError, TermscanError};
use crate::scanner::entry_name;

pub struct Batcher {
    config: MatcherConfig,
}

impl Batcher {
    pub fn new(config: MatcherConfig) -> Result<Self, BuildError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Build one automaton per batch, then combine them per the configuration.
    pub fn build<I, S>(&self, terms: I) -> Vec<AnyDfa>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms: Vec<S> = terms.into_iter().collect();
        let batches = terms.chunks(self.config.terms_per_automaton);
        let total = batches.len();
        let mut built = Vec::with_capacity(total);
        for (i, batch) in batches.enumerate() {
            let form = build_run_form(batch.iter().map(|term| AsRef::<str>::as_ref(term)));
            debug!(
                batch = i + 1,
                of = total,
                terms = batch.len(),
                states = form.state_count(),
                "built batch automaton"
            );
            built.push(AnyDfa::from(form));
        }
        info!(terms = terms.len(), batches = total, "built dictionary automata");
        self.combine(built)
    }

    /// Unite consecutive runs of `piece_size` automata and compress the
    /// results when configured. Order is preserved.
    pub fn combine(&self, automata: Vec<AnyDfa>) -> Vec<AnyDfa> {
        let piece_size = self.config.piece_size;
        let combined: Vec<AnyDfa> = if piece_size > 1 {
            automata
                .chunks(piece_size)
                .map(|piece| match piece {
                    [single] => single.clone(),
                    _ => AnyDfa::from(unite(piece)),
                })
                .collect()
        } else {
            automata
        };
        if piece_size > 1 {
            info!(pieces = combined.len(), piece_size, "united automata");
        }
        if self.config.compress {
            combined.into_iter().map(AnyDfa::compress).collect()
        } else {
            combined
        }
    }

    /// Write automata to an archive, named in order.
    pub fn write_archive(&self, path: &Path, automata: &[AnyDfa]) -> Result<usize, TermscanError> {
        codec::write_archive(
            path,
            automata
                .iter()
                .enumerate()
                .map(|(i, dfa)| (entry_name(i), dfa)),
        )
    }
}
