//! Scanning text for dictionary terms.
//!
//! Each automaton is run independently over the text. At every offset the
//! longest accepting run of at least one character is taken and the scan
//! resumes at its end; offsets with no run advance by one character. Raw runs
//! then pass through the [`BoundaryPolicy`], which drops runs that are part of
//! a longer word.
//!
//! Spans are byte offsets into the scanned text and always fall on character
//! boundaries. Lengths used by the boundary rule are counted in characters.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::automaton::{build_run_form, AnyDfa, Dfa};
use crate::batch::Batcher;
use crate::codec::{self, archive::ARCHIVE_MAGIC, Archive};
use crate::config::MatcherConfig;
use crate::error::TermscanError;

/// Stand-in for the character before the start or after the end of the text.
const SENTINEL: char = ' ';

/// A reported match: a half-open span plus the covered text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Mention {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Mention {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Rules a raw run must satisfy to be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryPolicy {
    /// Runs shorter than this many characters are dropped.
    pub min_len: usize,
    /// A trailing suffix character that may follow a run when nothing but a
    /// non-letter comes after it. The reported mention then includes it.
    pub plural_suffix: Option<char>,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        Self {
            min_len: 3,
            plural_suffix: Some('s'),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verdict {
    Accept { end: usize, extended: bool },
    TooShort,
    LeftBoundary,
    RightBoundary,
}

impl BoundaryPolicy {
    /// The mention for `run`, or `None` when the run is rejected.
    pub fn mention(&self, text: &str, run: &Run) -> Option<Mention> {
        match self.judge(text, run) {
            Verdict::Accept { end, .. } => Some(mention_at(text, run.start, end)),
            _ => None,
        }
    }

    fn judge(&self, text: &str, run: &Run) -> Verdict {
        if run.chars < self.min_len {
            return Verdict::TooShort;
        }
        if is_letter(char_before(text, run.start)) {
            return Verdict::LeftBoundary;
        }
        let right = char_at(text, run.end);
        if !is_letter(right) {
            return Verdict::Accept {
                end: run.end,
                extended: false,
            };
        }
        match self.plural_suffix {
            Some(suffix) if right == suffix => {
                let end = run.end + right.len_utf8();
                if is_letter(char_at(text, end)) {
                    Verdict::RightBoundary
                } else {
                    Verdict::Accept {
                        end,
                        extended: true,
                    }
                }
            }
            _ => Verdict::RightBoundary,
        }
    }
}

fn is_letter(c: char) -> bool {
    c.is_alphabetic()
}

fn char_before(text: &str, at: usize) -> char {
    text.get(..at)
        .and_then(|head| head.chars().next_back())
        .unwrap_or(SENTINEL)
}

fn char_at(text: &str, at: usize) -> char {
    text.get(at..)
        .and_then(|tail| tail.chars().next())
        .unwrap_or(SENTINEL)
}

fn mention_at(text: &str, start: usize, end: usize) -> Mention {
    Mention::new(start, end, text.get(start..end).unwrap_or_default())
}

/// A raw accepting run found by [`find_runs`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
    /// Length of the run in characters.
    pub chars: usize,
}

/// Iterator over the longest non-overlapping accepting runs of `dfa` in `text`.
pub fn find_runs<'a, D: Dfa + ?Sized>(dfa: &'a D, text: &'a str) -> Runs<'a, D> {
    Runs { dfa, text, pos: 0 }
}

pub struct Runs<'a, D: ?Sized> {
    dfa: &'a D,
    text: &'a str,
    pos: usize,
}

impl<D: Dfa + ?Sized> Iterator for Runs<'_, D> {
    type Item = Run;

    fn next(&mut self) -> Option<Run> {
        while let Some(rest) = self.text.get(self.pos..).filter(|r| !r.is_empty()) {
            let start = self.pos;
            let mut state = self.dfa.initial_state();
            let mut chars = 0;
            let mut best = None;
            for (offset, c) in rest.char_indices() {
                match self.dfa.step(state, c) {
                    Some(next) => state = next,
                    None => break,
                }
                chars += 1;
                if self.dfa.is_accepting(state) {
                    best = Some((start + offset + c.len_utf8(), chars));
                }
            }
            match best {
                Some((end, chars)) => {
                    self.pos = end;
                    return Some(Run { start, end, chars });
                }
                None => {
                    self.pos += rest.chars().next().map_or(1, char::len_utf8);
                }
            }
        }
        None
    }
}

/// Caller-owned counters for a series of scans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchStats {
    pub texts: usize,
    pub runs: usize,
    pub too_short: usize,
    pub left_boundary: usize,
    pub right_boundary: usize,
    pub plural_extended: usize,
    /// Accepted runs, counted before deduplication.
    pub accepted: usize,
}

impl MatchStats {
    pub fn merge(&mut self, other: &MatchStats) {
        self.texts += other.texts;
        self.runs += other.runs;
        self.too_short += other.too_short;
        self.left_boundary += other.left_boundary;
        self.right_boundary += other.right_boundary;
        self.plural_extended += other.plural_extended;
        self.accepted += other.accepted;
    }

    pub fn rejected(&self) -> usize {
        self.too_short + self.left_boundary + self.right_boundary
    }
}

/// A set of immutable automata plus the boundary policy applied to their runs.
///
/// `Matcher` is `Send + Sync`; cloning shares the automata.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    automata: Vec<Arc<AnyDfa>>,
    policy: BoundaryPolicy,
}

impl Matcher {
    pub fn new(policy: BoundaryPolicy) -> Self {
        Self {
            automata: Vec::new(),
            policy,
        }
    }

    pub fn with_automata(automata: Vec<AnyDfa>, policy: BoundaryPolicy) -> Self {
        Self {
            automata: automata.into_iter().map(Arc::new).collect(),
            policy,
        }
    }

    /// A matcher over a single automaton built from `terms`.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_automata(
            vec![AnyDfa::from(build_run_form(terms))],
            BoundaryPolicy::default(),
        )
    }

    /// A matcher over automata built in batches according to `config`.
    pub fn from_terms_batched<I, S>(terms: I, config: &MatcherConfig) -> Result<Self, TermscanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let batcher = Batcher::new(config.clone())?;
        Ok(Self::with_automata(batcher.build(terms), config.boundary))
    }

    /// Load an archive, or a single automaton blob when the file is not an archive.
    pub fn load(path: &Path, config: &MatcherConfig) -> Result<Self, TermscanError> {
        let mut magic = Vec::with_capacity(ARCHIVE_MAGIC.len());
        File::open(path)?
            .take(ARCHIVE_MAGIC.len() as u64)
            .read_to_end(&mut magic)?;
        if codec::is_archive(&magic) {
            return Self::load_archive(path, config);
        }
        config.validate()?;
        let mut dfa = codec::load(path)?;
        if config.compress {
            dfa = dfa.compress();
        }
        info!(path = %path.display(), kind = ?dfa.kind(), "loaded automaton");
        Ok(Self::with_automata(vec![dfa], config.boundary))
    }

    /// Load every archive entry in written order, uniting runs of
    /// `config.piece_size` entries.
    pub fn load_archive(path: &Path, config: &MatcherConfig) -> Result<Self, TermscanError> {
        let batcher = Batcher::new(config.clone())?;
        let archive = Archive::open(path)?;
        let total = archive.len();
        let mut decoded = Vec::with_capacity(total);
        for (i, entry) in archive.entries().enumerate() {
            info!("loading entry {} ({} of {})", entry.name, i + 1, total);
            match entry.decode() {
                Ok(dfa) => decoded.push(dfa),
                Err(e) => {
                    warn!(entry = entry.name, error = %e, "failed to decode archive entry");
                    return Err(e);
                }
            }
        }
        let automata = batcher.combine(decoded);
        info!(
            path = %path.display(),
            entries = total,
            automata = automata.len(),
            "loaded automaton archive"
        );
        Ok(Self::with_automata(automata, config.boundary))
    }

    /// Write the automata to an archive, one entry each.
    pub fn write_archive(&self, path: &Path) -> Result<usize, TermscanError> {
        codec::write_archive(
            path,
            self.automata
                .iter()
                .enumerate()
                .map(|(i, dfa)| (entry_name(i), &**dfa)),
        )
    }

    pub fn match_text(&self, text: &str) -> HashSet<Mention> {
        let mut stats = MatchStats::default();
        self.match_text_with_stats(text, &mut stats)
    }

    /// Like [`match_text`](Self::match_text), also recording run outcomes in `stats`.
    pub fn match_text_with_stats(&self, text: &str, stats: &mut MatchStats) -> HashSet<Mention> {
        let mut mentions = HashSet::new();
        stats.texts += 1;
        for dfa in &self.automata {
            for run in find_runs(&**dfa, text) {
                stats.runs += 1;
                match self.policy.judge(text, &run) {
                    Verdict::Accept { end, extended } => {
                        stats.accepted += 1;
                        if extended {
                            stats.plural_extended += 1;
                        }
                        mentions.insert(mention_at(text, run.start, end));
                    }
                    Verdict::TooShort => stats.too_short += 1,
                    Verdict::LeftBoundary => stats.left_boundary += 1,
                    Verdict::RightBoundary => stats.right_boundary += 1,
                }
            }
        }
        mentions
    }

    /// Match many texts in parallel. Results are in input order.
    pub fn match_many<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<HashSet<Mention>> {
        texts
            .par_iter()
            .map(|text| self.match_text(text.as_ref()))
            .collect()
    }

    pub fn automata(&self) -> &[Arc<AnyDfa>] {
        &self.automata
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.automata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.automata.is_empty()
    }

    pub fn push(&mut self, dfa: AnyDfa) {
        self.automata.push(Arc::new(dfa));
    }

    pub(crate) fn push_shared(&mut self, dfa: Arc<AnyDfa>) {
        self.automata.push(dfa);
    }

    pub fn memory_usage(&self) -> usize {
        self.automata.iter().map(|dfa| dfa.memory_usage()).sum()
    }
}

pub(crate) fn entry_name(index: usize) -> String {
    format!("automaton-{}.bin", index + 1)
}
