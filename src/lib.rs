//! termscan: dictionary matching over large term vocabularies.
//!
//! Terms are compiled into minimal deterministic automata, persisted as
//! checked binary blobs (optionally bundled in an archive), and run over text
//! to report every term occurrence that respects word boundaries.
//!
//! ```
//! use termscan::{Matcher, Mention};
//!
//! let matcher = Matcher::from_terms(["aspirin", "iron"]);
//! let found = matcher.match_text("two aspirins, no ironic remarks");
//! assert_eq!(found.len(), 1);
//! assert!(found.contains(&Mention::new(4, 12, "aspirins")));
//! ```
//!
//! Large vocabularies are built in batches:
//!
//! ```
//! use termscan::{Matcher, MatcherConfig};
//!
//! let config = MatcherConfig {
//!     terms_per_automaton: 2,
//!     piece_size: 2,
//!     ..MatcherConfig::default()
//! };
//! let terms = ["benzene", "toluene", "xylene", "phenol", "aniline"];
//! let matcher = Matcher::from_terms_batched(terms, &config).unwrap();
//! assert_eq!(matcher.len(), 2);
//! assert_eq!(matcher.match_text("phenol and xylene").len(), 2);
//! ```

pub mod automaton;
pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod scanner;
pub mod shared;

pub use automaton::{AnyDfa, CompressedRunForm, Dfa, DfaKind, DictionaryBuilder, RunForm};
pub use batch::Batcher;
pub use config::MatcherConfig;
pub use error::{BuildError, DecodeError, Result, TermscanError};
pub use scanner::{find_runs, BoundaryPolicy, MatchStats, Matcher, Mention, Run};
pub use shared::SharedMatcher;
