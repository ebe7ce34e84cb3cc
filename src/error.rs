//! Error types.
//!
//! Construction and loading are fallible; matching is not. A failed decode of one
//! archive entry is reported with the entry's name and never affects its siblings.

use thiserror::Error;

/// Errors raised while building automata from a term list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Terms fed to the incremental builder must arrive in ascending order.
    #[error("term {got:?} is out of order (previous term was {previous:?})")]
    OutOfOrder { previous: String, got: String },

    #[error("terms per automaton must be at least 1")]
    EmptyBatchSize,

    #[error("piece size must be at least 1")]
    EmptyPieceSize,
}

/// Errors raised while decoding an automaton blob or an archive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad magic bytes")]
    BadMagic,

    #[error("unsupported format version: expected {expected}, got {actual}")]
    UnsupportedVersion { expected: u16, actual: u16 },

    #[error("unknown automaton kind {0}")]
    UnknownKind(u8),

    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("payload checksum mismatch")]
    ChecksumMismatch,

    #[error("payload could not be decoded: {0}")]
    Payload(String),

    #[error("invalid automaton: {0}")]
    Invalid(String),

    #[error("unexpected trailing bytes after payload")]
    TrailingBytes,
}

/// Top-level error for the crate's fallible operations.
#[derive(Debug, Error)]
pub enum TermscanError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to decode {entry}: {source}")]
    Decode {
        entry: String,
        #[source]
        source: DecodeError,
    },

    #[error("failed to encode automaton: {0}")]
    Encode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TermscanError {
    /// Attach an entry name to a decode failure.
    pub fn decode(entry: impl Into<String>, source: DecodeError) -> Self {
        TermscanError::Decode {
            entry: entry.into(),
            source,
        }
    }
}

pub type Result<T, E = TermscanError> = std::result::Result<T, E>;
