//! Binary encoding of run forms.
//!
//! A blob is a fixed header followed by a bincode payload:
//!
//! ```text
//! magic "TSDF" | version u16 | kind u8 | flags u8 | payload_len u64 | sha256 [32] | payload
//! ```
//!
//! All integers are little-endian. The header makes blobs self-describing:
//! a decoder rejects foreign bytes, other format versions, truncation and
//! corruption with a [`DecodeError`] before any table is interpreted, and the
//! decoded tables are validated structurally before a run form is built.
//!
//! - `archive`: a container of named, independently decodable blobs

pub mod archive;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::automaton::{AnyDfa, CompressedRunForm, DfaKind, RunForm};
use crate::error::{DecodeError, TermscanError};

pub use archive::{is_archive, write_archive, Archive, ArchiveEntry, ArchiveWriter};

/// Magic bytes opening every automaton blob.
pub const BLOB_MAGIC: [u8; 4] = *b"TSDF";

/// Current blob format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed blob header.
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 8 + 32;

const KIND_DENSE: u8 = 0;
const KIND_COMPRESSED: u8 = 1;

#[derive(Serialize, Deserialize)]
struct Payload {
    size: u32,
    initial: u32,
    accept: Vec<bool>,
    points: Vec<u32>,
    table: TablePayload,
}

#[derive(Serialize, Deserialize)]
enum TablePayload {
    Dense {
        transitions: Vec<u32>,
    },
    Compressed {
        first_class: Vec<u32>,
        offsets: Vec<u32>,
        runs: Vec<u32>,
    },
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
}

/// Serialize a run form into a self-describing blob.
pub fn encode(dfa: &AnyDfa) -> Result<Vec<u8>, TermscanError> {
    let (kind, payload) = match dfa {
        AnyDfa::Dense(form) => (
            KIND_DENSE,
            Payload {
                size: form.size as u32,
                initial: form.initial,
                accept: form.accept.clone(),
                points: form.classes.points().to_vec(),
                table: TablePayload::Dense {
                    transitions: form.transitions.clone(),
                },
            },
        ),
        AnyDfa::Compressed(form) => (
            KIND_COMPRESSED,
            Payload {
                size: form.size as u32,
                initial: form.initial,
                accept: form.accept.clone(),
                points: form.classes.points().to_vec(),
                table: TablePayload::Compressed {
                    first_class: form.first_class.clone(),
                    offsets: form.offsets.clone(),
                    runs: form.runs.clone(),
                },
            },
        ),
    };

    let body = bincode_options()
        .serialize(&payload)
        .map_err(|e| TermscanError::Encode(e.to_string()))?;
    let digest = Sha256::digest(&body);

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&BLOB_MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(kind);
    out.push(0);
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a blob produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<AnyDfa, DecodeError> {
    if bytes.len() < HEADER_LEN {
        if bytes.len() >= 4 && bytes[..4] != BLOB_MAGIC {
            return Err(DecodeError::BadMagic);
        }
        return Err(DecodeError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    if bytes[..4] != BLOB_MAGIC {
        return Err(DecodeError::BadMagic);
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            expected: FORMAT_VERSION,
            actual: version,
        });
    }
    let kind = match bytes[6] {
        KIND_DENSE => DfaKind::Dense,
        KIND_COMPRESSED => DfaKind::Compressed,
        other => return Err(DecodeError::UnknownKind(other)),
    };
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[8..16]);
    let payload_len = usize::try_from(u64::from_le_bytes(len_bytes)).map_err(|_| {
        DecodeError::Invalid("payload length does not fit in memory".to_string())
    })?;

    let body = &bytes[HEADER_LEN..];
    if body.len() < payload_len {
        return Err(DecodeError::Truncated {
            needed: HEADER_LEN.saturating_add(payload_len),
            available: bytes.len(),
        });
    }
    if body.len() > payload_len {
        return Err(DecodeError::TrailingBytes);
    }
    if Sha256::digest(body).as_slice() != &bytes[16..HEADER_LEN] {
        return Err(DecodeError::ChecksumMismatch);
    }

    let payload: Payload = bincode_options()
        .with_limit(payload_len as u64)
        .deserialize(body)
        .map_err(|e| DecodeError::Payload(e.to_string()))?;

    let size = payload.size as usize;
    match (kind, payload.table) {
        (DfaKind::Dense, TablePayload::Dense { transitions }) => RunForm::from_parts(
            size,
            payload.initial,
            payload.accept,
            payload.points,
            transitions,
        )
        .map(AnyDfa::Dense),
        (
            DfaKind::Compressed,
            TablePayload::Compressed {
                first_class,
                offsets,
                runs,
            },
        ) => CompressedRunForm::from_parts(
            size,
            payload.initial,
            payload.accept,
            payload.points,
            first_class,
            offsets,
            runs,
        )
        .map(AnyDfa::Compressed),
        _ => Err(DecodeError::Invalid(
            "table layout does not match header kind".to_string(),
        )),
    }
}

/// Write a blob to any writer.
pub fn encode_to<W: Write>(dfa: &AnyDfa, mut writer: W) -> Result<(), TermscanError> {
    writer.write_all(&encode(dfa)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a whole blob from any reader and decode it.
pub fn decode_from<R: Read>(mut reader: R) -> Result<AnyDfa, TermscanError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes).map_err(|e| TermscanError::decode("<stream>", e))
}

/// Store a single automaton in its own file.
pub fn store(dfa: &AnyDfa, path: &Path) -> Result<(), TermscanError> {
    let file = File::create(path)?;
    encode_to(dfa, BufWriter::new(file))?;
    debug!(path = %path.display(), kind = ?dfa.kind(), "stored automaton");
    Ok(())
}

/// Load a single automaton stored with [`store`].
pub fn load(path: &Path) -> Result<AnyDfa, TermscanError> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    BufReader::new(file).read_to_end(&mut bytes)?;
    decode(&bytes).map_err(|e| TermscanError::decode(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{build_run_form, Dfa, StateId};

    fn sample() -> AnyDfa {
        AnyDfa::from(build_run_form(["aspirin", "iron", "ibuprofen", "ß-lactam"]))
    }

    fn assert_same_behavior(a: &AnyDfa, b: &AnyDfa) {
        assert_eq!(a.state_count(), b.state_count());
        assert_eq!(a.initial_state(), b.initial_state());
        assert_eq!(a.break_points(), b.break_points());
        for s in 0..a.state_count() {
            let state = StateId::new(s);
            assert_eq!(a.is_accepting(state), b.is_accepting(state));
            for class in 0..a.break_points().len() {
                assert_eq!(a.step_class(state, class), b.step_class(state, class));
            }
        }
    }

    #[test]
    fn test_round_trip_dense() {
        let dfa = sample();
        let decoded = decode(&encode(&dfa).unwrap()).unwrap();
        assert_eq!(decoded.kind(), DfaKind::Dense);
        assert_same_behavior(&dfa, &decoded);
    }

    #[test]
    fn test_round_trip_compressed() {
        let dfa = sample().compress();
        let decoded = decode(&encode(&dfa).unwrap()).unwrap();
        assert_eq!(decoded.kind(), DfaKind::Compressed);
        assert_same_behavior(&dfa, &decoded);
        assert!(decoded.run("ß-lactam"));
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert_eq!(decode(&bytes).unwrap_err(), DecodeError::BadMagic);
        assert_eq!(decode(b"nope").unwrap_err(), DecodeError::BadMagic);
    }

    #[test]
    fn test_rejects_other_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[4] = 9;
        assert_eq!(
            decode(&bytes).unwrap_err(),
            DecodeError::UnsupportedVersion {
                expected: FORMAT_VERSION,
                actual: 9
            }
        );
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[6] = 7;
        assert_eq!(decode(&bytes).unwrap_err(), DecodeError::UnknownKind(7));
    }

    #[test]
    fn test_rejects_kind_table_mismatch() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[6] = KIND_COMPRESSED;
        assert!(matches!(decode(&bytes), Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let bytes = encode(&sample().compress()).unwrap();
        for len in 0..bytes.len() {
            assert!(decode(&bytes[..len]).is_err(), "prefix of {len} bytes decoded");
        }
    }

    #[test]
    fn test_every_corrupted_byte_is_an_error() {
        let bytes = encode(&sample()).unwrap();
        for i in 0..bytes.len() {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= 0x5A;
            // The flags byte is reserved and not interpreted.
            if i == 7 {
                continue;
            }
            assert!(decode(&corrupted).is_err(), "flip at byte {i} decoded");
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = encode(&sample()).unwrap();
        bytes.push(0);
        assert_eq!(decode(&bytes).unwrap_err(), DecodeError::TrailingBytes);
    }

    #[test]
    fn test_store_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.bin");
        let dfa = sample().compress();
        store(&dfa, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_same_behavior(&dfa, &loaded);
    }

    #[test]
    fn test_load_reports_path_on_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"definitely not an automaton blob").unwrap();
        match load(&path) {
            Err(TermscanError::Decode { entry, source }) => {
                assert!(entry.ends_with("garbage.bin"));
                assert_eq!(source, DecodeError::BadMagic);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
