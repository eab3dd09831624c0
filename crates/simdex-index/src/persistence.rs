//! On-disk layout of a similarity index.
//!
//! An index directory holds two companion artifacts:
//!
//! - `metadata.json`: human-inspectable header (mode, backend, dimension,
//!   record count, vector file) and one entry per record. In basic mode
//!   each entry also carries its feature set.
//! - `vectors-<hash>.bin`: the rkyv-encoded [`FlatIpIndex`], vector mode
//!   only. The name is derived from the encoded bytes, so a new generation
//!   never overwrites the one the current metadata points at.
//!
//! Saving writes the vector generation first and then replaces
//! `metadata.json` atomically. That rename is the commit point: until it
//! happens, loading still sees the previous metadata and the previous
//! vector file. Superseded vector files are removed after the commit.
//!
//! Loading cross-checks the header against the records and the vector
//! artifact; any disagreement is a parse failure so the caller can fall
//! back to an empty index.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use simdex_core::util::files::write_atomic;
use simdex_core::{Error, IndexMode, Metadata, Result};
use simdex_vector::FlatIpIndex;

use crate::backend::{RepresentationStore, ScoringBackend};
use crate::features::FeatureSet;
use crate::state::{DocumentRecord, IndexState};

/// Metadata artifact file name.
pub const METADATA_FILE: &str = "metadata.json";

const VECTORS_PREFIX: &str = "vectors";
const VECTORS_SUFFIX: &str = ".bin";

const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct IndexMetadata {
    version: u32,
    mode: IndexMode,
    backend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vectors_file: Option<String>,
    count: usize,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    records: Vec<PersistedRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord {
    position: usize,
    doc_id: String,
    content_preview: String,
    #[serde(default)]
    metadata: Metadata,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    features: Option<FeatureSet>,
}

/// Path of the metadata artifact under `dir`.
pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

/// Whether `dir` holds a metadata artifact.
pub fn artifacts_exist(dir: &Path) -> bool {
    metadata_path(dir).is_file()
}

/// File name of the vector generation holding `encoded`.
pub fn vectors_file_name(encoded: &[u8]) -> String {
    let hash = blake3::hash(encoded).to_hex();
    format!("{VECTORS_PREFIX}-{}{VECTORS_SUFFIX}", &hash.as_str()[..16])
}

fn is_vectors_file(name: &str) -> bool {
    name.starts_with(VECTORS_PREFIX) && name.ends_with(VECTORS_SUFFIX)
}

/// Vector files present in `dir`, sorted.
pub fn vector_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_vectors_file(name))
        .collect();
    names.sort();
    names
}

/// Write `state` to `dir`.
///
/// A failure at any step leaves the previously committed artifacts
/// readable as they were.
pub fn save_state(dir: &Path, state: &IndexState) -> Result<()> {
    let vectors_file = match state.store() {
        RepresentationStore::Features(_) => None,
        RepresentationStore::Vectors(index) => Some(write_vectors(dir, index)?),
    };
    write_metadata(dir, state, vectors_file.as_deref())?;
    remove_stale_vectors(dir, vectors_file.as_deref());

    log::debug!(
        "Saved {} {} records to {}",
        state.len(),
        state.mode(),
        dir.display()
    );
    Ok(())
}

/// Write the vector generation for `index`; returns its file name.
pub(crate) fn write_vectors(dir: &Path, index: &FlatIpIndex) -> Result<String> {
    let encoded = index.to_bytes()?;
    let name = vectors_file_name(&encoded);
    write_atomic(&dir.join(&name), &encoded)?;
    Ok(name)
}

/// Atomically replace the metadata artifact. This commits the save.
pub(crate) fn write_metadata(
    dir: &Path,
    state: &IndexState,
    vectors_file: Option<&str>,
) -> Result<()> {
    let features = match state.store() {
        RepresentationStore::Features(all) => Some(all),
        RepresentationStore::Vectors(_) => None,
    };

    let records = state
        .records()
        .iter()
        .enumerate()
        .map(|(position, record)| PersistedRecord {
            position,
            doc_id: record.doc_id.clone(),
            content_preview: record.content_preview.clone(),
            metadata: record.metadata.clone(),
            created_at: record.created_at,
            features: features.and_then(|all| all.get(position).cloned()),
        })
        .collect();

    let header = IndexMetadata {
        version: FORMAT_VERSION,
        mode: state.mode(),
        backend: state.backend().name().to_string(),
        dimension: state.backend().dimension(),
        vectors_file: vectors_file.map(str::to_string),
        count: state.len(),
        saved_at: Utc::now(),
        updated_at: state.updated_at(),
        records,
    };
    let json = serde_json::to_vec_pretty(&header)?;
    write_atomic(&metadata_path(dir), &json)
}

/// Delete every vector file in `dir` except `keep`.
fn remove_stale_vectors(dir: &Path, keep: Option<&str>) {
    for name in vector_files(dir) {
        if Some(name.as_str()) == keep {
            continue;
        }
        let stale = dir.join(&name);
        match std::fs::remove_file(&stale) {
            Ok(()) => log::debug!("Removed superseded {}", stale.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove superseded {}: {e}", stale.display()),
        }
    }
}

/// Read the index saved in `dir` for use with `backend`.
///
/// # Errors
///
/// I/O errors for missing files, [`Error::Parse`] for anything that does
/// not decode or does not match `backend`.
pub fn load_state(dir: &Path, backend: Arc<dyn ScoringBackend>) -> Result<IndexState> {
    let path = metadata_path(dir);
    let raw = std::fs::read(&path).map_err(|e| Error::io_with_path(e, &path))?;
    let mut header: IndexMetadata = serde_json::from_slice(&raw)
        .map_err(|e| Error::parse(format!("{}: {e}", path.display())))?;

    if header.version != FORMAT_VERSION {
        return Err(Error::parse(format!(
            "unsupported index format version {}",
            header.version
        )));
    }
    if header.mode != backend.mode() {
        return Err(Error::parse(format!(
            "index was saved in {} mode, current backend is {}",
            header.mode,
            backend.mode()
        )));
    }
    if header.count != header.records.len() {
        return Err(Error::parse(format!(
            "header declares {} records, found {}",
            header.count,
            header.records.len()
        )));
    }

    header.records.sort_by_key(|r| r.position);
    if header
        .records
        .iter()
        .enumerate()
        .any(|(i, r)| r.position != i)
    {
        return Err(Error::parse("record positions are not contiguous"));
    }

    let store = match backend.mode() {
        IndexMode::Basic => {
            let mut all = Vec::with_capacity(header.records.len());
            for record in &mut header.records {
                let features = record.features.take().ok_or_else(|| {
                    Error::parse(format!("record '{}' has no features", record.doc_id))
                })?;
                all.push(features);
            }
            RepresentationStore::Features(all)
        }
        IndexMode::Vector => {
            if header.backend != backend.name() {
                return Err(Error::parse(format!(
                    "vectors were produced by '{}', current backend is '{}'",
                    header.backend,
                    backend.name()
                )));
            }
            let name = header
                .vectors_file
                .as_deref()
                .filter(|name| {
                    is_vectors_file(name) && Path::new(name).file_name() == Some(OsStr::new(name))
                })
                .ok_or_else(|| Error::parse("metadata does not name a vector file"))?;
            let index = FlatIpIndex::load(&dir.join(name))?;
            if Some(index.dimension()) != header.dimension
                || Some(index.dimension()) != backend.dimension()
            {
                return Err(Error::parse(format!(
                    "vector dimension {} does not match header {:?} / backend {:?}",
                    index.dimension(),
                    header.dimension,
                    backend.dimension()
                )));
            }
            RepresentationStore::Vectors(index)
        }
    };

    let records = header
        .records
        .into_iter()
        .map(|r| DocumentRecord {
            doc_id: r.doc_id,
            content_preview: r.content_preview,
            metadata: r.metadata,
            created_at: r.created_at,
        })
        .collect();

    IndexState::from_parts(backend, records, store, header.updated_at)
}

// ============================================================================
// Tests
// ============================================================================
