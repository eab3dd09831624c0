//! In-memory index state.
//!
//! An [`IndexState`] is an immutable-once-published snapshot: readers hold
//! an `Arc` to it while scoring, and writers either mutate a private copy
//! or build a fresh one before swapping it in.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use simdex_core::{Error, IndexMode, Metadata, Result};

use crate::backend::{Representation, RepresentationStore, ScoringBackend};

/// Display and bookkeeping data for one indexed document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub doc_id: String,
    /// First `preview_chars` characters of the text.
    pub content_preview: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a record stamped with the current time.
    pub fn new(doc_id: &str, text: &str, metadata: Metadata, preview_chars: usize) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            content_preview: preview(text, preview_chars),
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Character-bounded prefix of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Records, their representations, and the backend that produced them.
#[derive(Clone)]
pub struct IndexState {
    pub(crate) backend: Arc<dyn ScoringBackend>,
    pub(crate) records: Vec<DocumentRecord>,
    pub(crate) positions: HashMap<String, usize>,
    pub(crate) store: RepresentationStore,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for IndexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexState")
            .field("backend", &self.backend.name())
            .field("mode", &self.mode())
            .field("records", &self.records.len())
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl IndexState {
    /// Empty state for `backend`.
    pub fn empty(backend: Arc<dyn ScoringBackend>) -> Self {
        let store = backend.empty_store();
        Self {
            backend,
            records: Vec::new(),
            positions: HashMap::new(),
            store,
            updated_at: None,
        }
    }

    /// Assemble a state from persisted parts, checking they line up.
    pub(crate) fn from_parts(
        backend: Arc<dyn ScoringBackend>,
        records: Vec<DocumentRecord>,
        store: RepresentationStore,
        updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if store.mode() != backend.mode() {
            return Err(Error::parse(format!(
                "persisted {} index cannot be served by the {} backend",
                store.mode(),
                backend.mode()
            )));
        }
        if store.len() != records.len() {
            return Err(Error::parse(format!(
                "{} records but {} representations",
                records.len(),
                store.len()
            )));
        }

        let mut positions = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if positions.insert(record.doc_id.clone(), i).is_some() {
                return Err(Error::parse(format!("duplicate doc_id '{}'", record.doc_id)));
            }
        }

        Ok(Self {
            backend,
            records,
            positions,
            store,
            updated_at,
        })
    }

    pub fn mode(&self) -> IndexMode {
        self.store.mode()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn backend(&self) -> &Arc<dyn ScoringBackend> {
        &self.backend
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn store(&self) -> &RepresentationStore {
        &self.store
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Insert or replace the record for `record.doc_id`.
    ///
    /// A known id keeps its position; its record and representation are
    /// overwritten. Nothing changes if the representation is rejected.
    pub fn upsert(&mut self, record: DocumentRecord, repr: Representation) -> Result<()> {
        match self.positions.get(&record.doc_id) {
            Some(&position) => {
                self.store.replace(position, repr)?;
                self.records[position] = record;
            }
            None => {
                self.store.push(repr)?;
                self.positions
                    .insert(record.doc_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Position of `doc_id`, if indexed.
    pub fn position(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }
}
