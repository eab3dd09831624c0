//! In-memory [`DocumentStore`].
//!
//! Used by tests and by embedders that already hold their corpus in memory.

use std::collections::{BTreeMap, HashSet};
use std::sync::{PoisonError, RwLock};

use simdex_core::{DocumentIter, DocumentStore, Error, Result, SourceDocument};

#[derive(Debug, Clone)]
enum Entry {
    Doc(SourceDocument),
    /// Present in the store but not decodable as text.
    Undecodable,
}

#[derive(Debug, Default)]
struct Inner {
    // Insertion order is the iteration order.
    order: Vec<String>,
    entries: BTreeMap<String, Entry>,
    indexed: HashSet<String>,
}

impl Inner {
    fn put(&mut self, doc_id: String, entry: Entry) {
        if self.entries.insert(doc_id.clone(), entry).is_none() {
            self.order.push(doc_id);
        }
    }
}

/// Document store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document. Replacing clears its indexed flag.
    pub fn insert(&self, doc: SourceDocument) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.indexed.remove(&doc.doc_id);
        inner.put(doc.doc_id.clone(), Entry::Doc(doc));
    }

    /// Add an id whose content cannot be read.
    pub fn insert_undecodable(&self, doc_id: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.put(doc_id.to_string(), Entry::Undecodable);
    }

    /// Whether `doc_id` has been marked indexed.
    pub fn is_indexed(&self, doc_id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.indexed.contains(doc_id)
    }

    pub fn indexed_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.indexed.len()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve(doc_id: &str, entry: &Entry) -> Result<SourceDocument> {
    match entry {
        Entry::Doc(doc) => Ok(doc.clone()),
        Entry::Undecodable => Err(Error::invalid_data(format!(
            "document '{doc_id}' is not valid text"
        ))),
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn documents(&self) -> Result<DocumentIter<'_>> {
        // Snapshot so the lock is not held while the caller iterates.
        let snapshot: Vec<Result<SourceDocument>> = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            inner
                .order
                .iter()
                .filter_map(|id| inner.entries.get(id).map(|e| resolve(id, e)))
                .collect()
        };
        Ok(Box::new(snapshot.into_iter()))
    }

    fn get(&self, doc_id: &str) -> Result<SourceDocument> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match inner.entries.get(doc_id) {
            Some(entry) => resolve(doc_id, entry),
            None => Err(Error::not_found(doc_id)),
        }
    }

    fn mark_indexed(&self, doc_id: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if !inner.entries.contains_key(doc_id) {
            return Err(Error::not_found(doc_id));
        }
        inner.indexed.insert(doc_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
