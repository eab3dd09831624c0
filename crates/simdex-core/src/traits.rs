//! Collaborator traits.
//!
//! The engine does not own raw documents. A [`DocumentStore`] is the
//! boundary to whatever persists them (a database, a directory of files);
//! the index only iterates it during a rebuild and flips its "indexed" flag.

use crate::Result;
use crate::types::SourceDocument;

/// Per-document results of a store walk.
pub type DocumentIter<'a> = Box<dyn Iterator<Item = Result<SourceDocument>> + Send + 'a>;

/// Source of documents for a full index rebuild.
///
/// # Failures
///
/// [`documents`](Self::documents) fails as a whole when the store cannot be
/// listed at all. Otherwise it yields one `Result` per document, so a single
/// undecodable document can be skipped without aborting the walk.
///
/// # Example
///
/// ```
/// use simdex_core::{DocumentIter, DocumentStore, Result, SourceDocument};
///
/// struct Fixed(Vec<SourceDocument>);
///
/// impl DocumentStore for Fixed {
///     fn documents(&self) -> Result<DocumentIter<'_>> {
///         Ok(Box::new(self.0.iter().cloned().map(Ok)))
///     }
///
///     fn get(&self, doc_id: &str) -> Result<SourceDocument> {
///         self.0
///             .iter()
///             .find(|d| d.doc_id == doc_id)
///             .cloned()
///             .ok_or_else(|| simdex_core::Error::not_found(doc_id))
///     }
///
///     fn mark_indexed(&self, _doc_id: &str) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let store = Fixed(vec![SourceDocument::new("d1", "hello world")]);
/// assert_eq!(store.documents().unwrap().count(), 1);
/// ```
pub trait DocumentStore: Send + Sync {
    /// Iterate every indexable document.
    ///
    /// # Errors
    ///
    /// Fails when the set of documents cannot be enumerated.
    fn documents(&self) -> Result<DocumentIter<'_>>;

    /// Fetch a single document by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the id is unknown.
    fn get(&self, doc_id: &str) -> Result<SourceDocument>;

    /// Record that a document has been inserted into the index.
    fn mark_indexed(&self, doc_id: &str) -> Result<()>;

    /// Name of this store for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn DocumentStore) {}
    }
}
