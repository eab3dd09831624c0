//! Document store over a directory of text files.
//!
//! Each file under the root whose extension is configured becomes one
//! document. Its id is the path relative to the root, with `/` separators.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use simdex_core::{DocumentIter, DocumentStore, Error, Metadata, Result, SourceDocument};

/// [`DocumentStore`] reading `*.md` / `*.txt` (or other configured) files.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    extensions: Vec<String>,
    indexed: RwLock<HashSet<String>>,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
            indexed: RwLock::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `doc_id` was marked indexed during this process.
    pub fn is_indexed(&self, doc_id: &str) -> bool {
        let indexed = self.indexed.read().unwrap_or_else(PoisonError::into_inner);
        indexed.contains(doc_id)
    }

    /// Paths of all matching files, sorted.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the root is not a directory.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(Error::not_found(format!(
                "content directory {}",
                self.root.display()
            )));
        }

        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let mut files = Vec::new();
        for ext in &self.extensions {
            let pattern = format!("{root}/**/*.{}", glob::Pattern::escape(ext));
            let paths = glob::glob(&pattern)
                .map_err(|e| Error::config(format!("invalid content pattern '{pattern}': {e}")))?;
            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => files.push(path),
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable path: {e}"),
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn doc_id_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// `doc_id` as a path under the root, if it stays there.
    fn resolve(&self, doc_id: &str) -> Option<PathBuf> {
        let relative = Path::new(doc_id);
        let inside = !doc_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        inside.then(|| self.root.join(relative))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x == e))
    }

    fn read(&self, path: &Path) -> Result<SourceDocument> {
        let doc_id = self.doc_id_for(path);
        let bytes = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::invalid_data(format!("'{doc_id}' is not valid UTF-8")))?;

        let mut metadata = Metadata::new();
        if let Some(name) = path.file_name() {
            metadata.insert("filename".to_string(), name.to_string_lossy().into_owned());
        }
        metadata.insert("file_path".to_string(), path.to_string_lossy().into_owned());
        if let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) {
            let modified: DateTime<Utc> = modified.into();
            metadata.insert("created_at".to_string(), modified.to_rfc3339());
        }

        Ok(SourceDocument {
            doc_id,
            text,
            metadata,
        })
    }
}

impl DocumentStore for DirectoryStore {
    fn documents(&self) -> Result<DocumentIter<'_>> {
        let files = self.files()?;
        Ok(Box::new(files.into_iter().map(move |path| self.read(&path))))
    }

    fn get(&self, doc_id: &str) -> Result<SourceDocument> {
        let path = self
            .resolve(doc_id)
            .filter(|p| p.is_file() && self.has_extension(p))
            .ok_or_else(|| Error::not_found(doc_id))?;
        self.read(&path)
    }

    fn mark_indexed(&self, doc_id: &str) -> Result<()> {
        let mut indexed = self.indexed.write().unwrap_or_else(PoisonError::into_inner);
        indexed.insert(doc_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "directory"
    }
}
