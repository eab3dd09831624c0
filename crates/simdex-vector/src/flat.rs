//! Exact inner-product nearest-neighbour index.
//!
//! Vectors are stored contiguously, row-major, one row per indexed
//! document in insertion order. With normalized rows and queries the
//! inner product is the cosine similarity.
//!
//! The index encodes to a single rkyv artifact. Decoding validates the
//! archive and checks that the payload length matches the declared
//! dimension before anything is handed back. Where the bytes live is up to
//! the caller.

use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};
use simdex_core::{Error, Result};

/// Bumped whenever the on-disk layout changes.
const ARTIFACT_VERSION: u32 = 1;

#[derive(Archive, Serialize, Deserialize, Debug)]
struct FlatArtifact {
    version: u32,
    dimension: u32,
    data: Vec<f32>,
}

/// Flat (brute-force) inner-product index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIpIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector; returns its row position.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        let position = self.len();
        self.data.extend_from_slice(vector);
        Ok(position)
    }

    /// Overwrite the vector at `position`.
    pub fn set(&mut self, position: usize, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        if position >= self.len() {
            return Err(Error::invalid_data(format!(
                "row {position} out of range (len {})",
                self.len()
            )));
        }
        let start = position * self.dimension;
        self.data[start..start + self.dimension].copy_from_slice(vector);
        Ok(())
    }

    /// Stored vector at `position`.
    pub fn get(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Inner product of `query` against every stored row, in row order.
    pub fn scores(&self, query: &[f32]) -> Result<Vec<f32>> {
        self.check_dimension(query)?;
        Ok(self
            .data
            .chunks_exact(self.dimension)
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// The `k` highest-scoring rows, best first.
    ///
    /// Equal scores keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        let mut scored: Vec<(usize, f32)> = self.scores(query)?.into_iter().enumerate().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    /// Encoded artifact, readable by [`from_bytes`](Self::from_bytes).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let dimension = u32::try_from(self.dimension)
            .map_err(|_| Error::invalid_data(format!("dimension {} too large", self.dimension)))?;
        let artifact = FlatArtifact {
            version: ARTIFACT_VERSION,
            dimension,
            data: self.data.clone(),
        };
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&artifact)
            .map_err(|e| Error::persistence(format!("failed to encode vector index: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Decode an artifact produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(raw.len());
        aligned.extend_from_slice(raw);

        let artifact = rkyv::from_bytes::<FlatArtifact, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::parse(format!("vector index: {e}")))?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(Error::parse(format!(
                "unsupported vector index version {}",
                artifact.version
            )));
        }
        let dimension = artifact.dimension as usize;
        if dimension == 0 || artifact.data.len() % dimension != 0 {
            return Err(Error::parse(format!(
                "{} values do not fit dimension {dimension}",
                artifact.data.len()
            )));
        }

        Ok(Self {
            dimension,
            data: artifact.data,
        })
    }

    /// Read and decode the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path).map_err(|e| Error::io_with_path(e, path))?;
        Self::from_bytes(&raw).map_err(|e| Error::parse(format!("{}: {e}", path.display())))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::invalid_data("vector index has zero dimension"));
        }
        if vector.len() != self.dimension {
            return Err(Error::invalid_data(format!(
                "expected {}-dimensional vector, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> FlatIpIndex {
        let mut index = FlatIpIndex::new(2);
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.6, 0.8]).unwrap();
        index
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    #[test]
    fn test_add_returns_positions() {
        let mut index = FlatIpIndex::new(3);
        assert!(index.is_empty());
        assert_eq!(index.add(&[0.0, 0.0, 1.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0, 0.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_add_wrong_dimension() {
        let mut index = FlatIpIndex::new(3);
        assert!(index.add(&[1.0]).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_set_overwrites_row() {
        let mut index = sample();
        index.set(1, &[1.0, 0.0]).unwrap();
        assert_eq!(index.get(1).unwrap(), &[1.0, 0.0]);
        assert!(index.set(9, &[1.0, 0.0]).is_err());
    }

    // ------------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------------

    #[test]
    fn test_scores_in_row_order() {
        let index = sample();
        let scores = index.scores(&[1.0, 0.0]).unwrap();
        assert_eq!(scores.len(), 3);
        assert!((scores[0] - 1.0).abs() < 1e-6);
        assert!(scores[1].abs() < 1e-6);
        assert!((scores[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_scores_empty_index() {
        let index = FlatIpIndex::new(4);
        assert!(index.scores(&[0.0; 4]).unwrap().is_empty());
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = sample();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let order: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![0, 2, 1]);
        assert!((hits[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_truncates_and_keeps_ties_stable() {
        let mut index = FlatIpIndex::new(2);
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.0, 1.0]).unwrap();

        let hits = index.search(&[0.0, 1.0], 2).unwrap();
        assert_eq!(hits.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut index = FlatIpIndex::new(0);
        assert!(index.add(&[]).is_err());
        assert!(index.scores(&[]).is_err());
        assert!(index.search(&[], 3).is_err());
        assert!(index.is_empty());
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    #[test]
    fn test_encode_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");

        let original = sample();
        std::fs::write(&path, original.to_bytes().unwrap()).unwrap();
        let loaded = FlatIpIndex::load(&path).unwrap();

        assert_eq!(loaded, original);
        assert_eq!(FlatIpIndex::from_bytes(&original.to_bytes().unwrap()).unwrap(), original);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(FlatIpIndex::load(&dir.path().join("missing.bin")).is_err());
    }

    #[test]
    fn test_load_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.bin");
        std::fs::write(&path, b"definitely not an archive").unwrap();
        assert!(FlatIpIndex::load(&path).is_err());
    }
}
