//! Chunked safetensors vector store.
//!
//! A store directory holds `meta.json` plus N files named `0000.safetensors`,
//! `0001.safetensors`, … Each chunk carries two tensors, `post_ids` (int64) and
//! `vectors` (float32, `[rows, dim]`). Loaded chunks are concatenated and sorted
//! by post id once; after that the store is immutable.

use crate::errors::{AppError, Result};
use safetensors::{Dtype, SafeTensors};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct VectorStoreMeta {
    chunks: usize,
    #[serde(default)]
    model: String,
    embedding_dim: usize,
    #[serde(default)]
    csv_path: String,
}

/// An in-memory, post-id-indexed matrix of unit-norm embedding vectors.
pub struct VectorStore {
    post_ids: Vec<i64>,
    vectors: Vec<f32>,
    dim: usize,
    index: HashMap<i64, usize>,
    model: String,
    csv_path: String,
}

impl VectorStore {
    /// Load a store from `dir`. Returns `Ok(None)` if `dir` doesn't exist at
    /// all (an absent optional store, e.g. reasoning/summary), `Err` for
    /// anything present but malformed.
    pub fn load_optional(dir: impl AsRef<Path>) -> Result<Option<Self>> {
        if !dir.as_ref().exists() {
            return Ok(None);
        }
        Self::load(dir).map(Some)
    }

    /// Load a store, failing if the directory or its metadata is missing.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let meta_path = dir.join("meta.json");
        let meta_bytes = fs::read(&meta_path).map_err(|_| AppError::CorruptStore {
            message: format!("metadata file not found: {}", meta_path.display()),
        })?;
        let meta: VectorStoreMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| AppError::CorruptStore { message: format!("invalid meta.json: {e}") })?;

        let mut rows: Vec<(i64, Vec<f32>)> = Vec::new();
        let mut seen = HashSet::new();

        for chunk_id in 0..meta.chunks {
            let chunk_path = dir.join(format!("{:04}.safetensors", chunk_id));
            if !chunk_path.exists() {
                continue;
            }
            let data = fs::read(&chunk_path).map_err(|e| AppError::CorruptStore {
                message: format!("chunk {chunk_id} unreadable: {e}"),
            })?;
            let tensors = SafeTensors::deserialize(&data).map_err(|e| AppError::CorruptStore {
                message: format!("chunk {chunk_id} corrupt: {e}"),
            })?;

            let post_ids_view = tensors.tensor("post_ids").map_err(|_| AppError::CorruptStore {
                message: format!("chunk {chunk_id} missing post_ids tensor"),
            })?;
            let vectors_view = tensors.tensor("vectors").map_err(|_| AppError::CorruptStore {
                message: format!("chunk {chunk_id} missing vectors tensor"),
            })?;

            if post_ids_view.dtype() != Dtype::I64 {
                return Err(AppError::CorruptStore {
                    message: format!("chunk {chunk_id} post_ids tensor is not int64"),
                });
            }
            if vectors_view.dtype() != Dtype::F32 {
                return Err(AppError::CorruptStore {
                    message: format!("chunk {chunk_id} vectors tensor is not float32"),
                });
            }

            let shape = vectors_view.shape();
            if shape.len() != 2 || shape[1] != meta.embedding_dim {
                return Err(AppError::CorruptStore {
                    message: format!("chunk {chunk_id} shape mismatch: {:?}", shape),
                });
            }

            let ids: Vec<i64> = post_ids_view
                .data()
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes(c.try_into().expect("8-byte chunk")))
                .collect();
            if shape[0] != ids.len() {
                return Err(AppError::CorruptStore {
                    message: format!("chunk {chunk_id} post_ids/vectors length mismatch"),
                });
            }
            let flat: Vec<f32> = vectors_view
                .data()
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().expect("4-byte chunk")))
                .collect();

            for (i, id) in ids.into_iter().enumerate() {
                if !seen.insert(id) {
                    return Err(AppError::CorruptStore {
                        message: format!("duplicate post id {id} across chunks"),
                    });
                }
                let start = i * meta.embedding_dim;
                rows.push((id, flat[start..start + meta.embedding_dim].to_vec()));
            }
        }

        rows.sort_by_key(|(id, _)| *id);

        let mut post_ids = Vec::with_capacity(rows.len());
        let mut vectors = Vec::with_capacity(rows.len() * meta.embedding_dim);
        let mut index = HashMap::with_capacity(rows.len());
        for (row_idx, (id, vec)) in rows.into_iter().enumerate() {
            index.insert(id, row_idx);
            post_ids.push(id);
            vectors.extend(vec);
        }

        Ok(Self {
            post_ids,
            vectors,
            dim: meta.embedding_dim,
            index,
            model: meta.model,
            csv_path: meta.csv_path,
        })
    }

    pub fn len(&self) -> usize {
        self.post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post_ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn csv_path(&self) -> &str {
        &self.csv_path
    }

    pub fn post_ids(&self) -> &[i64] {
        &self.post_ids
    }

    pub fn contains(&self, post_id: i64) -> bool {
        self.index.contains_key(&post_id)
    }

    fn row(&self, idx: usize) -> &[f32] {
        let start = idx * self.dim;
        &self.vectors[start..start + self.dim]
    }

    /// O(log M) lookup by post id (binary search over the sorted id array).
    pub fn get(&self, post_id: i64) -> Option<&[f32]> {
        self.index.get(&post_id).map(|&idx| self.row(idx))
    }

    /// Score every row against `query`, returning all of them sorted by
    /// cosine similarity descending. Never truncates.
    pub fn scan(&self, query: &[f32]) -> Vec<(i64, f32)> {
        let mut results: Vec<(i64, f32)> = self
            .post_ids
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, cosine(self.row(idx), query)))
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;
    use std::collections::HashMap as StdHashMap;

    fn write_chunk(dir: &Path, index: usize, ids: &[i64], vecs: &[Vec<f32>]) {
        let dim = vecs[0].len();
        let id_bytes: Vec<u8> = ids.iter().flat_map(|v| v.to_le_bytes()).collect();
        let vec_bytes: Vec<u8> = vecs.iter().flatten().flat_map(|v| v.to_le_bytes()).collect();

        let id_view = TensorView::new(Dtype::I64, vec![ids.len()], &id_bytes).unwrap();
        let vec_view = TensorView::new(Dtype::F32, vec![ids.len(), dim], &vec_bytes).unwrap();

        let mut tensors: StdHashMap<String, TensorView> = StdHashMap::new();
        tensors.insert("post_ids".to_string(), id_view);
        tensors.insert("vectors".to_string(), vec_view);

        let bytes = safetensors::serialize(&tensors, &None).unwrap();
        fs::write(dir.join(format!("{:04}.safetensors", index)), bytes).unwrap();
    }

    fn make_store(dir: &Path, dim: usize, chunks: &[Vec<(i64, Vec<f32>)>]) {
        fs::create_dir_all(dir).unwrap();
        let meta = serde_json::json!({
            "chunks": chunks.len(),
            "model": "test-model",
            "embedding_dim": dim,
            "chunk_size": 2,
            "csv_path": "../twilog.csv",
        });
        fs::write(dir.join("meta.json"), meta.to_string()).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            let ids: Vec<i64> = chunk.iter().map(|(id, _)| *id).collect();
            let vecs: Vec<Vec<f32>> = chunk.iter().map(|(_, v)| v.clone()).collect();
            write_chunk(dir, i, &ids, &vecs);
        }
    }

    #[test]
    fn load_sorts_by_post_id_and_scans() {
        let tmp = std::env::temp_dir().join(format!("twilog-vs-test-{}", std::process::id()));
        make_store(
            &tmp,
            3,
            &[
                vec![(20, vec![1.0, 0.0, 0.0]), (10, vec![0.0, 1.0, 0.0])],
                vec![(30, vec![0.0, 0.0, 1.0])],
            ],
        );

        let store = VectorStore::load(&tmp).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.post_ids(), &[10, 20, 30]);
        assert_eq!(store.model(), "test-model");

        let results = store.scan(&[1.0, 0.0, 0.0]);
        assert_eq!(results[0].0, 20);
        assert!((results[0].1 - 1.0).abs() < 1e-6);

        let v = store.get(10).unwrap();
        assert_eq!(v, &[0.0, 1.0, 0.0]);
        assert!(store.get(999).is_none());

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_directory_is_optional_none() {
        let missing = std::env::temp_dir().join("twilog-vs-does-not-exist-xyz");
        let result = VectorStore::load_optional(&missing).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn duplicate_post_id_across_chunks_is_fatal() {
        let tmp = std::env::temp_dir().join(format!("twilog-vs-dup-test-{}", std::process::id()));
        make_store(
            &tmp,
            2,
            &[vec![(1, vec![1.0, 0.0])], vec![(1, vec![0.0, 1.0])]],
        );
        let err = VectorStore::load(&tmp).unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::CorruptStore);
        fs::remove_dir_all(&tmp).ok();
    }
}
