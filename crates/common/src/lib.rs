//! Twilog search core
//!
//! Shared domain types and infrastructure for the search daemon:
//! - Post/summary domain types and on-disk repositories
//! - The chunked safetensors vector store
//! - Embedder adapter abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod domain;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod repository;
pub mod vector_store;

// Re-export commonly used types
pub use config::AppConfig;
pub use domain::{Post, ScoringMode, Summary, TextSource};
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use repository::{PostRepository, SummaryRepository};
pub use vector_store::VectorStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Embedding dimension all stores and the embedder must agree on
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
