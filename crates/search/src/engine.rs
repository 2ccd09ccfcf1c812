//! The scoring and fusion engine: turns a pipeline query into ranked, hydrated
//! hits over the post archive.
//!
//! Grounded on the reference `SearchEngine.search_similar`/`vector_search`/
//! `search_posts_by_text`/`get_user_stats`/`get_database_stats`, generalised
//! from a single content store to the three-store (content/reasoning/summary)
//! fused model: fusion modes only ever range over the common set, the post-id
//! intersection of all three stores, computed once at construction time.

use crate::query_parser::{is_text_match, parse_pipeline_query, parse_search_terms};
use crate::settings::SearchSettings;
use crate::suggest;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use twilog_common::{AppError, Embedder, Post, PostRepository, Result, ScoringMode, SummaryRepository, TextSource, VectorStore};

/// A post hydrated for output: the fields `search_similar` and
/// `search_posts_by_text` return to callers.
#[derive(Debug, Clone, Serialize)]
pub struct HydratedPost {
    pub post_id: i64,
    pub content: String,
    pub timestamp: String,
    pub url: String,
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One ranked result from `search_similar`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub score: f32,
    pub post: HydratedPost,
}

/// A plain post match from `search_posts_by_text`, no rank or score attached.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub post_id: i64,
    pub content: String,
    pub timestamp: String,
    pub url: String,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStat {
    pub user: String,
    pub post_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_posts: usize,
    pub total_users: usize,
    pub date_range: DateRange,
}

/// A scored candidate before the post-filter pipeline runs.
struct Candidate {
    post_id: i64,
    content: String,
    timestamp: String,
    url: String,
    author: Option<String>,
    score: f32,
}

pub struct SearchEngine {
    content_store: Arc<VectorStore>,
    reasoning_store: Option<Arc<VectorStore>>,
    summary_store: Option<Arc<VectorStore>>,
    posts: PostRepository,
    summaries: SummaryRepository,
    embedder: Arc<dyn Embedder>,
    /// Post-id intersection of all three stores, sorted ascending. Empty
    /// when reasoning or summary is absent, in which case fusion modes are
    /// unavailable entirely.
    common_set: Arc<Vec<i64>>,
}

impl SearchEngine {
    pub fn new(
        content_store: VectorStore,
        reasoning_store: Option<VectorStore>,
        summary_store: Option<VectorStore>,
        posts: PostRepository,
        summaries: SummaryRepository,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let common_set = match (&reasoning_store, &summary_store) {
            (Some(reasoning), Some(summary)) => {
                let reasoning_ids: HashSet<i64> = reasoning.post_ids().iter().copied().collect();
                let summary_ids: HashSet<i64> = summary.post_ids().iter().copied().collect();
                let mut common: Vec<i64> = content_store
                    .post_ids()
                    .iter()
                    .copied()
                    .filter(|id| reasoning_ids.contains(id) && summary_ids.contains(id))
                    .collect();
                common.sort_unstable();
                common
            }
            _ => Vec::new(),
        };

        Self {
            content_store: Arc::new(content_store),
            reasoning_store: reasoning_store.map(Arc::new),
            summary_store: summary_store.map(Arc::new),
            posts,
            summaries,
            embedder,
            common_set: Arc::new(common_set),
        }
    }

    pub fn common_set_size(&self) -> usize {
        self.common_set.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Embed raw text without scoring anything, for the `embed_text` RPC.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text).await
    }

    /// Score `vector_query` under `mode`, returning `(post_id, similarity)`
    /// pairs sorted descending. Fusion modes range only over the common set.
    pub async fn score(&self, vector_query: &str, mode: ScoringMode, weights: Option<Vec<f32>>) -> Result<Vec<(i64, f32)>> {
        match mode {
            ScoringMode::Content => {
                let q = self.embedder.embed(vector_query).await?;
                scan_blocking(Arc::clone(&self.content_store), q).await
            }
            ScoringMode::Reasoning => {
                let store = Arc::clone(self.reasoning_store.as_ref().ok_or_else(|| unavailable(mode))?);
                let q = self.embedder.embed(vector_query).await?;
                scan_blocking(store, q).await
            }
            ScoringMode::Summary => {
                let store = Arc::clone(self.summary_store.as_ref().ok_or_else(|| unavailable(mode))?);
                let q = self.embedder.embed(vector_query).await?;
                scan_blocking(store, q).await
            }
            ScoringMode::Average | ScoringMode::Maximum | ScoringMode::Minimum => {
                let (reasoning, summary) = match (&self.reasoning_store, &self.summary_store) {
                    (Some(r), Some(s)) => (Arc::clone(r), Arc::clone(s)),
                    _ => return Err(unavailable(mode)),
                };
                if self.common_set.is_empty() {
                    return Ok(Vec::new());
                }

                let normalized_weights = if mode == ScoringMode::Average {
                    let w = weights.unwrap_or_else(|| vec![1.0, 1.0, 1.0]);
                    if w.len() != 3 {
                        return Err(AppError::ValueOutOfRange {
                            message: format!("average weights must have exactly 3 values, got {}", w.len()),
                        });
                    }
                    let sum: f32 = w.iter().sum();
                    if sum == 0.0 {
                        [1.0 / 3.0; 3]
                    } else {
                        [w[0] / sum, w[1] / sum, w[2] / sum]
                    }
                } else {
                    [0.0; 3]
                };

                let q = self.embedder.embed(vector_query).await?;
                let content = Arc::clone(&self.content_store);
                let common_set = Arc::clone(&self.common_set);
                tokio::task::spawn_blocking(move || {
                    let mut results = Vec::with_capacity(common_set.len());
                    for &id in common_set.iter() {
                        let cv = content.get(id).expect("common set id missing from content store");
                        let rv = reasoning.get(id).expect("common set id missing from reasoning store");
                        let sv = summary.get(id).expect("common set id missing from summary store");
                        let sc = cosine(cv, &q);
                        let sr = cosine(rv, &q);
                        let ss = cosine(sv, &q);
                        let score = match mode {
                            ScoringMode::Average => normalized_weights[0] * sc + normalized_weights[1] * sr + normalized_weights[2] * ss,
                            ScoringMode::Maximum => sc.max(sr).max(ss),
                            ScoringMode::Minimum => sc.min(sr).min(ss),
                            _ => unreachable!(),
                        };
                        results.push((id, score));
                    }
                    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                    results
                })
                .await
                .map_err(|e| AppError::Other(anyhow::anyhow!(e)))
            }
        }
    }

    /// The `vector_search` RPC: raw scoring, optionally truncated to
    /// `top_k` (unbounded when absent, since this method is the raw/streaming
    /// scan endpoint and has no [1,100] cap), with the pipeline's text part
    /// (if any) applied as a content substring filter. No author/date/dedup
    /// post-filtering.
    pub async fn vector_search(&self, query: &str, top_k: Option<usize>, mode: ScoringMode, weights: Option<Vec<f32>>) -> Result<Vec<(i64, f32)>> {
        let (vector_query, text_filter) = parse_pipeline_query(query);
        if vector_query.is_empty() {
            return Err(AppError::InvalidQuery {
                message: "vector_search requires a non-empty vector query".to_string(),
            });
        }

        let mut scored = self.score(&vector_query, mode, weights).await?;
        if !text_filter.is_empty() {
            let (include, exclude) = parse_search_terms(&text_filter);
            scored.retain(|(post_id, _)| {
                self.posts
                    .get_post(*post_id)
                    .map(|post| is_text_match(&post.content, &include, &exclude))
                    .unwrap_or(false)
            });
        }
        if let Some(top_k) = top_k {
            scored.truncate(top_k);
        }
        Ok(scored)
    }

    /// The `search_similar` RPC: pipeline-parse, score, then run the
    /// post-filter pipeline (text, author, date, dedup, rank, hydration).
    pub async fn search_similar(
        &self,
        query: &str,
        settings: &SearchSettings,
        mode: ScoringMode,
        weights: Option<Vec<f32>>,
    ) -> Result<Vec<SearchHit>> {
        let (vector_query, text_filter) = parse_pipeline_query(query);

        let candidates = if vector_query.is_empty() {
            if text_filter.is_empty() {
                return Err(AppError::InvalidQuery {
                    message: "query has neither a vector part nor a text part".to_string(),
                });
            }
            if mode.is_fusion() {
                return Err(AppError::HybridNotSupportedForTextOnly);
            }
            self.substring_hits(&text_filter, mode_to_text_source(mode))
        } else {
            self.vector_hits(&vector_query, mode, weights).await?
        };

        Ok(self.apply_post_filter(candidates, &text_filter, settings))
    }

    async fn vector_hits(&self, vector_query: &str, mode: ScoringMode, weights: Option<Vec<f32>>) -> Result<Vec<Candidate>> {
        let scored = self.score(vector_query, mode, weights).await?;
        Ok(scored.into_iter().filter_map(|(post_id, score)| self.candidate_for(post_id, score)).collect())
    }

    fn candidate_for(&self, post_id: i64, score: f32) -> Option<Candidate> {
        let post = self.posts.get_post(post_id)?;
        Some(Candidate {
            post_id,
            content: post.content.clone(),
            timestamp: post.timestamp.clone(),
            url: post.url.clone(),
            author: self.posts.author_of(post_id).map(str::to_string),
            score,
        })
    }

    fn substring_hits(&self, term: &str, source: TextSource) -> Vec<Candidate> {
        self.search_posts_by_text(term, 10_000, source)
            .into_iter()
            .map(|hit| Candidate {
                post_id: hit.post_id,
                content: hit.content,
                timestamp: hit.timestamp,
                url: hit.url,
                author: hit.user,
                score: 1.0,
            })
            .collect()
    }

    /// The post-filter pipeline: text predicate, author filter, date filter,
    /// duplicate collapse, rank assignment, hydration. Lazily stops once
    /// `top_k` survivors are collected.
    fn apply_post_filter(&self, candidates: Vec<Candidate>, text_filter: &str, settings: &SearchSettings) -> Vec<SearchHit> {
        let (include, exclude) = if text_filter.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            parse_search_terms(text_filter)
        };

        let top_k = settings.top_k.get();
        let mut output: Vec<SearchHit> = Vec::new();
        let mut seen: HashMap<(Option<String>, String), usize> = HashMap::new();

        for cand in candidates {
            if !text_filter.is_empty() && !is_text_match(&cand.content, &include, &exclude) {
                continue;
            }
            if !settings.user_filter.is_user_allowed(cand.author.as_deref(), |a| self.posts.count_of(a)) {
                continue;
            }
            if !settings.date_filter.is_date_allowed(&cand.timestamp) {
                continue;
            }

            if output.len() >= top_k {
                break;
            }

            let key = (cand.author.clone(), cand.content.clone());
            if let Some(&idx) = seen.get(&key) {
                if cand.timestamp < output[idx].post.timestamp {
                    self.overwrite_identity(&mut output[idx], &cand);
                }
                continue;
            }

            let rank = output.len() + 1;
            seen.insert(key, output.len());
            output.push(self.hydrate(rank, &cand));
        }

        output
    }

    fn overwrite_identity(&self, hit: &mut SearchHit, cand: &Candidate) {
        hit.score = cand.score;
        hit.post.post_id = cand.post_id;
        hit.post.content = cand.content.trim_end().to_string();
        hit.post.timestamp = cand.timestamp.clone();
        hit.post.url = cand.url.clone();
        hit.post.user = cand.author.clone();
        let summary = self.summaries.get(cand.post_id);
        hit.post.reasoning = summary.map(|s| s.reasoning.clone());
        hit.post.summary = summary.map(|s| s.summary.clone());
        hit.post.tags = summary.map(|s| s.tags.clone());
    }

    fn hydrate(&self, rank: usize, cand: &Candidate) -> SearchHit {
        let summary = self.summaries.get(cand.post_id);
        SearchHit {
            rank,
            score: cand.score,
            post: HydratedPost {
                post_id: cand.post_id,
                content: cand.content.trim_end().to_string(),
                timestamp: cand.timestamp.clone(),
                url: cand.url.clone(),
                user: cand.author.clone(),
                reasoning: summary.map(|s| s.reasoning.clone()),
                summary: summary.map(|s| s.summary.clone()),
                tags: summary.map(|s| s.tags.clone()),
            },
        }
    }

    /// `search_posts_by_text`: shell-parse `term`, match against the field
    /// `source` implies, sort survivors by timestamp descending, cap at `limit`.
    pub fn search_posts_by_text(&self, term: &str, limit: usize, source: TextSource) -> Vec<PostSummary> {
        let (include, exclude) = parse_search_terms(term);

        let mut hits: Vec<PostSummary> = self
            .posts
            .posts()
            .filter_map(|post| {
                let text = self.text_for_source(post, source);
                if is_text_match(&text, &include, &exclude) {
                    Some(PostSummary {
                        post_id: post.post_id,
                        content: post.content.clone(),
                        timestamp: post.timestamp.clone(),
                        url: post.url.clone(),
                        user: self.posts.author_of(post.post_id).map(str::to_string),
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        hits.truncate(limit);
        hits
    }

    fn text_for_source(&self, post: &Post, source: TextSource) -> String {
        match source {
            TextSource::Content => post.content.clone(),
            TextSource::Reasoning => self.summaries.get(post.post_id).map(|s| s.reasoning.clone()).unwrap_or_default(),
            TextSource::Summary => self.summaries.get(post.post_id).map(|s| s.summary.clone()).unwrap_or_default(),
        }
    }

    pub fn get_user_stats(&self, limit: usize) -> Vec<UserStat> {
        let mut stats: Vec<UserStat> = self
            .posts
            .authors()
            .iter()
            .map(|author| UserStat {
                user: author.clone(),
                post_count: self.posts.count_of(author),
            })
            .collect();
        stats.sort_by(|a, b| b.post_count.cmp(&a.post_count));
        stats.truncate(limit);
        stats
    }

    pub fn get_database_stats(&self) -> DatabaseStats {
        let mut earliest: Option<String> = None;
        let mut latest: Option<String> = None;
        for post in self.posts.posts() {
            if post.timestamp.is_empty() {
                continue;
            }
            if earliest.as_deref().map_or(true, |e| post.timestamp.as_str() < e) {
                earliest = Some(post.timestamp.clone());
            }
            if latest.as_deref().map_or(true, |l| post.timestamp.as_str() > l) {
                latest = Some(post.timestamp.clone());
            }
        }

        DatabaseStats {
            total_posts: self.posts.len(),
            total_users: self.posts.authors().len(),
            date_range: DateRange { earliest, latest },
        }
    }

    pub fn get_user_list(&self) -> Vec<String> {
        self.posts.authors().to_vec()
    }

    pub fn suggest_users(&self, names: &[String]) -> HashMap<String, Vec<String>> {
        suggest::suggest_users(names, self.posts.authors())
    }
}

/// Runs a single-store cosine scan on the blocking thread pool; the scan is
/// O(store size) and must not stall the async worker it would otherwise run on.
async fn scan_blocking(store: Arc<VectorStore>, query: Vec<f32>) -> Result<Vec<(i64, f32)>> {
    tokio::task::spawn_blocking(move || store.scan(&query))
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!(e)))
}

fn unavailable(mode: ScoringMode) -> AppError {
    AppError::ModeUnavailable { mode: mode.as_str().to_string() }
}

fn mode_to_text_source(mode: ScoringMode) -> TextSource {
    match mode {
        ScoringMode::Reasoning => TextSource::Reasoning,
        ScoringMode::Summary => TextSource::Summary,
        _ => TextSource::Content,
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
    use safetensors::Dtype;
    use std::collections::HashMap as StdHashMap;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use twilog_common::embeddings::MockEmbedder;

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

    fn make_store(dir: &Path, dim: usize, rows: &[(i64, Vec<f32>)]) -> VectorStore {
        fs::create_dir_all(dir).unwrap();
        let meta = serde_json::json!({
            "chunks": 1,
            "model": "test-model",
            "embedding_dim": dim,
            "chunk_size": rows.len(),
            "csv_path": "../twilog.csv",
        });
        fs::write(dir.join("meta.json"), meta.to_string()).unwrap();
        let ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
        let vecs: Vec<Vec<f32>> = rows.iter().map(|(_, v)| v.clone()).collect();
        write_chunk(dir, 0, &ids, &vecs);
        VectorStore::load(dir).unwrap()
    }

    fn write_csv(dir: &Path, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.join("posts.csv");
        let mut f = fs::File::create(&path).unwrap();
        for row in rows {
            writeln!(f, "{row}").unwrap();
        }
        path
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("twilog-engine-test-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn build_engine(dir: &Path, rows: &[(i64, Vec<f32>)], csv_rows: &[&str], with_fusion: bool) -> SearchEngine {
        let content = make_store(&dir.join("content"), 3, rows);
        let (reasoning, summary) = if with_fusion {
            (Some(make_store(&dir.join("reasoning"), 3, rows)), Some(make_store(&dir.join("summary"), 3, rows)))
        } else {
            (None, None)
        };
        let csv_path = write_csv(dir, csv_rows);
        let posts = PostRepository::load(&csv_path).unwrap();
        let summaries = SummaryRepository::empty();
        let embedder = Arc::new(MockEmbedder::new(3));
        SearchEngine::new(content, reasoning, summary, posts, summaries, embedder)
    }

    #[tokio::test]
    async fn content_mode_scores_all_rows() {
        let dir = scratch_dir("content");
        let rows = vec![(1, vec![1.0, 0.0, 0.0]), (2, vec![0.0, 1.0, 0.0])];
        let csv = [
            r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#,
            r#"2,https://x.com/bob/status/2,2024-01-02 00:00:00,second,1"#,
        ];
        let engine = build_engine(&dir, &rows, &csv, false);

        let scored = engine.score("hello", ScoringMode::Content, None).await.unwrap();
        assert_eq!(scored.len(), 2);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn fusion_mode_unavailable_without_all_three_stores() {
        let dir = scratch_dir("fusion-missing");
        let rows = vec![(1, vec![1.0, 0.0, 0.0])];
        let csv = [r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#];
        let engine = build_engine(&dir, &rows, &csv, false);

        let err = engine.score("hello", ScoringMode::Average, None).await.unwrap_err();
        assert_eq!(err.code(), twilog_common::errors::ErrorCode::ModeUnavailable);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn average_mode_rejects_wrong_weight_count() {
        let dir = scratch_dir("fusion-weights");
        let rows = vec![(1, vec![1.0, 0.0, 0.0]), (2, vec![0.0, 1.0, 0.0])];
        let csv = [
            r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#,
            r#"2,https://x.com/bob/status/2,2024-01-02 00:00:00,second,1"#,
        ];
        let engine = build_engine(&dir, &rows, &csv, true);

        let err = engine.score("hello", ScoringMode::Average, Some(vec![1.0, 2.0])).await.unwrap_err();
        assert_eq!(err.code(), twilog_common::errors::ErrorCode::ValueOutOfRange);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn text_only_query_rejects_fusion_mode() {
        let dir = scratch_dir("hybrid-reject");
        let rows = vec![(1, vec![1.0, 0.0, 0.0])];
        let csv = [r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#];
        let engine = build_engine(&dir, &rows, &csv, true);
        let settings = SearchSettings::default();

        let err = engine
            .search_similar("| first", &settings, ScoringMode::Average, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), twilog_common::errors::ErrorCode::HybridNotSupportedForTextOnly);
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn duplicate_collapse_keeps_earlier_identity_without_moving_rank() {
        let dir = scratch_dir("dedup");
        let rows = vec![
            (100, vec![1.0, 0.0, 0.0]),
            (200, vec![0.9, 0.1, 0.0]),
            (300, vec![0.0, 0.0, 1.0]),
        ];
        let csv = [
            r#"200,https://x.com/alice/status/200,2024-02-01 00:00:00,same text,1"#,
            r#"100,https://x.com/alice/status/100,2024-01-01 00:00:00,same text,1"#,
            r#"300,https://x.com/carol/status/300,2024-03-01 00:00:00,different,1"#,
        ];
        let engine = build_engine(&dir, &rows, &csv, false);
        let settings = SearchSettings::default();

        let hits = engine.search_similar("hello", &settings, ScoringMode::Content, None).await.unwrap();
        let winner = hits.iter().find(|h| h.post.content == "same text").unwrap();
        assert_eq!(winner.post.post_id, 100);
        assert_eq!(winner.post.timestamp, "2024-01-01 00:00:00");
        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn search_posts_by_text_sorts_by_timestamp_descending() {
        let dir = scratch_dir("text-sort");
        let rows = vec![(1, vec![1.0, 0.0, 0.0])];
        let csv = [
            r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,rust is nice,1"#,
            r#"2,https://x.com/bob/status/2,2024-03-01 00:00:00,rust rocks,1"#,
        ];
        let engine = build_engine(&dir, &rows, &csv, false);

        let hits = engine.search_posts_by_text("rust", 10, TextSource::Content);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].post_id, 2);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn database_stats_report_post_count_and_date_range() {
        let dir = scratch_dir("stats");
        let rows = vec![(1, vec![1.0, 0.0, 0.0]), (2, vec![0.0, 1.0, 0.0])];
        let csv = [
            r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#,
            r#"2,https://x.com/bob/status/2,2024-03-01 00:00:00,second,1"#,
        ];
        let engine = build_engine(&dir, &rows, &csv, false);

        let stats = engine.get_database_stats();
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.date_range.earliest.as_deref(), Some("2024-01-01 00:00:00"));
        assert_eq!(stats.date_range.latest.as_deref(), Some("2024-03-01 00:00:00"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn suggest_users_reaches_through_to_repository_authors() {
        let dir = scratch_dir("suggest");
        let rows = vec![(1, vec![1.0, 0.0, 0.0])];
        let csv = [r#"1,https://x.com/alice/status/1,2024-01-01 00:00:00,first,1"#];
        let engine = build_engine(&dir, &rows, &csv, false);

        let suggestions = engine.suggest_users(&["alise".to_string()]);
        assert_eq!(suggestions.get("alise").unwrap()[0], "alice");
        fs::remove_dir_all(&dir).ok();
    }
}
