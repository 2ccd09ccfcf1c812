//! Method dispatch table: the 11 JSON-RPC methods the daemon exposes.
//!
//! Grounded on the reference `TwilogServer`'s method surface
//! (`twilog_server.py`) for the business methods and `embed_server.py`'s
//! `get_status`/`check_init`/`stop_server`/`embed_text` shape for the
//! lifecycle ones.

use base64::Engine;
use safetensors::tensor::TensorView;
use safetensors::Dtype;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use twilog_common::metrics::RpcMetrics;
use twilog_common::{AppError, Result, ScoringMode, TextSource};
use twilog_search::engine::SearchEngine;
use twilog_search::settings::{DateFilter, SearchSettings, TopKSetting, UserFilter};

const VECTOR_SEARCH_CHUNK_SIZE: usize = 20_000;
const DEFAULT_LIMIT: usize = 50;
const LIMIT_MIN: usize = 1;
const LIMIT_MAX: usize = 1000;

/// What a dispatched call produces: one reply, a sequence of streamed
/// chunks sharing one request id, or a normal reply that also asks the
/// connection loop to close after sending it.
pub enum DispatchOutcome {
    Single(Value),
    Stream(Vec<Value>),
    Stop(Value),
}

pub struct Dispatcher {
    engine: Arc<SearchEngine>,
    model_name: String,
    ready: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(engine: Arc<SearchEngine>, model_name: String, ready: Arc<AtomicBool>) -> Self {
        Self { engine, model_name, ready }
    }

    pub async fn dispatch(&self, method: &str, params: Value) -> Result<DispatchOutcome> {
        if !matches!(method, "get_status" | "check_init") && !self.ready.load(Ordering::Acquire) {
            return Err(AppError::NotReady);
        }

        let timer = RpcMetrics::start(method);
        let result = self.dispatch_inner(method, params).await;
        timer.finish(result.is_ok());
        result
    }

    async fn dispatch_inner(&self, method: &str, params: Value) -> Result<DispatchOutcome> {
        match method {
            "get_status" => Ok(self.get_status()),
            "check_init" => Ok(self.check_init()),
            "stop_server" => Ok(DispatchOutcome::Stop(serde_json::json!({"status": "stopping"}))),
            "embed_text" => self.embed_text(params).await,
            "vector_search" => self.vector_search(params).await,
            "search_similar" => self.search_similar(params).await,
            "search_posts_by_text" => self.search_posts_by_text(params),
            "get_user_stats" => self.get_user_stats(params),
            "get_database_stats" => Ok(DispatchOutcome::Single(
                serde_json::to_value(self.engine.get_database_stats()).map_err(AppError::Serialization)?,
            )),
            "get_user_list" => Ok(DispatchOutcome::Single(serde_json::json!(self.engine.get_user_list()))),
            "suggest_users" => self.suggest_users(params),
            other => Err(AppError::MethodNotFound { method: other.to_string() }),
        }
    }

    fn get_status(&self) -> DispatchOutcome {
        let ready = self.ready.load(Ordering::Acquire);
        let mut result = serde_json::json!({
            "status": "running",
            "ready": ready,
            "server_type": "twilog-server",
            "model": self.model_name,
        });
        if ready {
            if let Ok(stats) = serde_json::to_value(self.engine.get_database_stats()) {
                result["data_stats"] = stats;
            }
        }
        DispatchOutcome::Single(result)
    }

    fn check_init(&self) -> DispatchOutcome {
        let status = if self.ready.load(Ordering::Acquire) {
            "init_completed"
        } else {
            "init_in_progress"
        };
        DispatchOutcome::Single(serde_json::json!({"status": status}))
    }

    async fn embed_text(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize)]
        struct Params {
            text: String,
        }
        let p: Params = parse_params(params)?;
        if p.text.is_empty() {
            return Err(AppError::InvalidParams {
                message: "text is required".to_string(),
            });
        }

        let vector = self.engine.embed(&p.text).await?;
        let bytes: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, vec![vector.len()], &bytes).map_err(|e| AppError::Other(anyhow::anyhow!(e)))?;

        let mut tensors = HashMap::new();
        tensors.insert("vector".to_string(), view);
        let data = safetensors::serialize(&tensors, &None).map_err(|e| AppError::Other(anyhow::anyhow!(e)))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);

        Ok(DispatchOutcome::Single(serde_json::json!({"vector": encoded})))
    }

    async fn vector_search(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize)]
        struct Params {
            query: String,
            #[serde(default)]
            top_k: Option<usize>,
            #[serde(default)]
            mode: Option<String>,
            #[serde(default)]
            weights: Option<Vec<f32>>,
        }
        let p: Params = parse_params(params)?;
        let mode = parse_mode(p.mode.as_deref())?;

        let started = std::time::Instant::now();
        let scored = self.engine.vector_search(&p.query, p.top_k, mode, p.weights).await?;
        twilog_common::metrics::record_search(started.elapsed().as_secs_f64(), mode.as_str(), scored.len());
        let total_chunks = scored.len().div_ceil(VECTOR_SEARCH_CHUNK_SIZE).max(1);

        let mut chunks: Vec<Value> = scored
            .chunks(VECTOR_SEARCH_CHUNK_SIZE)
            .enumerate()
            .map(|(chunk_idx, rows)| {
                let data: Vec<Value> = rows.iter().map(|(id, score)| serde_json::json!([id, score])).collect();
                serde_json::json!({
                    "data": data,
                    "chunk": chunk_idx + 1,
                    "total_chunks": total_chunks,
                    "start_rank": chunk_idx * VECTOR_SEARCH_CHUNK_SIZE + 1,
                })
            })
            .collect();

        if chunks.is_empty() {
            chunks.push(serde_json::json!({"data": [], "chunk": 1, "total_chunks": 1, "start_rank": 1}));
        }

        Ok(DispatchOutcome::Stream(chunks))
    }

    async fn search_similar(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize, Default)]
        struct SettingsParams {
            #[serde(default)]
            user_filter: UserFilter,
            #[serde(default)]
            date_filter: DateFilter,
            #[serde(default = "default_top_k")]
            top_k: usize,
        }
        #[derive(Deserialize)]
        struct Params {
            query: String,
            #[serde(default)]
            settings: SettingsParams,
            #[serde(default)]
            mode: Option<String>,
            #[serde(default)]
            weights: Option<Vec<f32>>,
        }
        let p: Params = parse_params(params)?;
        let mode = parse_mode(p.mode.as_deref())?;
        let top_k = validate_top_k(p.settings.top_k)?;
        let settings = SearchSettings {
            user_filter: p.settings.user_filter,
            date_filter: p.settings.date_filter,
            top_k: TopKSetting::new(top_k),
        };

        let started = std::time::Instant::now();
        let hits = self.engine.search_similar(&p.query, &settings, mode, p.weights).await?;
        twilog_common::metrics::record_search(started.elapsed().as_secs_f64(), mode.as_str(), hits.len());
        Ok(DispatchOutcome::Single(serde_json::to_value(hits).map_err(AppError::Serialization)?))
    }

    fn search_posts_by_text(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize)]
        struct Params {
            search_term: String,
            #[serde(default = "default_limit")]
            limit: usize,
            #[serde(default)]
            source: Option<String>,
        }
        let p: Params = parse_params(params)?;
        let source = parse_source(p.source.as_deref())?;
        let limit = validate_limit(p.limit)?;

        let hits = self.engine.search_posts_by_text(&p.search_term, limit, source);
        Ok(DispatchOutcome::Single(serde_json::to_value(hits).map_err(AppError::Serialization)?))
    }

    fn get_user_stats(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize, Default)]
        struct Params {
            #[serde(default = "default_limit")]
            limit: usize,
        }
        let p: Params = if params.is_null() {
            Params::default()
        } else {
            parse_params(params)?
        };
        let limit = validate_limit(p.limit)?;

        let stats = self.engine.get_user_stats(limit);
        Ok(DispatchOutcome::Single(serde_json::to_value(stats).map_err(AppError::Serialization)?))
    }

    fn suggest_users(&self, params: Value) -> Result<DispatchOutcome> {
        #[derive(Deserialize)]
        struct Params {
            user_list: Vec<String>,
        }
        let p: Params = parse_params(params)?;
        let missing = self.engine.suggest_users(&p.user_list);
        Ok(DispatchOutcome::Single(serde_json::json!({"missing": missing})))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| AppError::InvalidParams { message: e.to_string() })
}

fn default_top_k() -> usize {
    10
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn parse_mode(mode: Option<&str>) -> Result<ScoringMode> {
    match mode {
        None => Ok(ScoringMode::default()),
        Some(s) => ScoringMode::parse(s).ok_or_else(|| AppError::InvalidParams {
            message: format!("unknown mode: {s}"),
        }),
    }
}

fn parse_source(source: Option<&str>) -> Result<TextSource> {
    match source {
        None => Ok(TextSource::default()),
        Some(s) => TextSource::parse(s).ok_or_else(|| AppError::InvalidParams {
            message: format!("unknown source: {s}"),
        }),
    }
}

fn validate_top_k(value: usize) -> Result<usize> {
    if (TopKSetting::MIN..=TopKSetting::MAX).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::ValueOutOfRange {
            message: format!("top_k must be between {} and {}, got {value}", TopKSetting::MIN, TopKSetting::MAX),
        })
    }
}

fn validate_limit(value: usize) -> Result<usize> {
    if (LIMIT_MIN..=LIMIT_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(AppError::ValueOutOfRange {
            message: format!("limit must be between {LIMIT_MIN} and {LIMIT_MAX}, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_out_of_range_is_rejected() {
        assert!(validate_top_k(0).is_err());
        assert!(validate_top_k(101).is_err());
        assert!(validate_top_k(50).is_ok());
    }

    #[test]
    fn limit_out_of_range_is_rejected() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(1001).is_err());
        assert!(validate_limit(500).is_ok());
    }

    #[test]
    fn unknown_mode_is_invalid_params() {
        let err = parse_mode(Some("bogus")).unwrap_err();
        assert_eq!(err.code(), twilog_common::errors::ErrorCode::ProtocolInvalidParams);
    }
}
