//! Loads `batch/results.jsonl`: one `{"key": <post_id>, "reasoning", "summary",
//! "tags"}` object per line. A missing file is not an error — the repository
//! is simply empty, since the LLM annotation pipeline may not have run yet.

use crate::domain::Summary;
use crate::errors::{AppError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ResultLine {
    key: i64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
}

pub struct SummaryRepository {
    by_id: HashMap<i64, Summary>,
    by_tag: HashMap<String, Vec<i64>>,
}

impl SummaryRepository {
    pub fn load(results_path: impl AsRef<Path>) -> Result<Self> {
        let path = results_path.as_ref();
        let mut by_id = HashMap::new();
        let mut by_tag: HashMap<String, Vec<i64>> = HashMap::new();

        let Ok(file) = File::open(path) else {
            return Ok(Self { by_id, by_tag });
        };
        let reader = BufReader::new(file);

        for line in serde_json::Deserializer::from_reader(reader).into_iter::<ResultLine>() {
            let line = line.map_err(|e| AppError::CorruptStore {
                message: format!("malformed line in {}: {e}", path.display()),
            })?;
            for tag in &line.tags {
                by_tag.entry(tag.clone()).or_default().push(line.key);
            }
            by_id.insert(
                line.key,
                Summary {
                    post_id: line.key,
                    reasoning: line.reasoning,
                    summary: line.summary,
                    tags: line.tags,
                },
            );
        }

        Ok(Self { by_id, by_tag })
    }

    pub fn empty() -> Self {
        Self {
            by_id: HashMap::new(),
            by_tag: HashMap::new(),
        }
    }

    pub fn get(&self, post_id: i64) -> Option<&Summary> {
        self.by_id.get(&post_id)
    }

    pub fn posts_with_tag(&self, tag: &str) -> &[i64] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_jsonl_and_indexes_tags() {
        let path = std::env::temp_dir().join(format!("twilog-results-test-{}.jsonl", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"key": 1, "reasoning": "r1", "summary": "s1", "tags": ["rust", "cli"]}}"#).unwrap();
        writeln!(f, r#"{{"key": 2, "reasoning": "r2", "summary": "s2", "tags": ["rust"]}}"#).unwrap();

        let repo = SummaryRepository::load(&path).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(1).unwrap().summary, "s1");
        assert_eq!(repo.posts_with_tag("rust"), &[1, 2]);
        assert_eq!(repo.posts_with_tag("cli"), &[1]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_empty_not_error() {
        let repo = SummaryRepository::load("/nonexistent/path/results.jsonl").unwrap();
        assert!(repo.is_empty());
    }
}
