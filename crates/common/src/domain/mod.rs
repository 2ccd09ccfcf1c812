//! Domain types for the post archive: posts, summaries, and the scoring modes
//! the search engine dispatches over.

use serde::{Deserialize, Serialize};

/// A single archived post.
///
/// `author` is derived at load time from `url` (see `repository::post_repository`)
/// and is `None` for rows whose URL doesn't match the expected pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub url: String,
    pub timestamp: String,
    pub content: String,
    pub log_type: i32,
    pub author: Option<String>,
}

/// LLM-derived annotations for a post. Absent for posts the batch pipeline
/// hasn't covered yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub post_id: i64,
    pub reasoning: String,
    pub summary: String,
    pub tags: Vec<String>,
}

/// Which vector space (or fusion of spaces) a query scores against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    Content,
    Reasoning,
    Summary,
    Average,
    Maximum,
    Minimum,
}

impl ScoringMode {
    pub fn is_fusion(&self) -> bool {
        matches!(self, ScoringMode::Average | ScoringMode::Maximum | ScoringMode::Minimum)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringMode::Content => "content",
            ScoringMode::Reasoning => "reasoning",
            ScoringMode::Summary => "summary",
            ScoringMode::Average => "average",
            ScoringMode::Maximum => "maximum",
            ScoringMode::Minimum => "minimum",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "content" => Some(ScoringMode::Content),
            "reasoning" => Some(ScoringMode::Reasoning),
            "summary" => Some(ScoringMode::Summary),
            "average" => Some(ScoringMode::Average),
            "maximum" => Some(ScoringMode::Maximum),
            "minimum" => Some(ScoringMode::Minimum),
            _ => None,
        }
    }
}

impl Default for ScoringMode {
    fn default() -> Self {
        ScoringMode::Content
    }
}

/// Text source a substring search or secondary text predicate reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Content,
    Reasoning,
    Summary,
}

impl TextSource {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "content" => Some(TextSource::Content),
            "reasoning" => Some(TextSource::Reasoning),
            "summary" => Some(TextSource::Summary),
            _ => None,
        }
    }
}

impl Default for TextSource {
    fn default() -> Self {
        TextSource::Content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fusion_modes_are_flagged() {
        assert!(ScoringMode::Average.is_fusion());
        assert!(ScoringMode::Maximum.is_fusion());
        assert!(ScoringMode::Minimum.is_fusion());
        assert!(!ScoringMode::Content.is_fusion());
    }

    #[test]
    fn parse_round_trips_str() {
        for mode in [
            ScoringMode::Content,
            ScoringMode::Reasoning,
            ScoringMode::Summary,
            ScoringMode::Average,
            ScoringMode::Maximum,
            ScoringMode::Minimum,
        ] {
            assert_eq!(ScoringMode::parse(mode.as_str()), Some(mode));
        }
    }
}
