//! Twilog search core: query parsing, search settings, and the scoring engine.

pub mod engine;
pub mod query_parser;
pub mod settings;
pub mod suggest;

pub use engine::SearchEngine;
pub use query_parser::{parse_pipeline_query, parse_search_terms};
pub use settings::{AuthorFilter, DateFilter, SearchSettings, TopKSetting, UserFilter};
