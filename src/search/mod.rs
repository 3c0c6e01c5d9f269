//! Full-text search index
//!
//! The entity store stays authoritative; the index only maps a primary key to
//! its searchable fields. Queries mix free text with field terms:
//! `+genre:horror`, `-artist:"The Band"`, `+popularity:<4`, `year:>=1990`.

mod fts;
mod query;

pub use fts::FtsSearcher;
pub use query::{parse_query, Clause, Op};

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;

/// Searchable fields of one entity; strings, numbers and string arrays
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Documents to upsert, by primary key
pub type IndexMap = BTreeMap<String, FieldMap>;

#[async_trait]
pub trait Searcher: Send + Sync {
    /// Upsert documents by key
    async fn index(&self, docs: IndexMap) -> Result<()>;

    /// Remove documents by key
    async fn delete(&self, keys: &[String]) -> Result<()>;

    /// Keys matching `query`, best first, at most `limit`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>>;
}

/// Build a field map from `(name, value)` pairs
#[macro_export]
macro_rules! fields {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::search::FieldMap::new();
        $(map.insert($name.to_string(), serde_json::json!($value));)*
        map
    }};
}
