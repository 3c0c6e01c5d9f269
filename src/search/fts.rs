//! SQLite FTS5 searcher
//!
//! Free text goes to a per-namespace FTS5 table; field terms are answered
//! from the `search_fields` side table, one row per (key, field, value).

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use super::query::{parse_query, Clause, Op};
use super::{IndexMap, Searcher};
use crate::db::DbEngine;
use crate::error::{Error, Result};

pub struct FtsSearcher {
    db: DbEngine,
    ns: String,
    table: String,
    facets: HashSet<String>,
}

impl FtsSearcher {
    /// Open (creating if needed) the index namespace `ns`.
    ///
    /// Fields named in `facets` match exactly (case-insensitive); all other
    /// fields match by substring.
    pub async fn open(db: &DbEngine, ns: &str, facets: &[&str]) -> Result<Self> {
        if ns.is_empty()
            || !ns
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(Error::InvalidParameter(format!("search namespace {}", ns)));
        }

        let table = format!("search_{}", ns);
        sqlx::query(&format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5(key UNINDEXED, body, tokenize = 'unicode61 remove_diacritics 2')",
            table
        ))
        .execute(db.pool())
        .await?;

        Ok(Self {
            db: db.clone(),
            ns: ns.to_string(),
            table,
            facets: facets.iter().map(|f| f.to_lowercase()).collect(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Keys matching all free text terms, best match first
    async fn text_keys(&self, terms: &[String]) -> Result<Vec<String>> {
        let terms: Vec<String> = terms.iter().filter_map(|t| fts_term(t)).collect();
        if terms.is_empty() {
            return Ok(vec![]);
        }
        let expr = terms.join(" AND ");

        let keys: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT key FROM {table} WHERE {table} MATCH ? ORDER BY rank",
            table = self.table
        ))
        .bind(expr)
        .fetch_all(self.db.pool())
        .await?;
        Ok(keys)
    }

    async fn field_keys(&self, field: &str, op: Op, value: &str) -> Result<BTreeSet<String>> {
        let pool = self.db.pool();
        let base = "SELECT DISTINCT key FROM search_fields WHERE ns = ? AND field = ?";

        let keys: Vec<String> = match op {
            Op::Match if self.facets.contains(field) => {
                sqlx::query_scalar(&format!("{} AND value = ? COLLATE NOCASE", base))
                    .bind(&self.ns)
                    .bind(field)
                    .bind(value)
                    .fetch_all(pool)
                    .await?
            }
            Op::Match => {
                sqlx::query_scalar(&format!("{} AND instr(lower(value), lower(?)) > 0", base))
                    .bind(&self.ns)
                    .bind(field)
                    .bind(value)
                    .fetch_all(pool)
                    .await?
            }
            _ => {
                let cmp = match op {
                    Op::Lt => "<",
                    Op::Le => "<=",
                    Op::Gt => ">",
                    _ => ">=",
                };
                match value.parse::<f64>() {
                    Ok(num) => {
                        sqlx::query_scalar(&format!(
                            "{} AND num IS NOT NULL AND num {} ?",
                            base, cmp
                        ))
                        .bind(&self.ns)
                        .bind(field)
                        .bind(num)
                        .fetch_all(pool)
                        .await?
                    }
                    Err(_) => {
                        sqlx::query_scalar(&format!("{} AND value {} ?", base, cmp))
                            .bind(&self.ns)
                            .bind(field)
                            .bind(value)
                            .fetch_all(pool)
                            .await?
                    }
                }
            }
        };

        Ok(keys.into_iter().collect())
    }
}

/// Quote a term for FTS5; single words match as prefixes. Terms without
/// any word characters have nothing to match and are dropped.
fn fts_term(term: &str) -> Option<String> {
    let term = term.replace('"', "");
    if !term.chars().any(char::is_alphanumeric) {
        return None;
    }
    let quoted = format!("\"{}\"", term);
    if term.contains(char::is_whitespace) {
        Some(quoted)
    } else {
        Some(format!("{}*", quoted))
    }
}

/// Flatten a field value into (text, numeric) pairs
fn field_values(value: &serde_json::Value) -> Vec<(String, Option<f64>)> {
    match value {
        serde_json::Value::String(s) => vec![(s.clone(), s.trim().parse::<f64>().ok())],
        serde_json::Value::Number(n) => vec![(n.to_string(), n.as_f64())],
        serde_json::Value::Bool(b) => vec![(b.to_string(), None)],
        serde_json::Value::Array(items) => items.iter().flat_map(field_values).collect(),
        _ => vec![],
    }
}

#[async_trait]
impl Searcher for FtsSearcher {
    async fn index(&self, docs: IndexMap) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;
        for (key, fields) in &docs {
            sqlx::query(&format!("DELETE FROM {} WHERE key = ?", self.table))
                .bind(key)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM search_fields WHERE ns = ? AND key = ?")
                .bind(&self.ns)
                .bind(key)
                .execute(&mut *tx)
                .await?;

            let mut body = Vec::new();
            for (name, value) in fields {
                let field = name.to_lowercase();
                let textual = !value.is_number();
                for (text, num) in field_values(value) {
                    if text.is_empty() {
                        continue;
                    }
                    if textual {
                        body.push(text.clone());
                    }
                    sqlx::query(
                        "INSERT INTO search_fields (ns, key, field, value, num) VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(&self.ns)
                    .bind(key)
                    .bind(&field)
                    .bind(&text)
                    .bind(num)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            sqlx::query(&format!("INSERT INTO {} (key, body) VALUES (?, ?)", self.table))
                .bind(key)
                .bind(body.join(" "))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("indexed {} documents in {}", docs.len(), self.ns);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;
        for key in keys {
            sqlx::query(&format!("DELETE FROM {} WHERE key = ?", self.table))
                .bind(key)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM search_fields WHERE ns = ? AND key = ?")
                .bind(&self.ns)
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let clauses = parse_query(query);

        let mut text = Vec::new();
        let mut excluded_text = Vec::new();
        let mut required = Vec::new();
        let mut excluded = HashSet::new();

        for clause in &clauses {
            match clause {
                Clause::Text { term, negate: false } => text.push(term.clone()),
                Clause::Text { term, negate: true } => excluded_text.push(term.clone()),
                Clause::Field {
                    field,
                    op,
                    value,
                    negate,
                } => {
                    let keys = self.field_keys(field, *op, value).await?;
                    if *negate {
                        excluded.extend(keys);
                    } else {
                        required.push(keys);
                    }
                }
            }
        }

        for term in &excluded_text {
            excluded.extend(self.text_keys(std::slice::from_ref(term)).await?);
        }

        let candidates: Vec<String> = if !text.is_empty() {
            self.text_keys(&text).await?
        } else if let Some(first) = required.first() {
            first.iter().cloned().collect()
        } else {
            // nothing positive to match
            return Ok(vec![]);
        };

        let mut seen = HashSet::new();
        let results = candidates
            .into_iter()
            .filter(|key| required.iter().all(|set| set.contains(key)))
            .filter(|key| !excluded.contains(key))
            .filter(|key| seen.insert(key.clone()))
            .take(limit)
            .collect();

        Ok(results)
    }
}
