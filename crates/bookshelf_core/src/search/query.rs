//! Queries over the maintained catalogs.
//!
//! # Responsibility
//! - Free-text search over the `system` catalog (SQLite FTS5), as used by
//!   the contents filter box.
//! - Query-by-field over the `books` catalog.
//!
//! # Invariants
//! - Blank queries and `limit == 0` return no hits without touching SQL.
//! - Result ordering is deterministic.

use crate::db::DbError;
use crate::model::resource::{ContentKind, ResourceRef};
use crate::search::catalog::{catalog_spec, IndexKind, IndexValue, BOOKS_CATALOG};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Raw FTS5 syntax the engine could not parse.
    InvalidQuery {
        query: String,
        message: String,
    },
    /// Field is not an index of the `books` catalog.
    UnknownIndex(String),
    /// List values cannot be used as query values.
    UnsupportedValue(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::UnknownIndex(field) => write!(f, "no index named `{field}`"),
            Self::UnsupportedValue(field) => {
                write!(f, "index `{field}` must be queried with a single value")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid index row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Free-text search options.
#[derive(Debug, Clone)]
pub struct TextQuery {
    pub text: String,
    /// Restrict hits to books inside this folder.
    pub within: Option<String>,
    pub kind: Option<ContentKind>,
    pub limit: u32,
    /// Pass `text` through as a raw FTS5 expression.
    ///
    /// Off by default so filter-as-you-type input cannot produce syntax errors.
    pub raw_fts_syntax: bool,
}

impl TextQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            within: None,
            kind: None,
            limit: 50,
            raw_fts_syntax: false,
        }
    }

    /// Contents-listing filter: books of one folder matching `text`.
    pub fn within_folder(folder: impl Into<String>, text: impl Into<String>) -> Self {
        let mut query = Self::new(text);
        query.within = Some(folder.into());
        query.kind = Some(ContentKind::Book);
        query
    }
}

/// One free-text hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub resource: ResourceRef,
    pub snippet: String,
}

/// Searches the free-text index and returns ranked hits.
pub fn search_text(conn: &Connection, query: &TextQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            resource_path,
            resource_kind,
            snippet(system_text, 3, '[', ']', ' ... ', 10) AS snippet
         FROM system_text
         WHERE system_text MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if let Some(folder) = &query.within {
        sql.push_str(" AND parent = ?");
        bind_values.push(Value::Text(folder.clone()));
    }
    if let Some(kind) = query.kind {
        sql.push_str(" AND resource_kind = ?");
        bind_values.push(Value::Text(kind.as_db().to_string()));
    }

    sql.push_str(" ORDER BY bm25(system_text), resource_path ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(SearchHit {
            resource: parse_resource(row)?,
            snippet: row.get("snippet")?,
        });
    }
    Ok(hits)
}

/// Query against one index of the `books` catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldQuery {
    pub field: String,
    /// `Text` or `Int`; `Int` values also match their decimal text.
    pub value: IndexValue,
    pub within: Option<String>,
}

impl FieldQuery {
    pub fn new(field: impl Into<String>, value: IndexValue) -> Self {
        Self {
            field: field.into(),
            value,
            within: None,
        }
    }

    pub fn text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, IndexValue::Text(value.into()))
    }
}

/// Resources whose `field` index matches `value`, sorted by path.
///
/// Text indexes match case-insensitive substrings; field indexes match
/// exactly. A list-valued attribute matches when any entry matches.
pub fn query_field(conn: &Connection, query: &FieldQuery) -> SearchResult<Vec<ResourceRef>> {
    let index = catalog_spec(BOOKS_CATALOG)
        .and_then(|catalog| catalog.index(&query.field))
        .ok_or_else(|| SearchError::UnknownIndex(query.field.clone()))?;

    let mut sql = String::from(
        "SELECT DISTINCT resource_path, resource_kind
         FROM catalog_entries
         WHERE catalog = ? AND field = ?",
    );
    let mut bind_values: Vec<Value> = vec![
        Value::Text(BOOKS_CATALOG.to_string()),
        Value::Text(query.field.clone()),
    ];

    match (&query.value, index.kind) {
        (IndexValue::TextList(_), _) => {
            return Err(SearchError::UnsupportedValue(query.field.clone()));
        }
        (IndexValue::Text(text), IndexKind::Text) => {
            if text.trim().is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(" AND instr(lower(value_text), lower(?)) > 0");
            bind_values.push(Value::Text(text.trim().to_string()));
        }
        (IndexValue::Text(text), IndexKind::Field) => {
            sql.push_str(" AND value_text = ?");
            bind_values.push(Value::Text(text.clone()));
        }
        (IndexValue::Int(number), _) => {
            sql.push_str(" AND (value_int = ? OR (value_int IS NULL AND value_text = ?))");
            bind_values.push(Value::Integer(*number));
            bind_values.push(Value::Text(number.to_string()));
        }
    }

    if let Some(folder) = &query.within {
        sql.push_str(" AND parent = ?");
        bind_values.push(Value::Text(folder.clone()));
    }
    sql.push_str(" ORDER BY resource_path ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut resources = Vec::new();
    while let Some(row) = rows.next()? {
        resources.push(parse_resource(row)?);
    }
    Ok(resources)
}

fn parse_resource(row: &Row<'_>) -> SearchResult<ResourceRef> {
    let path: String = row.get("resource_path")?;
    let kind_text: String = row.get("resource_kind")?;
    let kind = ContentKind::from_db(&kind_text)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid kind `{kind_text}`")))?;
    ResourceRef::from_path(kind, &path)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid resource path `{path}`")))
}

fn build_match_expression(query: &TextQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    let is_syntax_error = match &err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    };
    if is_syntax_error {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

#[cfg(test)]
mod tests {
    use super::{build_match_expression, escape_fts_term, TextQuery};

    #[test]
    fn terms_are_quoted_and_joined() {
        let query = TextQuery::new("clean  \"code\"");
        assert_eq!(
            build_match_expression(&query).as_deref(),
            Some("\"clean\" AND \"\"\"code\"\"\"")
        );
    }

    #[test]
    fn blank_text_has_no_expression() {
        assert_eq!(build_match_expression(&TextQuery::new("  ")), None);
    }

    #[test]
    fn raw_syntax_is_passed_through() {
        let mut query = TextQuery::new(" clean OR code ");
        query.raw_fts_syntax = true;
        assert_eq!(build_match_expression(&query).as_deref(), Some("clean OR code"));
        assert_eq!(escape_fts_term("a:b"), "\"a:b\"");
    }
}
