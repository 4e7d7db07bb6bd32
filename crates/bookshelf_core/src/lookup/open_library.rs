//! Open Library books API client.
//!
//! # Responsibility
//! - Query `/api/books` for one ISBN with a blocking `ureq` agent.
//! - Map the provider's `jscmd=data` payload onto [`MetadataRecord`].
//!
//! # Invariants
//! - An empty JSON object means "no data", not an error.
//! - Non-success statuses and transport failures are `Transient`.

use crate::lookup::metadata::{FetchError, FetchResult, Metadata, MetadataFetcher, MetadataRecord};
use crate::model::isbn::Isbn;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";
pub const DEFAULT_USER_AGENT: &str = concat!("bookshelf/", env!("CARGO_PKG_VERSION"));

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").expect("valid year regex"));

/// Top-level payload: `"ISBN:<isbn>" -> book`.
pub type BooksResponse = BTreeMap<String, OpenLibraryBook>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenLibraryBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<NamedEntry>,
    #[serde(default)]
    pub publishers: Vec<NamedEntry>,
    #[serde(default)]
    pub publish_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedEntry {
    #[serde(default)]
    pub name: String,
}

/// HTTP fetcher backed by Open Library.
pub struct OpenLibraryFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl OpenLibraryFetcher {
    /// Builds a fetcher; `timeout` of `None` keeps the transport default.
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn books_url(&self, isbn: &Isbn) -> String {
        format!(
            "{}/api/books?bibkeys=ISBN:{}&format=json&jscmd=data",
            self.base_url, isbn
        )
    }
}

impl Default for OpenLibraryFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_USER_AGENT, None)
    }
}

impl MetadataFetcher for OpenLibraryFetcher {
    fn fetch(&self, isbn: &Isbn) -> FetchResult<Metadata> {
        let started_at = Instant::now();
        let url = self.books_url(isbn);
        debug!("event=metadata_fetch module=lookup status=start isbn={isbn}");

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => {
                warn!("event=metadata_fetch module=lookup status=error isbn={isbn} http_status={code}");
                return Err(FetchError::Transient(format!("HTTP error {code}")));
            }
            Err(ureq::Error::Transport(transport)) => {
                warn!("event=metadata_fetch module=lookup status=error isbn={isbn} error=transport");
                return Err(FetchError::Transient(format!(
                    "transport error fetching {url}: {transport}"
                )));
            }
        };

        let payload: BooksResponse = response.into_json().map_err(|err| {
            FetchError::InvalidResponse(format!("failed to decode books payload: {err}"))
        })?;

        let record = parse_books_response(isbn, payload);
        let duration_ms = started_at.elapsed().as_millis();
        match record {
            Some(record) => {
                info!(
                    "event=metadata_fetch module=lookup status=ok isbn={isbn} duration_ms={duration_ms}"
                );
                Metadata::from_record(record)
            }
            None => {
                info!(
                    "event=metadata_fetch module=lookup status=not_found isbn={isbn} duration_ms={duration_ms}"
                );
                Err(FetchError::NotFound(isbn.clone()))
            }
        }
    }
}

/// Picks the entry for `isbn` out of a books payload.
///
/// Returns `None` when the provider has no entry for it.
pub fn parse_books_response(isbn: &Isbn, mut payload: BooksResponse) -> Option<MetadataRecord> {
    payload.remove(&format!("ISBN:{isbn}")).map(map_book)
}

fn map_book(book: OpenLibraryBook) -> MetadataRecord {
    let title = match book.subtitle.as_deref().map(str::trim) {
        Some(subtitle) if !subtitle.is_empty() => format!("{}: {}", book.title.trim(), subtitle),
        _ => book.title.trim().to_string(),
    };
    MetadataRecord {
        title,
        authors: book.authors.into_iter().map(|author| author.name).collect(),
        publisher: book
            .publishers
            .into_iter()
            .map(|publisher| publisher.name)
            .next()
            .unwrap_or_default(),
        year: book
            .publish_date
            .as_deref()
            .and_then(extract_year)
            .unwrap_or_default(),
    }
}

fn extract_year(publish_date: &str) -> Option<String> {
    YEAR_RE
        .captures(publish_date)
        .and_then(|captures| captures.get(1))
        .map(|year| year.as_str().to_string())
}
