//! Canonical metadata record and fetcher contract.

use crate::model::book::{Book, DEFAULT_PUBLISHER, DEFAULT_YEAR};
use crate::model::isbn::Isbn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type FetchResult<T> = Result<T, FetchError>;

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Input is not a syntactically valid ISBN; no request was made.
    InvalidIsbn(String),
    /// The provider has no record for this ISBN.
    NotFound(Isbn),
    /// Transport failure or non-success HTTP status.
    Transient(String),
    /// The provider answered with a payload that cannot be mapped.
    InvalidResponse(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIsbn(raw) => write!(f, "not a valid ISBN: `{raw}`"),
            Self::NotFound(isbn) => write!(f, "no metadata for ISBN {isbn}"),
            Self::Transient(message) => write!(f, "metadata lookup failed: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "metadata provider returned an invalid payload: {message}")
            }
        }
    }
}

impl Error for FetchError {}

/// Provider-neutral record, as a metadata service reports it.
///
/// `Year` stays a string here; it may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors", default)]
    pub authors: Vec<String>,
    #[serde(rename = "Publisher", default)]
    pub publisher: String,
    #[serde(rename = "Year", default)]
    pub year: String,
}

/// Normalized metadata ready to become a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub publisher: String,
    pub year: i64,
}

impl Metadata {
    /// Applies the default policy: blank year -> 0, blank publisher -> "".
    pub fn from_record(record: MetadataRecord) -> FetchResult<Self> {
        let title = record.title.trim().to_string();
        if title.is_empty() {
            return Err(FetchError::InvalidResponse("record has no title".to_string()));
        }

        let year_text = record.year.trim();
        let year = if year_text.is_empty() {
            DEFAULT_YEAR
        } else {
            year_text.parse::<i64>().map_err(|_| {
                FetchError::InvalidResponse(format!("year `{year_text}` is not a number"))
            })?
        };

        let publisher = match record.publisher.trim() {
            "" => DEFAULT_PUBLISHER.to_string(),
            value => value.to_string(),
        };

        let authors = record
            .authors
            .into_iter()
            .map(|author| author.trim().to_string())
            .filter(|author| !author.is_empty())
            .collect();

        Ok(Self {
            title,
            authors,
            publisher,
            year,
        })
    }

    pub fn into_book(self, isbn: Isbn) -> Book {
        Book::new(isbn, self.title)
            .with_authors(self.authors)
            .with_publisher(self.publisher)
            .with_year(self.year)
    }
}

/// Metadata lookup seam; implemented over HTTP and by test doubles.
pub trait MetadataFetcher {
    /// Looks up one already-validated ISBN.
    fn fetch(&self, isbn: &Isbn) -> FetchResult<Metadata>;
}

/// Validates `raw` and looks it up.
///
/// Returns `InvalidIsbn` without calling the fetcher when `raw` fails the
/// syntactic check.
pub fn fetch_metadata(fetcher: &dyn MetadataFetcher, raw: &str) -> FetchResult<Metadata> {
    let isbn = Isbn::parse(raw).map_err(|_| FetchError::InvalidIsbn(raw.trim().to_string()))?;
    fetcher.fetch(&isbn)
}
