//! Book content type.
//!
//! # Responsibility
//! - Define the book record and its form schema.
//! - Apply the declared per-field defaults (`publisher = ""`, `year = 0`).
//!
//! # Invariants
//! - `isbn` is canonical and checksum-valid; it is the storage key inside
//!   the parent folder and changes only through an explicit rename.
//! - `title` is never blank; `author` entries are never blank.

use crate::model::form::{FormInput, ValidationError, ValidationErrors};
use crate::model::isbn::{Isbn, IsbnError};
use serde::{Deserialize, Serialize};

pub const FIELD_ISBN: &str = "isbn";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_AUTHOR: &str = "author";
pub const FIELD_PUBLISHER: &str = "publisher";
pub const FIELD_YEAR: &str = "year";

/// Declared default for an absent publisher.
pub const DEFAULT_PUBLISHER: &str = "";
/// Declared default for an absent or blank year.
pub const DEFAULT_YEAR: i64 = 0;

/// A book stored inside a book folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    /// Ordered author names.
    pub author: Vec<String>,
    pub publisher: String,
    pub year: i64,
}

/// Validated non-identity attributes of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEdit {
    pub title: String,
    pub author: Vec<String>,
    pub publisher: String,
    pub year: i64,
}

impl Book {
    /// Creates a book with default publisher and year.
    pub fn new(isbn: Isbn, title: impl Into<String>) -> Self {
        Self {
            isbn,
            title: title.into(),
            author: Vec::new(),
            publisher: DEFAULT_PUBLISHER.to_string(),
            year: DEFAULT_YEAR,
        }
    }

    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.author = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_year(mut self, year: i64) -> Self {
        self.year = year;
        self
    }

    /// Overwrites every non-identity attribute.
    pub fn apply(&mut self, edit: BookEdit) {
        self.title = edit.title;
        self.author = edit.author;
        self.publisher = edit.publisher;
        self.year = edit.year;
    }
}

/// Validates an add-book form submission.
///
/// # Errors
/// - One `ValidationError` per offending field, all reported together.
pub fn validate_book(input: &FormInput) -> Result<Book, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let isbn = match validate_isbn(input.get(FIELD_ISBN).unwrap_or_default()) {
        Ok(isbn) => Some(isbn),
        Err(error) => {
            errors.add(error);
            None
        }
    };
    let attributes = collect_attributes(input, &mut errors);

    match (isbn, attributes) {
        (Some(isbn), Some(edit)) if errors.is_empty() => {
            let mut book = Book::new(isbn, String::new());
            book.apply(edit);
            Ok(book)
        }
        _ => Err(errors),
    }
}

/// Validates an edit-book form for the book currently keyed by `current`.
///
/// The identity field is locked: it may be omitted or repeat the current
/// value; anything else must go through a rename.
pub fn validate_book_edit(input: &FormInput, current: &Isbn) -> Result<BookEdit, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let changed = input
        .get_all(FIELD_ISBN)
        .iter()
        .any(|raw| !Isbn::parse(raw).is_ok_and(|isbn| &isbn == current));
    if changed {
        errors.add(ValidationError::new(
            FIELD_ISBN,
            "cannot be changed by editing; rename the book instead",
        ));
    }

    match collect_attributes(input, &mut errors) {
        Some(edit) if errors.is_empty() => Ok(edit),
        _ => Err(errors),
    }
}

/// Checks a storage key for a book.
pub fn validate_isbn(raw: &str) -> Result<Isbn, ValidationError> {
    Isbn::parse(raw).map_err(|err| match err {
        IsbnError::Blank => ValidationError::required(FIELD_ISBN),
        other => ValidationError::new(FIELD_ISBN, other.to_string()),
    })
}

fn collect_attributes(input: &FormInput, errors: &mut ValidationErrors) -> Option<BookEdit> {
    let title = input.get(FIELD_TITLE).map(str::trim).unwrap_or_default();
    if title.is_empty() {
        errors.add(ValidationError::required(FIELD_TITLE));
    }

    let mut author = Vec::new();
    for (index, entry) in input.get_all(FIELD_AUTHOR).iter().enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            errors.add(ValidationError::new(
                FIELD_AUTHOR,
                format!("entry {} must not be blank", index + 1),
            ));
        } else {
            author.push(entry.to_string());
        }
    }

    let publisher = input
        .get(FIELD_PUBLISHER)
        .map(str::trim)
        .unwrap_or(DEFAULT_PUBLISHER)
        .to_string();

    let year = match input.get(FIELD_YEAR).map(str::trim) {
        None | Some("") => DEFAULT_YEAR,
        Some(raw) => match raw.parse::<i64>() {
            Ok(year) => year,
            Err(_) => {
                errors.add(ValidationError::new(
                    FIELD_YEAR,
                    format!("\"{raw}\" is not a number"),
                ));
                DEFAULT_YEAR
            }
        },
    };

    if title.is_empty() {
        return None;
    }
    Some(BookEdit {
        title: title.to_string(),
        author,
        publisher,
        year,
    })
}
