//! Add-book-from-ISBN workflow.
//!
//! # Responsibility
//! - Turn one submitted ISBN into a stored, indexed book using fetched
//!   metadata.
//! - Report the outcome as exactly one status message plus a redirect to
//!   the folder's contents listing.
//!
//! # Invariants
//! - Phases run in order: validate, duplicate check, fetch, insert.
//! - Invalid and duplicate ISBNs never reach the fetcher.
//! - The insert re-checks the key, so a concurrent insert of the same ISBN
//!   still ends as a duplicate and writes nothing.
//! - The network call runs outside any database transaction.

use crate::lookup::metadata::{FetchError, MetadataFetcher};
use crate::model::book::Book;
use crate::model::isbn::Isbn;
use crate::model::resource::{ContentKind, Container, NewContent, Resource};
use crate::repo::content_repo::ContentRepository;
use crate::service::content_service::{insert_content, ContentService, WorkflowError, WorkflowResult};
use crate::service::outcome::{NavigationTarget, StatusMessage};
use log::{info, warn};
use std::time::Instant;

/// Steps of one import, recorded as they are entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportPhase {
    ValidatingIsbn,
    CheckingDuplicate,
    Fetching,
    Inserting,
    Done,
    Failed(ImportFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportFailure {
    InvalidIsbn,
    DuplicateKey,
    NoMetadata,
    /// Transport or payload problem, with the fetcher's description.
    FetchError(String),
}

impl ImportFailure {
    fn message(&self, submitted: &str) -> String {
        match self {
            Self::InvalidIsbn => format!("Not a valid ISBN: {submitted}."),
            Self::DuplicateKey => format!("ISBN already exists: {submitted}."),
            Self::NoMetadata => format!("No data exists for ISBN: {submitted}."),
            Self::FetchError(_) => format!("Could not fetch data for ISBN: {submitted}."),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidIsbn => "invalid_isbn",
            Self::DuplicateKey => "duplicate_key",
            Self::NoMetadata => "no_metadata",
            Self::FetchError(_) => "fetch_error",
        }
    }
}

/// Terminal result of a non-blank submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsbnImport {
    /// Submitted text, trimmed; echoed in the status message.
    pub submitted: String,
    pub phases: Vec<ImportPhase>,
    pub outcome: Result<Book, ImportFailure>,
    pub status: StatusMessage,
    pub redirect: NavigationTarget,
}

impl IsbnImport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// What the contents-listing action returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsbnSubmission {
    /// Blank submission: no message, no redirect.
    Empty,
    Completed(IsbnImport),
}

impl ContentService<'_> {
    /// Adds a book to `parent` from metadata fetched for `raw`.
    ///
    /// Expected outcomes (invalid, duplicate, no data, fetch failure) are
    /// reported inside [`IsbnSubmission::Completed`].
    ///
    /// # Errors
    /// - `NotAddable` when `parent` does not accept books.
    /// - `ContainerNotFound` when the folder does not exist.
    /// - Storage failures.
    pub fn create_from_isbn(
        &self,
        parent: &Container,
        raw: &str,
        fetcher: &dyn MetadataFetcher,
    ) -> WorkflowResult<IsbnSubmission> {
        let submitted = raw.trim();
        if submitted.is_empty() {
            return Ok(IsbnSubmission::Empty);
        }
        if !self.registry().can_add(parent.kind(), ContentKind::Book) {
            return Err(WorkflowError::NotAddable {
                container: parent.kind(),
                kind: ContentKind::Book,
            });
        }
        if let Container::Folder(name) = parent {
            if self.repo().get_folder(name)?.is_none() {
                return Err(WorkflowError::ContainerNotFound(parent.clone()));
            }
        }

        let started_at = Instant::now();
        let mut phases = Vec::new();
        let outcome = self.run_import(parent, submitted, fetcher, &mut phases)?;
        let status = match &outcome {
            Ok(_) => {
                phases.push(ImportPhase::Done);
                info!(
                    "event=isbn_import module=workflow status=ok container={parent} isbn={submitted} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                StatusMessage::success(format!("Added book with ISBN: {submitted}."))
            }
            Err(failure) => {
                phases.push(ImportPhase::Failed(failure.clone()));
                info!(
                    "event=isbn_import module=workflow status={} container={parent} duration_ms={}",
                    failure.as_str(),
                    started_at.elapsed().as_millis()
                );
                StatusMessage::danger(failure.message(submitted))
            }
        };

        Ok(IsbnSubmission::Completed(IsbnImport {
            submitted: submitted.to_string(),
            phases,
            outcome,
            status,
            redirect: NavigationTarget::contents(parent.clone()),
        }))
    }

    fn run_import(
        &self,
        parent: &Container,
        submitted: &str,
        fetcher: &dyn MetadataFetcher,
        phases: &mut Vec<ImportPhase>,
    ) -> WorkflowResult<Result<Book, ImportFailure>> {
        phases.push(ImportPhase::ValidatingIsbn);
        let Ok(isbn) = Isbn::parse(submitted) else {
            return Ok(Err(ImportFailure::InvalidIsbn));
        };

        phases.push(ImportPhase::CheckingDuplicate);
        if self.repo().contains_key(parent, isbn.as_str())? {
            return Ok(Err(ImportFailure::DuplicateKey));
        }

        phases.push(ImportPhase::Fetching);
        let metadata = match fetcher.fetch(&isbn) {
            Ok(metadata) => metadata,
            Err(FetchError::NotFound(_)) => return Ok(Err(ImportFailure::NoMetadata)),
            Err(FetchError::InvalidIsbn(_)) => return Ok(Err(ImportFailure::InvalidIsbn)),
            Err(err @ (FetchError::Transient(_) | FetchError::InvalidResponse(_))) => {
                warn!("event=isbn_import module=workflow status=fetch_error isbn={isbn} error={err}");
                return Ok(Err(ImportFailure::FetchError(err.to_string())));
            }
        };

        phases.push(ImportPhase::Inserting);
        let content = NewContent::Book(metadata.into_book(isbn));
        let inserted = self.in_transaction(|repo, index| {
            let resource = insert_content(repo, parent, content)?;
            index.index_resource(&resource)?;
            Ok(resource)
        });
        match inserted {
            Ok(Resource::Book { book, .. }) => Ok(Ok(book)),
            Ok(Resource::Folder(_)) => Err(WorkflowError::NotAddable {
                container: parent.kind(),
                kind: ContentKind::BookFolder,
            }),
            Err(WorkflowError::DuplicateKey { .. }) => Ok(Err(ImportFailure::DuplicateKey)),
            Err(err) => Err(err),
        }
    }
}
