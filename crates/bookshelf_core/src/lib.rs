//! Core domain logic for the Bookshelf catalog.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod lookup;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{load_config, BookshelfConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{init_logging, init_logging_from, logging_status, LogLevel, LogTarget};
pub use lookup::{fetch_metadata, FetchError, Metadata, MetadataFetcher, OpenLibraryFetcher};
pub use model::book::{validate_book, Book};
pub use model::folder::{validate_book_folder, BookFolder};
pub use model::form::{FormInput, ValidationError, ValidationErrors};
pub use model::isbn::{is_valid_isbn, Isbn, IsbnError};
pub use model::registry::ContentRegistry;
pub use model::resource::{ContentKind, Container, Resource, ResourceRef};
pub use repo::content_repo::{ContentRepository, RepoError, RepoResult, SqliteContentRepository};
pub use search::catalog::{full_text, index_fields, IndexMaintainer, IndexValue};
pub use search::query::{query_field, search_text, FieldQuery, SearchError, SearchHit, TextQuery};
pub use service::content_service::{ContentService, Created, WorkflowError, WorkflowResult};
pub use service::isbn_import::{ImportFailure, ImportPhase, IsbnImport, IsbnSubmission};
pub use service::outcome::{NavigationTarget, StatusLevel, StatusMessage};
pub use service::site::{bootstrap_site, SiteStatus, DEFAULT_SITE_TITLE};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
