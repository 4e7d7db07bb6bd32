//! External ISBN metadata lookup.
//!
//! # Responsibility
//! - Define the fetcher seam used by the ISBN import workflow.
//! - Normalize provider payloads onto one canonical record.
//!
//! # Invariants
//! - An invalid ISBN never reaches the network.
//! - "No data" is a normal outcome, distinct from transport failure.
//! - Nothing here retries.

pub mod metadata;
pub mod open_library;

pub use metadata::{
    fetch_metadata, FetchError, FetchResult, Metadata, MetadataFetcher, MetadataRecord,
};
pub use open_library::OpenLibraryFetcher;
