//! Use-case services over the content store.
//!
//! # Responsibility
//! - Orchestrate validation, storage and index maintenance per request.
//! - Produce the status message and navigation target an admin surface shows.

pub mod content_service;
pub mod isbn_import;
pub mod outcome;
pub mod site;
