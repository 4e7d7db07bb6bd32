//! Repository layer over the content hierarchy.
//!
//! # Responsibility
//! - Define the storage contract for folders and books.
//! - Isolate SQLite query details from workflow orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`DuplicateKey`, `NotFound`)
//!   in addition to DB transport errors.

pub mod content_repo;
