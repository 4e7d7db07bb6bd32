//! Catalog maintenance and queries.
//!
//! # Responsibility
//! - Keep index rows synchronized with stored content.
//! - Answer field and free-text queries for the admin surface.

pub mod catalog;
pub mod query;
