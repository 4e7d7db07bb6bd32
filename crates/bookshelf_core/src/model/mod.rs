//! Content model for the book catalog.
//!
//! # Responsibility
//! - Define book and folder records with their validated form schemas.
//! - Describe where content lives in the site hierarchy.
//! - Hold the explicit content type registry.
//!
//! # Invariants
//! - Identity fields (`isbn`, `name`) double as storage keys.
//! - Optional attributes carry declared defaults, never null sentinels.

pub mod book;
pub mod folder;
pub mod form;
pub mod isbn;
pub mod registry;
pub mod resource;
