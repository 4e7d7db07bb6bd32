//! Content type registration table.
//!
//! # Responsibility
//! - Map each content kind to its form schema, index projection and the
//!   kinds it may contain.
//! - Be built once at startup and handed to the workflow and the index
//!   maintainer explicitly.
//!
//! # Invariants
//! - A container accepts a kind only if that kind is on its allow-list.
//! - `Root` has no form schema; it is never created through the workflow.

use crate::model::book::{validate_book, FIELD_ISBN};
use crate::model::folder::{validate_book_folder, FIELD_NAME};
use crate::model::form::{FormInput, ValidationErrors};
use crate::model::resource::{ContentKind, NewContent};
use crate::search::catalog::{
    book_index_fields, folder_index_fields, no_index_fields, IndexFields, Indexable,
};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Form validator producing insertable content.
pub type ValidateFn = fn(&FormInput) -> Result<NewContent, ValidationErrors>;
/// Index projection for one content kind.
pub type IndexFieldsFn = fn(&dyn Indexable) -> IndexFields;

/// Registration record for one content kind.
#[derive(Clone, Copy)]
pub struct ContentTypeSpec {
    pub kind: ContentKind,
    /// Field whose value is the storage key inside the parent.
    pub identity_field: Option<&'static str>,
    /// Name of the add view offered in the parent's add menu.
    pub add_view: Option<&'static str>,
    /// Kinds this kind may contain.
    pub addable: &'static [ContentKind],
    pub validate: Option<ValidateFn>,
    pub index_fields: IndexFieldsFn,
}

impl Debug for ContentTypeSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTypeSpec")
            .field("kind", &self.kind)
            .field("identity_field", &self.identity_field)
            .field("add_view", &self.add_view)
            .field("addable", &self.addable)
            .field("has_form", &self.validate.is_some())
            .finish()
    }
}

/// Explicit registry of content types.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    types: BTreeMap<ContentKind, ContentTypeSpec>,
}

impl ContentRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry for the book catalog site: root -> book folders -> books.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(ContentTypeSpec {
            kind: ContentKind::Root,
            identity_field: None,
            add_view: None,
            addable: &[ContentKind::BookFolder],
            validate: None,
            index_fields: no_index_fields,
        });
        registry.register(ContentTypeSpec {
            kind: ContentKind::BookFolder,
            identity_field: Some(FIELD_NAME),
            add_view: Some("add_book_folder"),
            addable: &[ContentKind::Book],
            validate: Some(validate_folder_content),
            index_fields: folder_index_fields,
        });
        registry.register(ContentTypeSpec {
            kind: ContentKind::Book,
            identity_field: Some(FIELD_ISBN),
            add_view: Some("add_book"),
            addable: &[],
            validate: Some(validate_book_content),
            index_fields: book_index_fields,
        });
        registry
    }

    /// Adds or replaces the registration for `spec.kind`.
    pub fn register(&mut self, spec: ContentTypeSpec) {
        self.types.insert(spec.kind, spec);
    }

    pub fn spec(&self, kind: ContentKind) -> Option<&ContentTypeSpec> {
        self.types.get(&kind)
    }

    /// Kinds that may be added to a container of `container` kind.
    pub fn addable(&self, container: ContentKind) -> &'static [ContentKind] {
        self.spec(container)
            .map(|spec| spec.addable)
            .unwrap_or(&[])
    }

    pub fn can_add(&self, container: ContentKind, kind: ContentKind) -> bool {
        self.spec(kind).is_some() && self.addable(container).contains(&kind)
    }

    /// Registrations offered in a container's add menu, in allow-list order.
    ///
    /// Kinds without an add view are skipped.
    pub fn add_views(&self, container: ContentKind) -> Vec<&ContentTypeSpec> {
        self.addable(container)
            .iter()
            .filter_map(|kind| self.spec(*kind))
            .filter(|spec| spec.add_view.is_some())
            .collect()
    }
}

fn validate_folder_content(input: &FormInput) -> Result<NewContent, ValidationErrors> {
    validate_book_folder(input).map(NewContent::Folder)
}

fn validate_book_content(input: &FormInput) -> Result<NewContent, ValidationErrors> {
    validate_book(input).map(NewContent::Book)
}

#[cfg(test)]
mod tests {
    use super::ContentRegistry;
    use crate::model::resource::ContentKind;

    #[test]
    fn allow_list_matches_hierarchy() {
        let registry = ContentRegistry::standard();
        assert!(registry.can_add(ContentKind::Root, ContentKind::BookFolder));
        assert!(registry.can_add(ContentKind::BookFolder, ContentKind::Book));
        assert!(!registry.can_add(ContentKind::Root, ContentKind::Book));
        assert!(!registry.can_add(ContentKind::BookFolder, ContentKind::BookFolder));
        assert!(!registry.can_add(ContentKind::Book, ContentKind::Book));
    }

    #[test]
    fn add_views_follow_allow_list() {
        let registry = ContentRegistry::standard();
        let root: Vec<_> = registry
            .add_views(ContentKind::Root)
            .iter()
            .map(|spec| (spec.add_view, spec.identity_field))
            .collect();
        assert_eq!(root, vec![(Some("add_book_folder"), Some("name"))]);

        let folder: Vec<_> = registry
            .add_views(ContentKind::BookFolder)
            .iter()
            .map(|spec| (spec.kind, spec.add_view, spec.identity_field))
            .collect();
        assert_eq!(
            folder,
            vec![(ContentKind::Book, Some("add_book"), Some("isbn"))]
        );
        assert!(registry.add_views(ContentKind::Book).is_empty());
    }

    #[test]
    fn empty_registry_accepts_nothing() {
        let registry = ContentRegistry::empty();
        assert!(!registry.can_add(ContentKind::Root, ContentKind::BookFolder));
    }
}
