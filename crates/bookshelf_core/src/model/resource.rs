//! Content kinds and their places in the site hierarchy.
//!
//! # Invariants
//! - The hierarchy is `root -> book folder -> book`; paths are
//!   `/<folder>` and `/<folder>/<isbn>`.
//! - `ContentKind` db tags are stable and shared by storage and index tables.

use crate::model::book::Book;
use crate::model::folder::BookFolder;
use crate::model::isbn::Isbn;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Registered content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// The site root; exists exactly once and is never created by a form.
    Root,
    BookFolder,
    Book,
}

impl ContentKind {
    /// Human-facing type name, as shown in add menus.
    pub fn type_tag(self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::BookFolder => "BookFolder",
            Self::Book => "Book",
        }
    }

    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::BookFolder => "book_folder",
            Self::Book => "book",
        }
    }

    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "root" => Some(Self::Root),
            "book_folder" => Some(Self::BookFolder),
            "book" => Some(Self::Book),
            _ => None,
        }
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// A container new content can be added to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    Root,
    Folder(String),
}

impl Container {
    pub fn folder(name: impl Into<String>) -> Self {
        Self::Folder(name.into())
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Root => ContentKind::Root,
            Self::Folder(_) => ContentKind::BookFolder,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::Folder(name) => format!("/{name}"),
        }
    }
}

impl Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Address of one stored resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceRef {
    Folder { name: String },
    Book { folder: String, isbn: Isbn },
}

impl ResourceRef {
    pub fn folder(name: impl Into<String>) -> Self {
        Self::Folder { name: name.into() }
    }

    pub fn book(folder: impl Into<String>, isbn: Isbn) -> Self {
        Self::Book {
            folder: folder.into(),
            isbn,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Folder { .. } => ContentKind::BookFolder,
            Self::Book { .. } => ContentKind::Book,
        }
    }

    /// Container that owns this resource.
    pub fn parent(&self) -> Container {
        match self {
            Self::Folder { .. } => Container::Root,
            Self::Book { folder, .. } => Container::Folder(folder.clone()),
        }
    }

    /// Storage key inside the parent container.
    pub fn key(&self) -> &str {
        match self {
            Self::Folder { name } => name,
            Self::Book { isbn, .. } => isbn.as_str(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Folder { name } => format!("/{name}"),
            Self::Book { folder, isbn } => format!("/{folder}/{isbn}"),
        }
    }

    /// Rebuilds a reference from an index row's kind and path.
    pub(crate) fn from_path(kind: ContentKind, path: &str) -> Option<Self> {
        let rest = path.strip_prefix('/')?;
        match kind {
            ContentKind::BookFolder if !rest.is_empty() && !rest.contains('/') => {
                Some(Self::folder(rest))
            }
            ContentKind::Book => {
                let (folder, isbn) = rest.split_once('/')?;
                let isbn = Isbn::parse(isbn).ok()?;
                Some(Self::book(folder, isbn))
            }
            _ => None,
        }
    }
}

impl Display for ResourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// A stored resource together with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Folder(BookFolder),
    Book { folder: String, book: Book },
}

impl Resource {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Folder(_) => ContentKind::BookFolder,
            Self::Book { .. } => ContentKind::Book,
        }
    }

    pub fn reference(&self) -> ResourceRef {
        match self {
            Self::Folder(folder) => ResourceRef::folder(folder.name.clone()),
            Self::Book { folder, book } => ResourceRef::book(folder.clone(), book.isbn.clone()),
        }
    }
}

/// Validated content ready for insertion, produced by a form validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewContent {
    Folder(BookFolder),
    Book(Book),
}

impl NewContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Folder(_) => ContentKind::BookFolder,
            Self::Book(_) => ContentKind::Book,
        }
    }

    /// Storage key under the parent container.
    pub fn key(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::Book(book) => book.isbn.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContentKind, Container, ResourceRef};
    use crate::model::isbn::Isbn;

    #[test]
    fn paths_follow_hierarchy() {
        let isbn = Isbn::parse("9780132350884").unwrap();
        let book = ResourceRef::book("shelf", isbn);
        assert_eq!(book.path(), "/shelf/9780132350884");
        assert_eq!(book.parent(), Container::folder("shelf"));
        assert_eq!(ResourceRef::folder("shelf").path(), "/shelf");
        assert_eq!(Container::Root.path(), "/");
    }

    #[test]
    fn references_parse_back_from_paths() {
        let isbn = Isbn::parse("9780132350884").unwrap();
        let book = ResourceRef::book("shelf", isbn);
        assert_eq!(
            ResourceRef::from_path(ContentKind::Book, &book.path()),
            Some(book)
        );
        assert_eq!(
            ResourceRef::from_path(ContentKind::BookFolder, "/shelf"),
            Some(ResourceRef::folder("shelf"))
        );
        assert_eq!(ResourceRef::from_path(ContentKind::Book, "/shelf"), None);
        assert_eq!(ResourceRef::from_path(ContentKind::Root, "/"), None);
    }

    #[test]
    fn db_tags_are_stable() {
        for kind in [ContentKind::Root, ContentKind::BookFolder, ContentKind::Book] {
            assert_eq!(ContentKind::from_db(kind.as_db()), Some(kind));
        }
        assert_eq!(ContentKind::from_db("note"), None);
    }
}
