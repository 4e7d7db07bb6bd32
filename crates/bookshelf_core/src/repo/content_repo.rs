//! Content repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist book folders under the site root and books inside folders.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Keys are unique per container; a colliding insert or rename yields
//!   `DuplicateKey` and changes nothing.
//! - Listings are in insertion order.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::book::Book;
use crate::model::folder::BookFolder;
use crate::model::isbn::Isbn;
use crate::model::resource::{Container, Resource, ResourceRef};
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const BOOK_SELECT_SQL: &str = "SELECT
    isbn,
    title,
    authors,
    publisher,
    year
FROM books";

const SITE_TITLE_KEY: &str = "site_title";

pub type RepoResult<T> = Result<T, RepoError>;

/// Content persistence error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// `key` is already taken inside `container`.
    DuplicateKey { container: Container, key: String },
    ContainerNotFound(Container),
    NotFound(ResourceRef),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { container, key } => {
                write!(f, "`{key}` already exists in {container}")
            }
            Self::ContainerNotFound(container) => write!(f, "container not found: {container}"),
            Self::NotFound(reference) => write!(f, "resource not found: {reference}"),
            Self::InvalidData(message) => write!(f, "invalid persisted content: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::DuplicateKey { .. }
            | Self::ContainerNotFound(_)
            | Self::NotFound(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface over the content hierarchy.
pub trait ContentRepository {
    fn insert_folder(&self, folder: &BookFolder) -> RepoResult<()>;
    fn update_folder(&self, folder: &BookFolder) -> RepoResult<()>;
    /// Changes a folder's key; its books follow.
    fn rename_folder(&self, from: &str, to: &str) -> RepoResult<()>;
    /// Deletes a folder and every book inside it.
    fn delete_folder(&self, name: &str) -> RepoResult<usize>;
    fn get_folder(&self, name: &str) -> RepoResult<Option<BookFolder>>;
    fn list_folders(&self) -> RepoResult<Vec<BookFolder>>;

    fn insert_book(&self, folder: &str, book: &Book) -> RepoResult<()>;
    fn update_book(&self, folder: &str, book: &Book) -> RepoResult<()>;
    fn rename_book(&self, folder: &str, from: &Isbn, to: &Isbn) -> RepoResult<()>;
    fn delete_book(&self, folder: &str, isbn: &Isbn) -> RepoResult<()>;
    fn get_book(&self, folder: &str, isbn: &Isbn) -> RepoResult<Option<Book>>;
    fn list_books(&self, folder: &str) -> RepoResult<Vec<Book>>;

    /// Whether `key` is taken inside `container`.
    fn contains_key(&self, container: &Container, key: &str) -> RepoResult<bool>;
    /// Every stored resource, folders first, each folder's books in order.
    fn list_resources(&self) -> RepoResult<Vec<Resource>>;
}

/// SQLite-backed content repository.
///
/// Works on a plain connection or on a transaction (through deref), so
/// callers decide the atomicity boundary.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Site title stored on the root, if set.
    pub fn site_title(&self) -> RepoResult<Option<String>> {
        let title = self
            .conn
            .query_row(
                "SELECT value FROM site_settings WHERE key = ?1;",
                [SITE_TITLE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(title)
    }

    /// Records the site title unless one is already set. Returns whether it was written.
    pub fn init_site_title(&self, title: &str) -> RepoResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO site_settings (key, value) VALUES (?1, ?2);",
            params![SITE_TITLE_KEY, title],
        )?;
        Ok(inserted == 1)
    }

    fn folder_exists(&self, name: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM book_folders WHERE name = ?1);",
            [name],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn ensure_folder(&self, name: &str) -> RepoResult<()> {
        if self.folder_exists(name)? {
            Ok(())
        } else {
            Err(RepoError::ContainerNotFound(Container::folder(name)))
        }
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn insert_folder(&self, folder: &BookFolder) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO book_folders (name, title) VALUES (?1, ?2);",
                params![folder.name, folder.title],
            )
            .map_err(|err| map_key_conflict(err, Container::Root, &folder.name))?;
        Ok(())
    }

    fn update_folder(&self, folder: &BookFolder) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE book_folders
             SET title = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE name = ?1;",
            params![folder.name, folder.title],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::folder(folder.name.clone())));
        }
        Ok(())
    }

    fn rename_folder(&self, from: &str, to: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE book_folders
                 SET name = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE name = ?1;",
                params![from, to],
            )
            .map_err(|err| map_key_conflict(err, Container::Root, to))?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::folder(from)));
        }
        Ok(())
    }

    fn delete_folder(&self, name: &str) -> RepoResult<usize> {
        let books: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM books WHERE folder_name = ?1;",
            [name],
            |row| row.get(0),
        )?;
        let changed = self
            .conn
            .execute("DELETE FROM book_folders WHERE name = ?1;", [name])?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::folder(name)));
        }
        Ok(books)
    }

    fn get_folder(&self, name: &str) -> RepoResult<Option<BookFolder>> {
        let folder = self
            .conn
            .query_row(
                "SELECT name, title FROM book_folders WHERE name = ?1;",
                [name],
                |row| {
                    Ok(BookFolder {
                        name: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(folder)
    }

    fn list_folders(&self) -> RepoResult<Vec<BookFolder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, title FROM book_folders ORDER BY rowid ASC;")?;
        let folders = stmt
            .query_map([], |row| {
                Ok(BookFolder {
                    name: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    fn insert_book(&self, folder: &str, book: &Book) -> RepoResult<()> {
        self.ensure_folder(folder)?;
        self.conn
            .execute(
                "INSERT INTO books (
                    folder_name,
                    isbn,
                    title,
                    authors,
                    publisher,
                    year
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    folder,
                    book.isbn.as_str(),
                    book.title,
                    encode_authors(&book.author)?,
                    book.publisher,
                    book.year,
                ],
            )
            .map_err(|err| map_key_conflict(err, Container::folder(folder), book.isbn.as_str()))?;
        Ok(())
    }

    fn update_book(&self, folder: &str, book: &Book) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE books
             SET title = ?3,
                 authors = ?4,
                 publisher = ?5,
                 year = ?6,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE folder_name = ?1
               AND isbn = ?2;",
            params![
                folder,
                book.isbn.as_str(),
                book.title,
                encode_authors(&book.author)?,
                book.publisher,
                book.year,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::book(
                folder,
                book.isbn.clone(),
            )));
        }
        Ok(())
    }

    fn rename_book(&self, folder: &str, from: &Isbn, to: &Isbn) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE books
                 SET isbn = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE folder_name = ?1
                   AND isbn = ?2;",
                params![folder, from.as_str(), to.as_str()],
            )
            .map_err(|err| map_key_conflict(err, Container::folder(folder), to.as_str()))?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::book(folder, from.clone())));
        }
        Ok(())
    }

    fn delete_book(&self, folder: &str, isbn: &Isbn) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM books WHERE folder_name = ?1 AND isbn = ?2;",
            params![folder, isbn.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(ResourceRef::book(folder, isbn.clone())));
        }
        Ok(())
    }

    fn get_book(&self, folder: &str, isbn: &Isbn) -> RepoResult<Option<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             WHERE folder_name = ?1
               AND isbn = ?2;"
        ))?;
        let mut rows = stmt.query(params![folder, isbn.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }
        Ok(None)
    }

    fn list_books(&self, folder: &str) -> RepoResult<Vec<Book>> {
        self.ensure_folder(folder)?;
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             WHERE folder_name = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([folder])?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        Ok(books)
    }

    fn contains_key(&self, container: &Container, key: &str) -> RepoResult<bool> {
        match container {
            Container::Root => self.folder_exists(key),
            Container::Folder(folder) => {
                let exists: i64 = self.conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM books WHERE folder_name = ?1 AND isbn = ?2
                    );",
                    params![folder, key],
                    |row| row.get(0),
                )?;
                Ok(exists == 1)
            }
        }
    }

    fn list_resources(&self) -> RepoResult<Vec<Resource>> {
        let mut resources = Vec::new();
        for folder in self.list_folders()? {
            let books = self.list_books(&folder.name)?;
            let name = folder.name.clone();
            resources.push(Resource::Folder(folder));
            resources.extend(books.into_iter().map(|book| Resource::Book {
                folder: name.clone(),
                book,
            }));
        }
        Ok(resources)
    }
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let isbn_text: String = row.get("isbn")?;
    let isbn = Isbn::parse(&isbn_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid isbn `{isbn_text}` in books.isbn: {err}"))
    })?;

    let authors_text: String = row.get("authors")?;
    let author = serde_json::from_str::<Vec<String>>(&authors_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid author list `{authors_text}` in books.authors: {err}"
        ))
    })?;

    Ok(Book {
        isbn,
        title: row.get("title")?,
        author,
        publisher: row.get("publisher")?,
        year: row.get("year")?,
    })
}

fn encode_authors(authors: &[String]) -> RepoResult<String> {
    serde_json::to_string(authors)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode author list: {err}")))
}

/// Turns primary-key/unique violations into `DuplicateKey`.
fn map_key_conflict(err: rusqlite::Error, container: Container, key: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if matches!(
            failure.extended_code,
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
        ) {
            return RepoError::DuplicateKey {
                container,
                key: key.to_string(),
            };
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::{ContentRepository, RepoError, SqliteContentRepository};
    use crate::db::open_db_in_memory;
    use crate::model::book::Book;
    use crate::model::folder::BookFolder;
    use crate::model::isbn::Isbn;
    use crate::model::resource::{Container, Resource};

    fn isbn(raw: &str) -> Isbn {
        Isbn::parse(raw).unwrap()
    }

    #[test]
    fn books_roundtrip_with_author_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        repo.insert_folder(&BookFolder::new("shelf", "Shelf")).unwrap();

        let book = Book::new(isbn("9780132350884"), "Clean Code")
            .with_authors(["Robert Martin", "Another Author"])
            .with_publisher("Prentice Hall")
            .with_year(2008);
        repo.insert_book("shelf", &book).unwrap();

        let loaded = repo.get_book("shelf", &book.isbn).unwrap().unwrap();
        assert_eq!(loaded, book);
    }

    #[test]
    fn duplicate_keys_are_semantic_errors() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        repo.insert_folder(&BookFolder::new("shelf", "Shelf")).unwrap();
        let err = repo
            .insert_folder(&BookFolder::new("shelf", "Again"))
            .unwrap_err();
        assert!(matches!(err, RepoError::DuplicateKey { container: Container::Root, .. }));

        let book = Book::new(isbn("9780132350884"), "Clean Code");
        repo.insert_book("shelf", &book).unwrap();
        let err = repo.insert_book("shelf", &book).unwrap_err();
        assert!(matches!(err, RepoError::DuplicateKey { ref key, .. } if key == "9780132350884"));
    }

    #[test]
    fn same_isbn_may_live_in_two_folders() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        repo.insert_folder(&BookFolder::new("a", "A")).unwrap();
        repo.insert_folder(&BookFolder::new("b", "B")).unwrap();
        let book = Book::new(isbn("9780132350884"), "Clean Code");
        repo.insert_book("a", &book).unwrap();
        repo.insert_book("b", &book).unwrap();
        assert!(repo
            .contains_key(&Container::folder("b"), "9780132350884")
            .unwrap());
    }

    #[test]
    fn insert_into_missing_folder_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        let err = repo
            .insert_book("ghost", &Book::new(isbn("9780132350884"), "Clean Code"))
            .unwrap_err();
        assert!(matches!(err, RepoError::ContainerNotFound(_)));
    }

    #[test]
    fn folder_rename_carries_books_and_delete_cascades() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        repo.insert_folder(&BookFolder::new("old", "Shelf")).unwrap();
        repo.insert_book("old", &Book::new(isbn("9780132350884"), "Clean Code"))
            .unwrap();

        repo.rename_folder("old", "new").unwrap();
        assert!(repo.get_folder("old").unwrap().is_none());
        assert_eq!(repo.list_books("new").unwrap().len(), 1);

        assert_eq!(repo.delete_folder("new").unwrap(), 1);
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn list_resources_walks_folders_then_books() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        repo.insert_folder(&BookFolder::new("shelf", "Shelf")).unwrap();
        repo.insert_book("shelf", &Book::new(isbn("080442957X"), "Book"))
            .unwrap();

        let resources = repo.list_resources().unwrap();
        assert_eq!(resources.len(), 2);
        assert!(matches!(resources[0], Resource::Folder(_)));
        assert!(matches!(resources[1], Resource::Book { ref folder, .. } if folder == "shelf"));
    }

    #[test]
    fn site_title_is_written_once() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteContentRepository::new(&conn);
        assert!(repo.init_site_title("First").unwrap());
        assert!(!repo.init_site_title("Second").unwrap());
        assert_eq!(repo.site_title().unwrap().as_deref(), Some("First"));
    }
}
