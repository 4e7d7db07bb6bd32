//! Content workflow service.
//!
//! # Responsibility
//! - Create folders and books from form submissions.
//! - Edit, rename and remove content while keeping catalogs in step.
//! - Serve the contents listings and the public book view.
//!
//! # Invariants
//! - Every mutation and its index update commit in one transaction; a
//!   failure leaves both untouched.
//! - A container accepts only the kinds on its registry allow-list.
//! - Keys are unique per container; collisions are `DuplicateKey`.

use crate::db::DbError;
use crate::model::book::{validate_book_edit, validate_isbn, Book};
use crate::model::folder::{validate_book_folder_edit, validate_name, BookFolder};
use crate::model::form::{FormInput, ValidationErrors};
use crate::model::isbn::Isbn;
use crate::model::registry::ContentRegistry;
use crate::model::resource::{ContentKind, Container, NewContent, Resource, ResourceRef};
use crate::repo::content_repo::{ContentRepository, RepoError, SqliteContentRepository};
use crate::search::catalog::{CatalogError, IndexMaintainer};
use crate::service::outcome::{NavigationTarget, StatusMessage};
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Content workflow failure.
#[derive(Debug)]
pub enum WorkflowError {
    /// Field-level problems; nothing was written.
    Validation(ValidationErrors),
    DuplicateKey { container: Container, key: String },
    /// `kind` is not on the allow-list of `container`.
    NotAddable {
        container: ContentKind,
        kind: ContentKind,
    },
    ContainerNotFound(Container),
    NotFound(ResourceRef),
    Repo(RepoError),
    Catalog(CatalogError),
    Db(DbError),
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => write!(f, "{errors}"),
            Self::DuplicateKey { container, key } => {
                write!(f, "`{key}` already exists in {container}")
            }
            Self::NotAddable { container, kind } => {
                write!(f, "{kind} cannot be added to {container}")
            }
            Self::ContainerNotFound(container) => write!(f, "container not found: {container}"),
            Self::NotFound(reference) => write!(f, "not found: {reference}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Catalog(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkflowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Repo(err) => Some(err),
            Self::Catalog(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for WorkflowError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for WorkflowError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateKey { container, key } => Self::DuplicateKey { container, key },
            RepoError::ContainerNotFound(container) => Self::ContainerNotFound(container),
            RepoError::NotFound(reference) => Self::NotFound(reference),
            other => Self::Repo(other),
        }
    }
}

impl From<CatalogError> for WorkflowError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::Repo(err) => err.into(),
            other => Self::Catalog(other),
        }
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a successful form creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub resource: Resource,
    pub status: StatusMessage,
    pub redirect: NavigationTarget,
}

/// Content workflow over one borrowed connection.
pub struct ContentService<'a> {
    conn: &'a Connection,
    registry: &'a ContentRegistry,
}

impl<'a> ContentService<'a> {
    /// Index updates only reach registered catalogs, so run
    /// [`bootstrap_site`](crate::service::site::bootstrap_site) on the
    /// connection first. Content written earlier is backfilled when the
    /// catalogs are created.
    pub fn new(conn: &'a Connection, registry: &'a ContentRegistry) -> Self {
        Self { conn, registry }
    }

    pub fn registry(&self) -> &ContentRegistry {
        self.registry
    }

    /// Validates `input` as `kind` and inserts it into `parent`.
    ///
    /// # Errors
    /// - `NotAddable` when `parent` does not accept `kind`.
    /// - `Validation` with every offending field.
    /// - `DuplicateKey` when the identity value is taken in `parent`.
    /// - `ContainerNotFound` when `parent` does not exist.
    pub fn create_from_form(
        &self,
        parent: &Container,
        input: &FormInput,
        kind: ContentKind,
    ) -> WorkflowResult<Created> {
        let not_addable = WorkflowError::NotAddable {
            container: parent.kind(),
            kind,
        };
        if !self.registry.can_add(parent.kind(), kind) {
            return Err(not_addable);
        }
        let Some(validate) = self.registry.spec(kind).and_then(|spec| spec.validate) else {
            return Err(not_addable);
        };

        let content = validate(input).inspect_err(|errors| {
            info!(
                "event=content_create module=workflow status=invalid kind={} fields={}",
                kind.type_tag(),
                errors.errors().len()
            );
        })?;
        let resource = self.in_transaction(|repo, index| {
            let resource = insert_content(repo, parent, content)?;
            index.index_resource(&resource)?;
            Ok(resource)
        })?;

        let reference = resource.reference();
        info!(
            "event=content_create module=workflow status=ok kind={} path={reference}",
            kind.type_tag()
        );
        Ok(Created {
            status: StatusMessage::success(format!(
                "Added {}: {}.",
                kind.type_tag(),
                reference.key()
            )),
            redirect: NavigationTarget::contents(parent.clone()),
            resource,
        })
    }

    /// Replaces the non-identity attributes of one book.
    pub fn edit_book(&self, folder: &str, isbn: &Isbn, input: &FormInput) -> WorkflowResult<Book> {
        let edit = validate_book_edit(input, isbn)?;
        let book = self.in_transaction(|repo, index| {
            let mut book = repo
                .get_book(folder, isbn)?
                .ok_or_else(|| WorkflowError::NotFound(ResourceRef::book(folder, isbn.clone())))?;
            book.apply(edit);
            repo.update_book(folder, &book)?;
            index.index_resource(&Resource::Book {
                folder: folder.to_string(),
                book: book.clone(),
            })?;
            Ok(book)
        })?;
        info!("event=book_edit module=workflow status=ok folder={folder} isbn={isbn}");
        Ok(book)
    }

    pub fn edit_book_folder(&self, name: &str, input: &FormInput) -> WorkflowResult<BookFolder> {
        let edit = validate_book_folder_edit(input, name)?;
        let folder = self.in_transaction(|repo, index| {
            let mut folder = repo
                .get_folder(name)?
                .ok_or_else(|| WorkflowError::NotFound(ResourceRef::folder(name)))?;
            folder.title = edit.title;
            repo.update_folder(&folder)?;
            index.index_resource(&Resource::Folder(folder.clone()))?;
            Ok(folder)
        })?;
        info!("event=folder_edit module=workflow status=ok folder={name}");
        Ok(folder)
    }

    /// Moves a book to a new ISBN key inside its folder.
    pub fn rename_book(&self, folder: &str, from: &Isbn, to: &str) -> WorkflowResult<Book> {
        let to = validate_isbn(to).map_err(ValidationErrors::from)?;
        let book = self.in_transaction(|repo, index| {
            if &to != from {
                repo.rename_book(folder, from, &to)?;
            }
            let book = repo
                .get_book(folder, &to)?
                .ok_or_else(|| WorkflowError::NotFound(ResourceRef::book(folder, to.clone())))?;
            index.unindex(&ResourceRef::book(folder, from.clone()))?;
            index.index_resource(&Resource::Book {
                folder: folder.to_string(),
                book: book.clone(),
            })?;
            Ok(book)
        })?;
        info!("event=book_rename module=workflow status=ok folder={folder} from={from} to={to}");
        Ok(book)
    }

    /// Renames a folder; its books move with it.
    pub fn rename_book_folder(&self, from: &str, to: &str) -> WorkflowResult<BookFolder> {
        let to = validate_name(to).map_err(ValidationErrors::from)?;
        let folder = self.in_transaction(|repo, index| {
            if to != from {
                repo.rename_folder(from, &to)?;
            }
            let folder = repo
                .get_folder(&to)?
                .ok_or_else(|| WorkflowError::NotFound(ResourceRef::folder(to.clone())))?;
            index.unindex_folder_tree(from)?;
            index.index_resource(&Resource::Folder(folder.clone()))?;
            for book in repo.list_books(&to)? {
                index.index_resource(&Resource::Book {
                    folder: to.clone(),
                    book,
                })?;
            }
            Ok(folder)
        })?;
        info!("event=folder_rename module=workflow status=ok from={from} to={to}");
        Ok(folder)
    }

    pub fn remove_book(&self, folder: &str, isbn: &Isbn) -> WorkflowResult<()> {
        self.in_transaction(|repo, index| {
            repo.delete_book(folder, isbn)?;
            index.unindex(&ResourceRef::book(folder, isbn.clone()))?;
            Ok(())
        })?;
        info!("event=book_remove module=workflow status=ok folder={folder} isbn={isbn}");
        Ok(())
    }

    /// Deletes a folder with its books. Returns the number of books removed.
    pub fn remove_book_folder(&self, name: &str) -> WorkflowResult<usize> {
        let books = self.in_transaction(|repo, index| {
            let books = repo.delete_folder(name)?;
            index.unindex_folder_tree(name)?;
            Ok(books)
        })?;
        info!("event=folder_remove module=workflow status=ok folder={name} books={books}");
        Ok(books)
    }

    pub fn list_folders(&self) -> WorkflowResult<Vec<BookFolder>> {
        Ok(self.repo().list_folders()?)
    }

    /// Contents listing of one folder, in insertion order.
    pub fn list_books(&self, folder: &str) -> WorkflowResult<Vec<Book>> {
        let repo = self.repo();
        if repo.get_folder(folder)?.is_none() {
            return Err(WorkflowError::ContainerNotFound(Container::folder(folder)));
        }
        Ok(repo.list_books(folder)?)
    }

    pub fn get_folder(&self, name: &str) -> WorkflowResult<BookFolder> {
        self.repo()
            .get_folder(name)?
            .ok_or_else(|| WorkflowError::NotFound(ResourceRef::folder(name)))
    }

    pub fn get_book(&self, folder: &str, isbn: &Isbn) -> WorkflowResult<Book> {
        self.repo()
            .get_book(folder, isbn)?
            .ok_or_else(|| WorkflowError::NotFound(ResourceRef::book(folder, isbn.clone())))
    }

    pub(crate) fn repo(&self) -> SqliteContentRepository<'a> {
        SqliteContentRepository::new(self.conn)
    }

    /// Runs `op` inside one immediate transaction; commits only on `Ok`.
    pub(crate) fn in_transaction<T>(
        &self,
        op: impl FnOnce(&SqliteContentRepository<'_>, &IndexMaintainer<'_>) -> WorkflowResult<T>,
    ) -> WorkflowResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let result = {
            let repo = SqliteContentRepository::new(&tx);
            let index = IndexMaintainer::new(&tx, self.registry);
            op(&repo, &index)
        };
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=workflow_rollback module=workflow status=error error={rollback_err}"
                    );
                }
                Err(err)
            }
        }
    }
}

/// Inserts validated content under `parent` and returns its stored form.
pub(crate) fn insert_content(
    repo: &SqliteContentRepository<'_>,
    parent: &Container,
    content: NewContent,
) -> WorkflowResult<Resource> {
    match (parent, content) {
        (Container::Root, NewContent::Folder(folder)) => {
            repo.insert_folder(&folder)?;
            Ok(Resource::Folder(folder))
        }
        (Container::Folder(name), NewContent::Book(book)) => {
            repo.insert_book(name, &book)?;
            Ok(Resource::Book {
                folder: name.clone(),
                book,
            })
        }
        (parent, content) => Err(WorkflowError::NotAddable {
            container: parent.kind(),
            kind: content.kind(),
        }),
    }
}
