//! Catalog configuration and index maintenance.
//!
//! # Responsibility
//! - Project books and folders onto per-field index values and one
//!   free-text blob.
//! - Keep the `books` field catalog and the `system` text catalog in step
//!   with stored content.
//!
//! # Invariants
//! - Callers run index updates on the same connection (and transaction) as
//!   the content mutation they mirror.
//! - Re-indexing an unchanged resource leaves identical rows behind.
//! - Only registered catalogs receive entries.

use crate::db::DbError;
use crate::model::book::Book;
use crate::model::folder::BookFolder;
use crate::model::registry::ContentRegistry;
use crate::model::resource::{ContentKind, Resource, ResourceRef};
use crate::repo::content_repo::{ContentRepository, RepoError, SqliteContentRepository};
use log::{debug, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Catalog holding one index per book attribute.
pub const BOOKS_CATALOG: &str = "books";
/// Site-wide catalog; only its free-text index is maintained here.
pub const SYSTEM_CATALOG: &str = "system";
/// Name of the free-text index in [`SYSTEM_CATALOG`].
pub const TEXT_INDEX: &str = "text";

/// How an index answers queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Case-insensitive substring match.
    Text,
    /// Exact value match.
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub kind: IndexKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSpec {
    pub name: &'static str,
    pub indexes: &'static [IndexSpec],
}

impl CatalogSpec {
    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|index| index.name == name)
    }
}

/// Catalogs known to this build. `isbn` is deliberately absent from
/// `books`: it is the identity and lives in the resource path.
pub const CATALOGS: &[CatalogSpec] = &[
    CatalogSpec {
        name: BOOKS_CATALOG,
        indexes: &[
            IndexSpec {
                name: "title",
                kind: IndexKind::Text,
            },
            IndexSpec {
                name: "author",
                kind: IndexKind::Field,
            },
            IndexSpec {
                name: "publisher",
                kind: IndexKind::Field,
            },
            IndexSpec {
                name: "year",
                kind: IndexKind::Field,
            },
        ],
    },
    CatalogSpec {
        name: SYSTEM_CATALOG,
        indexes: &[IndexSpec {
            name: TEXT_INDEX,
            kind: IndexKind::Text,
        }],
    },
];

pub fn catalog_spec(name: &str) -> Option<&'static CatalogSpec> {
    CATALOGS.iter().find(|catalog| catalog.name == name)
}

/// One indexed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Text(String),
    TextList(Vec<String>),
    Int(i64),
}

/// Field name -> indexed value for one resource.
pub type IndexFields = BTreeMap<&'static str, IndexValue>;

/// Attribute access for indexing. Absent attributes return `None` and are
/// indexed with their declared defaults.
pub trait Indexable {
    fn isbn(&self) -> Option<&str> {
        None
    }
    fn title(&self) -> Option<&str> {
        None
    }
    fn authors(&self) -> Option<&[String]> {
        None
    }
    fn publisher(&self) -> Option<&str> {
        None
    }
    fn year(&self) -> Option<i64> {
        None
    }
}

impl Indexable for Book {
    fn isbn(&self) -> Option<&str> {
        Some(self.isbn.as_str())
    }
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }
    fn authors(&self) -> Option<&[String]> {
        Some(&self.author)
    }
    fn publisher(&self) -> Option<&str> {
        Some(&self.publisher)
    }
    fn year(&self) -> Option<i64> {
        Some(self.year)
    }
}

impl Indexable for BookFolder {
    fn title(&self) -> Option<&str> {
        Some(&self.title)
    }
}

impl Indexable for Resource {
    fn isbn(&self) -> Option<&str> {
        self.as_indexable().isbn()
    }
    fn title(&self) -> Option<&str> {
        self.as_indexable().title()
    }
    fn authors(&self) -> Option<&[String]> {
        self.as_indexable().authors()
    }
    fn publisher(&self) -> Option<&str> {
        self.as_indexable().publisher()
    }
    fn year(&self) -> Option<i64> {
        self.as_indexable().year()
    }
}

impl Resource {
    fn as_indexable(&self) -> &dyn Indexable {
        match self {
            Self::Folder(folder) => folder,
            Self::Book { book, .. } => book,
        }
    }
}

/// Index values for a book: `{title, author, publisher, year}`.
pub fn book_index_fields(resource: &dyn Indexable) -> IndexFields {
    let mut fields = IndexFields::new();
    fields.insert(
        "title",
        IndexValue::Text(resource.title().unwrap_or_default().to_string()),
    );
    fields.insert(
        "author",
        IndexValue::TextList(resource.authors().map(<[String]>::to_vec).unwrap_or_default()),
    );
    fields.insert(
        "publisher",
        IndexValue::Text(resource.publisher().unwrap_or_default().to_string()),
    );
    fields.insert("year", IndexValue::Int(resource.year().unwrap_or(0)));
    fields
}

/// Index values for a folder: `{title}`.
pub fn folder_index_fields(resource: &dyn Indexable) -> IndexFields {
    let mut fields = IndexFields::new();
    fields.insert(
        "title",
        IndexValue::Text(resource.title().unwrap_or_default().to_string()),
    );
    fields
}

/// Kinds that are never indexed (the site root).
pub fn no_index_fields(_resource: &dyn Indexable) -> IndexFields {
    IndexFields::new()
}

/// Free-text blob: `isbn title authors publisher year`, space separated.
///
/// Absent attributes contribute an empty string, so a folder yields its
/// title padded by separators.
pub fn full_text(resource: &dyn Indexable) -> String {
    let authors = resource.authors().map(|items| items.join(" ")).unwrap_or_default();
    let year = resource.year().map(|year| year.to_string()).unwrap_or_default();
    [
        resource.isbn().unwrap_or_default(),
        resource.title().unwrap_or_default(),
        authors.as_str(),
        resource.publisher().unwrap_or_default(),
        year.as_str(),
    ]
    .join(" ")
}

/// Projection of `resource` through the registry's index function for its kind.
pub fn index_fields(registry: &ContentRegistry, resource: &Resource) -> IndexFields {
    match registry.spec(resource.kind()) {
        Some(spec) => (spec.index_fields)(resource),
        None => IndexFields::new(),
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug)]
pub enum CatalogError {
    Db(DbError),
    /// Failure while reading content for a backfill.
    Repo(RepoError),
    UnknownCatalog(String),
    InvalidData(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::UnknownCatalog(name) => write!(f, "unknown catalog `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid catalog data: {message}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::UnknownCatalog(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for CatalogError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for CatalogError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Writes and removes catalog entries for stored resources.
pub struct IndexMaintainer<'a> {
    conn: &'a Connection,
    registry: &'a ContentRegistry,
}

impl<'a> IndexMaintainer<'a> {
    pub fn new(conn: &'a Connection, registry: &'a ContentRegistry) -> Self {
        Self { conn, registry }
    }

    /// Registers `name` if missing. Returns `true` when it was created.
    ///
    /// With `update_indexes`, a newly created catalog is backfilled from
    /// all stored content.
    pub fn ensure_catalog(&self, name: &str, update_indexes: bool) -> CatalogResult<bool> {
        if catalog_spec(name).is_none() {
            return Err(CatalogError::UnknownCatalog(name.to_string()));
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO catalogs (name) VALUES (?1);",
            [name],
        )?;
        if inserted == 0 {
            debug!("event=catalog_ensure module=catalog status=exists catalog={name}");
            return Ok(false);
        }

        let mut backfilled = 0usize;
        if update_indexes {
            let repo = SqliteContentRepository::new(self.conn);
            for resource in repo.list_resources()? {
                self.write_catalog(name, &resource)?;
                backfilled += 1;
            }
        }
        info!(
            "event=catalog_ensure module=catalog status=created catalog={name} backfilled={backfilled}"
        );
        Ok(true)
    }

    /// Names of registered catalogs, sorted.
    pub fn catalogs(&self) -> CatalogResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM catalogs ORDER BY name ASC;")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Replaces every catalog entry for `resource` with its current projection.
    pub fn index_resource(&self, resource: &Resource) -> CatalogResult<()> {
        let catalogs = self.catalogs()?;
        if catalogs.is_empty() {
            warn!(
                "event=index_resource module=catalog status=skipped reason=no_catalogs path={}",
                resource.reference()
            );
            return Ok(());
        }
        for name in catalogs {
            self.write_catalog(&name, resource)?;
        }
        debug!(
            "event=index_resource module=catalog status=ok kind={} path={}",
            resource.kind().as_db(),
            resource.reference()
        );
        Ok(())
    }

    /// Removes every catalog entry for one resource.
    pub fn unindex(&self, reference: &ResourceRef) -> CatalogResult<()> {
        let path = reference.path();
        self.conn.execute(
            "DELETE FROM catalog_entries WHERE resource_path = ?1;",
            [path.as_str()],
        )?;
        self.conn.execute(
            "DELETE FROM system_text WHERE resource_path = ?1;",
            [path.as_str()],
        )?;
        debug!("event=unindex_resource module=catalog status=ok path={path}");
        Ok(())
    }

    /// Removes entries for a folder and every book inside it.
    pub fn unindex_folder_tree(&self, folder: &str) -> CatalogResult<()> {
        let path = ResourceRef::folder(folder).path();
        self.conn.execute(
            "DELETE FROM catalog_entries WHERE resource_path = ?1 OR parent = ?2;",
            params![path, folder],
        )?;
        self.conn.execute(
            "DELETE FROM system_text WHERE resource_path = ?1 OR parent = ?2;",
            params![path, folder],
        )?;
        debug!("event=unindex_tree module=catalog status=ok path={path}");
        Ok(())
    }

    /// Clears and rebuilds every registered catalog from stored content.
    ///
    /// Runs as one transaction: on failure the previous entries stay in place.
    pub fn reindex_all(&self) -> CatalogResult<usize> {
        // Inside a caller's transaction the rebuild rides on it.
        if !self.conn.is_autocommit() {
            return self.rebuild_all();
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        match self.rebuild_all() {
            Ok(count) => {
                tx.commit()?;
                Ok(count)
            }
            Err(err) => {
                warn!("event=reindex_all module=catalog status=rolled_back error={err}");
                Err(err)
            }
        }
    }

    fn rebuild_all(&self) -> CatalogResult<usize> {
        let started_at = Instant::now();
        self.conn.execute("DELETE FROM catalog_entries;", [])?;
        self.conn.execute("DELETE FROM system_text;", [])?;

        let repo = SqliteContentRepository::new(self.conn);
        let resources = repo.list_resources()?;
        for resource in &resources {
            self.index_resource(resource)?;
        }
        info!(
            "event=reindex_all module=catalog status=ok resources={} duration_ms={}",
            resources.len(),
            started_at.elapsed().as_millis()
        );
        Ok(resources.len())
    }

    /// Reads back the stored field values of `reference` in `catalog`.
    pub fn indexed_fields(
        &self,
        catalog: &str,
        reference: &ResourceRef,
    ) -> CatalogResult<BTreeMap<String, IndexValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT field, value_kind, value_text, value_int
             FROM catalog_entries
             WHERE catalog = ?1 AND resource_path = ?2
             ORDER BY field ASC, ordinal ASC;",
        )?;
        let mut rows = stmt.query(params![catalog, reference.path()])?;
        let mut fields: BTreeMap<String, IndexValue> = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let field: String = row.get(0)?;
            let value_kind: String = row.get(1)?;
            let value_text: Option<String> = row.get(2)?;
            let value_int: Option<i64> = row.get(3)?;

            match value_kind.as_str() {
                "text" => {
                    fields.insert(field, IndexValue::Text(value_text.unwrap_or_default()));
                }
                "int" => {
                    fields.insert(field, IndexValue::Int(value_int.unwrap_or_default()));
                }
                "list" => {
                    let entry = fields
                        .entry(field)
                        .or_insert_with(|| IndexValue::TextList(Vec::new()));
                    if let (IndexValue::TextList(items), Some(text)) = (entry, value_text) {
                        items.push(text);
                    }
                }
                other => {
                    return Err(CatalogError::InvalidData(format!(
                        "invalid value kind `{other}` in catalog_entries.value_kind"
                    )));
                }
            }
        }
        Ok(fields)
    }

    /// Stored free-text blob for `reference`, if indexed.
    pub fn indexed_text(&self, reference: &ResourceRef) -> CatalogResult<Option<String>> {
        let text = self
            .conn
            .query_row(
                "SELECT text FROM system_text WHERE resource_path = ?1;",
                [reference.path()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }

    fn write_catalog(&self, catalog: &str, resource: &Resource) -> CatalogResult<()> {
        let Some(spec) = catalog_spec(catalog) else {
            return Err(CatalogError::UnknownCatalog(catalog.to_string()));
        };
        let reference = resource.reference();
        let path = reference.path();
        let parent = parent_key(&reference);
        let kind = resource.kind().as_db();

        if catalog == SYSTEM_CATALOG {
            self.conn.execute(
                "DELETE FROM system_text WHERE resource_path = ?1;",
                [path.as_str()],
            )?;
            if resource.kind() != ContentKind::Root {
                self.conn.execute(
                    "INSERT INTO system_text (resource_path, resource_kind, parent, text)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![path, kind, parent, full_text(resource)],
                )?;
            }
            return Ok(());
        }

        self.conn.execute(
            "DELETE FROM catalog_entries WHERE catalog = ?1 AND resource_path = ?2;",
            params![catalog, path],
        )?;

        for (field, value) in index_fields(self.registry, resource) {
            if spec.index(field).is_none() {
                continue;
            }
            match value {
                IndexValue::Text(text) => {
                    self.insert_entry(
                        catalog,
                        &path,
                        kind,
                        parent,
                        field,
                        0,
                        "text",
                        Some(text.as_str()),
                        None,
                    )?;
                }
                IndexValue::Int(number) => {
                    let text = number.to_string();
                    self.insert_entry(
                        catalog,
                        &path,
                        kind,
                        parent,
                        field,
                        0,
                        "int",
                        Some(text.as_str()),
                        Some(number),
                    )?;
                }
                IndexValue::TextList(items) if items.is_empty() => {
                    self.insert_entry(catalog, &path, kind, parent, field, 0, "list", None, None)?;
                }
                IndexValue::TextList(items) => {
                    for (ordinal, item) in items.iter().enumerate() {
                        self.insert_entry(
                            catalog,
                            &path,
                            kind,
                            parent,
                            field,
                            ordinal as i64,
                            "list",
                            Some(item.as_str()),
                            None,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_entry(
        &self,
        catalog: &str,
        path: &str,
        kind: &str,
        parent: &str,
        field: &str,
        ordinal: i64,
        value_kind: &str,
        value_text: Option<&str>,
        value_int: Option<i64>,
    ) -> CatalogResult<()> {
        self.conn.execute(
            "INSERT INTO catalog_entries (
                catalog,
                resource_path,
                resource_kind,
                parent,
                field,
                ordinal,
                value_kind,
                value_text,
                value_int
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                catalog, path, kind, parent, field, ordinal, value_kind, value_text, value_int
            ],
        )?;
        Ok(())
    }
}

/// Parent folder name, or `""` for root-level resources.
fn parent_key(reference: &ResourceRef) -> &str {
    match reference {
        ResourceRef::Folder { .. } => "",
        ResourceRef::Book { folder, .. } => folder,
    }
}

#[cfg(test)]
mod tests {
    use super::{book_index_fields, folder_index_fields, full_text, IndexValue};
    use crate::model::book::Book;
    use crate::model::folder::BookFolder;
    use crate::model::isbn::Isbn;

    fn clean_code() -> Book {
        Book::new(Isbn::parse("9780132350884").unwrap(), "Clean Code")
            .with_authors(["Robert Martin", "Dean Wampler"])
            .with_publisher("Prentice Hall")
            .with_year(2008)
    }

    #[test]
    fn book_fields_are_taken_verbatim() {
        let fields = book_index_fields(&clean_code());
        assert_eq!(fields["title"], IndexValue::Text("Clean Code".to_string()));
        assert_eq!(
            fields["author"],
            IndexValue::TextList(vec![
                "Robert Martin".to_string(),
                "Dean Wampler".to_string()
            ])
        );
        assert_eq!(fields["publisher"], IndexValue::Text("Prentice Hall".to_string()));
        assert_eq!(fields["year"], IndexValue::Int(2008));
    }

    #[test]
    fn folder_fields_only_carry_title() {
        let fields = folder_index_fields(&BookFolder::new("shelf", "My Shelf"));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["title"], IndexValue::Text("My Shelf".to_string()));
    }

    #[test]
    fn full_text_spans_every_book_field() {
        assert_eq!(
            full_text(&clean_code()),
            "9780132350884 Clean Code Robert Martin Dean Wampler Prentice Hall 2008"
        );
    }

    #[test]
    fn full_text_defaults_absent_attributes_to_empty() {
        assert_eq!(full_text(&BookFolder::new("shelf", "My Shelf")), " My Shelf   ");
        let bare = Book::new(Isbn::parse("080442957X").unwrap(), "T");
        assert_eq!(full_text(&bare), "080442957X T   0");
    }

    #[test]
    fn projection_is_stable_across_calls() {
        let book = clean_code();
        assert_eq!(book_index_fields(&book), book_index_fields(&book));
        assert_eq!(full_text(&book), full_text(&book));
    }
}
