use bookshelf_core::db::open_db_in_memory;
use bookshelf_core::search::catalog::BOOKS_CATALOG;
use bookshelf_core::{
    bootstrap_site, query_field, ContentKind, ContentRegistry, ContentService, Container,
    FieldQuery, FormInput, IndexMaintainer, IndexValue, Isbn, Resource, ResourceRef,
    WorkflowError, DEFAULT_SITE_TITLE,
};
use rusqlite::Connection;

const CLEAN_CODE: &str = "9780132350884";
const REFACTORING: &str = "9780201485677";

fn open_site() -> (Connection, ContentRegistry) {
    let conn = open_db_in_memory().unwrap();
    let registry = ContentRegistry::standard();
    bootstrap_site(&conn, &registry, DEFAULT_SITE_TITLE).unwrap();
    (conn, registry)
}

fn isbn(raw: &str) -> Isbn {
    Isbn::parse(raw).unwrap()
}

fn folder_form(name: &str, title: &str) -> FormInput {
    FormInput::new().with("name", name).with("title", title)
}

fn book_form(isbn: &str, title: &str) -> FormInput {
    FormInput::new()
        .with("isbn", isbn)
        .with("title", title)
        .with_all("author", ["Robert Martin"])
        .with("publisher", "Prentice Hall")
        .with("year", "2008")
}

fn add_shelf(service: &ContentService<'_>) {
    service
        .create_from_form(
            &Container::Root,
            &folder_form("shelf", "Shelf"),
            ContentKind::BookFolder,
        )
        .unwrap();
}

fn entry_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM catalog_entries;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn form_creation_stores_indexes_and_redirects() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);

    let created = service
        .create_from_form(
            &Container::folder("shelf"),
            &book_form(CLEAN_CODE, "Clean Code"),
            ContentKind::Book,
        )
        .unwrap();
    assert_eq!(created.redirect.path(), "/shelf/@@contents");
    assert_eq!(created.status.text, "Added Book: 9780132350884.");

    let stored = service.get_book("shelf", &isbn(CLEAN_CODE)).unwrap();
    match &created.resource {
        Resource::Book { folder, book } => {
            assert_eq!(folder, "shelf");
            assert_eq!(book, &stored);
        }
        other => panic!("unexpected resource: {other:?}"),
    }
    assert_eq!(stored.title, "Clean Code");
    assert_eq!(stored.author, vec!["Robert Martin".to_string()]);
    assert_eq!(stored.publisher, "Prentice Hall");
    assert_eq!(stored.year, 2008);

    let index = IndexMaintainer::new(&conn, &registry);
    let fields = index
        .indexed_fields(BOOKS_CATALOG, &ResourceRef::book("shelf", isbn(CLEAN_CODE)))
        .unwrap();
    assert_eq!(fields["title"], IndexValue::Text("Clean Code".to_string()));
    assert_eq!(
        fields["author"],
        IndexValue::TextList(vec!["Robert Martin".to_string()])
    );
    assert_eq!(fields["publisher"], IndexValue::Text("Prentice Hall".to_string()));
    assert_eq!(fields["year"], IndexValue::Int(2008));
}

#[test]
fn optional_fields_take_declared_defaults() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);

    let input = FormInput::new()
        .with("isbn", "0-8044-2957-x")
        .with("title", "Hydrology");
    service
        .create_from_form(&Container::folder("shelf"), &input, ContentKind::Book)
        .unwrap();

    let stored = service.get_book("shelf", &isbn("080442957X")).unwrap();
    assert!(stored.author.is_empty());
    assert_eq!(stored.publisher, "");
    assert_eq!(stored.year, 0);
}

#[test]
fn invalid_form_reports_every_field_and_writes_nothing() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    let entries_before = entry_count(&conn);

    let input = FormInput::new()
        .with("isbn", "9780132350885")
        .with("year", "two thousand");
    let err = service
        .create_from_form(&Container::folder("shelf"), &input, ContentKind::Book)
        .unwrap_err();
    match err {
        WorkflowError::Validation(errors) => {
            assert!(errors.has_field("isbn"));
            assert!(errors.has_field("title"));
            assert!(errors.has_field("year"));
            assert_eq!(errors.field_messages()["title"], "Required");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(service.list_books("shelf").unwrap().is_empty());
    assert_eq!(entry_count(&conn), entries_before);
}

#[test]
fn duplicate_key_is_rejected_without_changes() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    service
        .create_from_form(
            &Container::folder("shelf"),
            &book_form(CLEAN_CODE, "Clean Code"),
            ContentKind::Book,
        )
        .unwrap();
    let entries_before = entry_count(&conn);

    let err = service
        .create_from_form(
            &Container::folder("shelf"),
            &book_form("978-0-13-235088-4", "Another Title"),
            ContentKind::Book,
        )
        .unwrap_err();
    match err {
        WorkflowError::DuplicateKey { container, key } => {
            assert_eq!(container, Container::folder("shelf"));
            assert_eq!(key, CLEAN_CODE);
        }
        other => panic!("unexpected error: {other}"),
    }

    let books = service.list_books("shelf").unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].title, "Clean Code");
    assert_eq!(entry_count(&conn), entries_before);

    let err = service
        .create_from_form(
            &Container::Root,
            &folder_form("shelf", "Second Shelf"),
            ContentKind::BookFolder,
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateKey { .. }));
}

#[test]
fn allow_list_is_enforced() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);

    let err = service
        .create_from_form(
            &Container::Root,
            &book_form(CLEAN_CODE, "Clean Code"),
            ContentKind::Book,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::NotAddable {
            container: ContentKind::Root,
            kind: ContentKind::Book
        }
    ));

    let err = service
        .create_from_form(
            &Container::folder("shelf"),
            &folder_form("nested", "Nested"),
            ContentKind::BookFolder,
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotAddable { .. }));
    assert_eq!(service.list_folders().unwrap().len(), 1);
}

#[test]
fn missing_folder_is_reported() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);

    let err = service
        .create_from_form(
            &Container::folder("nowhere"),
            &book_form(CLEAN_CODE, "Clean Code"),
            ContentKind::Book,
        )
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ContainerNotFound(_)));
    assert_eq!(entry_count(&conn), 0);
}

#[test]
fn edit_reindexes_and_locks_identity() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    service
        .create_from_form(
            &Container::folder("shelf"),
            &book_form(CLEAN_CODE, "Clean Code"),
            ContentKind::Book,
        )
        .unwrap();

    let edit = FormInput::new()
        .with("title", "Clean Code, 2nd printing")
        .with_all("author", ["Robert C. Martin"])
        .with("year", "2009");
    let book = service
        .edit_book("shelf", &isbn(CLEAN_CODE), &edit)
        .unwrap();
    assert_eq!(book.year, 2009);
    assert_eq!(book.publisher, "");

    let hits = query_field(&conn, &FieldQuery::text("author", "Robert C. Martin")).unwrap();
    assert_eq!(hits, vec![ResourceRef::book("shelf", isbn(CLEAN_CODE))]);
    assert!(query_field(&conn, &FieldQuery::text("author", "Robert Martin"))
        .unwrap()
        .is_empty());

    let rekey = edit.clone().with("isbn", REFACTORING);
    let err = service
        .edit_book("shelf", &isbn(CLEAN_CODE), &rekey)
        .unwrap_err();
    match err {
        WorkflowError::Validation(errors) => assert!(errors.has_field("isbn")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn renames_move_index_entries() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    for (key, title) in [(CLEAN_CODE, "Clean Code"), (REFACTORING, "Refactoring")] {
        service
            .create_from_form(
                &Container::folder("shelf"),
                &book_form(key, title),
                ContentKind::Book,
            )
            .unwrap();
    }
    let index = IndexMaintainer::new(&conn, &registry);

    let err = service
        .rename_book("shelf", &isbn(CLEAN_CODE), REFACTORING)
        .unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateKey { .. }));
    assert!(index
        .indexed_text(&ResourceRef::book("shelf", isbn(CLEAN_CODE)))
        .unwrap()
        .is_some());

    service
        .rename_book("shelf", &isbn(CLEAN_CODE), "0132350882")
        .unwrap();
    assert!(index
        .indexed_text(&ResourceRef::book("shelf", isbn(CLEAN_CODE)))
        .unwrap()
        .is_none());
    let text = index
        .indexed_text(&ResourceRef::book("shelf", isbn("0132350882")))
        .unwrap()
        .unwrap();
    assert!(text.starts_with("0132350882 Clean Code"));

    service.rename_book_folder("shelf", "library").unwrap();
    let titles = query_field(&conn, &FieldQuery::text("title", "re")).unwrap();
    assert_eq!(
        titles,
        vec![ResourceRef::book("library", isbn(REFACTORING))]
    );
    let old_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM catalog_entries WHERE parent = 'shelf' OR resource_path = '/shelf';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(old_rows, 0);
    assert_eq!(service.list_books("library").unwrap().len(), 2);
}

#[test]
fn removals_leave_no_index_entries() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    for key in [CLEAN_CODE, REFACTORING] {
        service
            .create_from_form(
                &Container::folder("shelf"),
                &book_form(key, "Some Title"),
                ContentKind::Book,
            )
            .unwrap();
    }

    service.remove_book("shelf", &isbn(CLEAN_CODE)).unwrap();
    let err = service.remove_book("shelf", &isbn(CLEAN_CODE)).unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound(_)));
    assert_eq!(
        query_field(&conn, &FieldQuery::text("title", "some")).unwrap(),
        vec![ResourceRef::book("shelf", isbn(REFACTORING))]
    );

    assert_eq!(service.remove_book_folder("shelf").unwrap(), 1);
    assert_eq!(entry_count(&conn), 0);
    let text_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM system_text;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(text_rows, 0);
    assert!(matches!(
        service.list_books("shelf").unwrap_err(),
        WorkflowError::ContainerNotFound(_)
    ));
}

#[test]
fn listings_keep_insertion_order() {
    let (conn, registry) = open_site();
    let service = ContentService::new(&conn, &registry);
    add_shelf(&service);
    for (key, title) in [(REFACTORING, "Refactoring"), (CLEAN_CODE, "Clean Code")] {
        service
            .create_from_form(
                &Container::folder("shelf"),
                &book_form(key, title),
                ContentKind::Book,
            )
            .unwrap();
    }

    let titles = service
        .list_books("shelf")
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Refactoring", "Clean Code"]);
}
