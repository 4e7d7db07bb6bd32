//! Bookshelf admin command line.
//!
//! Each command opens the configured catalog, runs the site bootstrap and
//! drives one `bookshelf_core` service call, printing the status message and
//! redirect an admin UI would show.

use anyhow::{bail, Context, Result};
use bookshelf_core::model::book::{FIELD_AUTHOR, FIELD_ISBN, FIELD_PUBLISHER, FIELD_TITLE, FIELD_YEAR};
use bookshelf_core::model::folder::FIELD_NAME;
use bookshelf_core::{
    bootstrap_site, init_logging_from, load_config, open_db, query_field, search_text,
    BookshelfConfig, ContentKind, ContentRegistry, ContentService, Container, FieldQuery,
    FormInput, IndexMaintainer, IndexValue, Isbn, IsbnSubmission, SiteStatus, TextQuery,
    WorkflowError,
};
use clap::{Parser, Subcommand};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bookshelf", version, about = "Simple book catalog admin")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides `database.path` from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog database and register catalogs.
    Init,

    /// Add a book folder under the site root.
    AddFolder {
        name: String,
        #[arg(long)]
        title: String,
    },

    /// Add a book from explicit field values.
    AddBook {
        folder: String,
        #[arg(long)]
        isbn: String,
        #[arg(long)]
        title: String,
        /// Repeat for several authors, in order.
        #[arg(long)]
        author: Vec<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },

    /// Add a book from metadata fetched for an ISBN.
    AddIsbn { folder: String, isbn: String },

    /// Change a book's attributes; omitted options keep their values.
    EditBook {
        folder: String,
        isbn: String,
        #[arg(long)]
        title: Option<String>,
        /// Replaces the whole author list when given.
        #[arg(long)]
        author: Vec<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        year: Option<String>,
    },

    /// Change a book's ISBN key.
    RenameBook {
        folder: String,
        from: String,
        to: String,
    },

    /// Change a folder's name.
    RenameFolder { from: String, to: String },

    RemoveBook { folder: String, isbn: String },

    /// Remove a folder and every book in it.
    RemoveFolder { name: String },

    /// List folders, or the books of one folder.
    List { folder: Option<String> },

    /// Show what can be added at the site root or inside a folder.
    AddViews { folder: Option<String> },

    /// Show one book.
    Show { folder: String, isbn: String },

    /// Free-text search over every book field.
    Search {
        text: String,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Query one index of the books catalog (title, author, publisher, year).
    Find {
        field: String,
        value: String,
        #[arg(long)]
        folder: Option<String>,
    },

    /// Rebuild every catalog from stored content.
    Reindex,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => BookshelfConfig::default(),
    };
    init_logging_from(
        config.logging.level.as_deref(),
        config.logging.dir.as_deref(),
        config.logging.stderr,
    )
    .context("failed to initialize logging")?;

    let db_path = cli.db.clone().unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open catalog `{}`", db_path.display()))?;
    let registry = ContentRegistry::standard();
    let site = bootstrap_site(&conn, &registry, &config.site.title)?;
    info!(
        "event=cli_start module=cli status=ok db={} site_title={}",
        db_path.display(),
        site.title
    );

    match run(cli.command, &conn, &registry, &config, &site) {
        Err(err) => match err.downcast_ref::<WorkflowError>() {
            Some(WorkflowError::Validation(errors)) => {
                for (field, message) in errors.field_messages() {
                    eprintln!("{field}: {message}");
                }
                bail!("submission rejected")
            }
            _ => Err(err),
        },
        ok => ok,
    }
}

fn run(
    command: Commands,
    conn: &Connection,
    registry: &ContentRegistry,
    config: &BookshelfConfig,
    site: &SiteStatus,
) -> Result<()> {
    let service = ContentService::new(conn, registry);

    match command {
        Commands::Init => {
            println!("site: {}", site.title);
            if site.catalogs_created.is_empty() {
                println!("catalogs already registered");
            } else {
                println!("created catalogs: {}", site.catalogs_created.join(", "));
            }
        }
        Commands::AddFolder { name, title } => {
            let input = FormInput::new()
                .with(FIELD_NAME, name)
                .with(FIELD_TITLE, title);
            let created = service.create_from_form(
                &Container::Root,
                &input,
                ContentKind::BookFolder,
            )?;
            println!("{}", created.status);
            println!("-> {}", created.redirect);
        }
        Commands::AddBook {
            folder,
            isbn,
            title,
            author,
            publisher,
            year,
        } => {
            let mut input = FormInput::new()
                .with(FIELD_ISBN, isbn)
                .with(FIELD_TITLE, title)
                .with_all(FIELD_AUTHOR, author);
            if let Some(publisher) = publisher {
                input.push(FIELD_PUBLISHER, publisher);
            }
            if let Some(year) = year {
                input.push(FIELD_YEAR, year);
            }
            let created =
                service.create_from_form(&Container::folder(folder), &input, ContentKind::Book)?;
            println!("{}", created.status);
            println!("-> {}", created.redirect);
        }
        Commands::AddIsbn { folder, isbn } => {
            let fetcher = config.lookup.fetcher();
            match service.create_from_isbn(&Container::folder(folder), &isbn, &fetcher)? {
                IsbnSubmission::Empty => {}
                IsbnSubmission::Completed(import) => {
                    println!("{}", import.status);
                    println!("-> {}", import.redirect);
                }
            }
        }
        Commands::EditBook {
            folder,
            isbn,
            title,
            author,
            publisher,
            year,
        } => {
            let isbn = parse_isbn(&isbn)?;
            let current = service.get_book(&folder, &isbn)?;
            let authors = if author.is_empty() {
                current.author
            } else {
                author
            };
            let input = FormInput::new()
                .with(FIELD_TITLE, title.unwrap_or(current.title))
                .with_all(FIELD_AUTHOR, authors)
                .with(FIELD_PUBLISHER, publisher.unwrap_or(current.publisher))
                .with(FIELD_YEAR, year.unwrap_or_else(|| current.year.to_string()));
            let book = service.edit_book(&folder, &isbn, &input)?;
            println!("updated /{folder}/{}", book.isbn);
        }
        Commands::RenameBook { folder, from, to } => {
            let from = parse_isbn(&from)?;
            let book = service.rename_book(&folder, &from, &to)?;
            println!("renamed /{folder}/{from} -> /{folder}/{}", book.isbn);
        }
        Commands::RenameFolder { from, to } => {
            let folder = service.rename_book_folder(&from, &to)?;
            println!("renamed /{from} -> /{}", folder.name);
        }
        Commands::RemoveBook { folder, isbn } => {
            let isbn = parse_isbn(&isbn)?;
            service.remove_book(&folder, &isbn)?;
            println!("removed /{folder}/{isbn}");
        }
        Commands::RemoveFolder { name } => {
            let books = service.remove_book_folder(&name)?;
            println!("removed /{name} ({books} books)");
        }
        Commands::List { folder: None } => {
            for folder in service.list_folders()? {
                println!("{}\t{}", folder.name, folder.title);
            }
        }
        Commands::List {
            folder: Some(folder),
        } => {
            println!("ISBN\tTitle\tAuthor\tPublisher\tYear");
            for book in service.list_books(&folder)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    book.isbn,
                    book.title,
                    book.author.join(", "),
                    book.publisher,
                    book.year
                );
            }
        }
        Commands::AddViews { folder } => {
            let container = match folder {
                Some(name) => {
                    service.get_folder(&name)?;
                    ContentKind::BookFolder
                }
                None => ContentKind::Root,
            };
            for entry in registry.add_views(container) {
                println!(
                    "{}\t{}\tkey={}",
                    entry.add_view.unwrap_or_default(),
                    entry.kind,
                    entry.identity_field.unwrap_or("-")
                );
            }
        }
        Commands::Show { folder, isbn } => {
            let book = service.get_book(&folder, &parse_isbn(&isbn)?)?;
            println!("ISBN:      {}", book.isbn);
            println!("Title:     {}", book.title);
            println!("Author:    {}", book.author.join(", "));
            println!("Publisher: {}", book.publisher);
            println!("Year:      {}", book.year);
        }
        Commands::Search {
            text,
            folder,
            limit,
        } => {
            let mut query = TextQuery::new(text);
            query.within = folder;
            query.limit = limit;
            for hit in search_text(conn, &query)? {
                println!("{}\t{}", hit.resource, hit.snippet);
            }
        }
        Commands::Find {
            field,
            value,
            folder,
        } => {
            let value = if field == FIELD_YEAR {
                IndexValue::Int(
                    value
                        .trim()
                        .parse()
                        .with_context(|| format!("year must be a number, got `{value}`"))?,
                )
            } else {
                IndexValue::Text(value)
            };
            let mut query = FieldQuery::new(field, value);
            query.within = folder;
            for resource in query_field(conn, &query)? {
                println!("{resource}");
            }
        }
        Commands::Reindex => {
            let count = IndexMaintainer::new(conn, registry).reindex_all()?;
            println!("reindexed {count} resources");
        }
    }
    Ok(())
}

fn parse_isbn(raw: &str) -> Result<Isbn> {
    Isbn::parse(raw).with_context(|| format!("not a valid ISBN: {raw}"))
}
