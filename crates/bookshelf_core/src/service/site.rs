//! Site bootstrap.
//!
//! Run once at startup, and safe to run on every startup: records the site
//! title if none is set and makes sure every catalog exists, backfilling a
//! catalog from stored content when it is first created.

use crate::model::registry::ContentRegistry;
use crate::repo::content_repo::{RepoError, SqliteContentRepository};
use crate::search::catalog::{IndexMaintainer, BOOKS_CATALOG, SYSTEM_CATALOG};
use crate::service::content_service::{WorkflowError, WorkflowResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub const DEFAULT_SITE_TITLE: &str = "Simple Book Catalog";

/// What [`bootstrap_site`] found or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteStatus {
    pub title: String,
    /// Whether this call wrote the title.
    pub title_initialized: bool,
    /// Catalogs created by this call.
    pub catalogs_created: Vec<&'static str>,
}

pub fn bootstrap_site(
    conn: &Connection,
    registry: &ContentRegistry,
    title: &str,
) -> WorkflowResult<SiteStatus> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let status = {
        let repo = SqliteContentRepository::new(&tx);
        let title_initialized = repo.init_site_title(title)?;
        let index = IndexMaintainer::new(&tx, registry);
        let mut catalogs_created = Vec::new();
        for name in [BOOKS_CATALOG, SYSTEM_CATALOG] {
            if index.ensure_catalog(name, true)? {
                catalogs_created.push(name);
            }
        }
        let title = repo.site_title()?.ok_or_else(|| {
            WorkflowError::Repo(RepoError::InvalidData(
                "site title missing after initialization".to_string(),
            ))
        })?;
        SiteStatus {
            title,
            title_initialized,
            catalogs_created,
        }
    };
    tx.commit()?;

    info!(
        "event=site_bootstrap module=site status=ok title_initialized={} catalogs_created={}",
        status.title_initialized,
        status.catalogs_created.join(",")
    );
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::{bootstrap_site, DEFAULT_SITE_TITLE};
    use crate::db::open_db_in_memory;
    use crate::model::registry::ContentRegistry;

    #[test]
    fn bootstrap_is_idempotent() {
        let conn = open_db_in_memory().unwrap();
        let registry = ContentRegistry::standard();

        let first = bootstrap_site(&conn, &registry, DEFAULT_SITE_TITLE).unwrap();
        assert!(first.title_initialized);
        assert_eq!(first.catalogs_created, vec!["books", "system"]);

        let second = bootstrap_site(&conn, &registry, "Another Title").unwrap();
        assert!(!second.title_initialized);
        assert!(second.catalogs_created.is_empty());
        assert_eq!(second.title, DEFAULT_SITE_TITLE);
    }
}
