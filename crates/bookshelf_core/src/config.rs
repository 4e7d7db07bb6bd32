//! Runtime configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use crate::lookup::open_library::{OpenLibraryFetcher, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::service::site::DEFAULT_SITE_TITLE;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookshelfConfig {
    pub site: SiteConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub lookup: LookupConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_SITE_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("bookshelf.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when absent.
    pub level: Option<String>,
    /// File logging is off when absent.
    pub dir: Option<PathBuf>,
    pub stderr: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
        }
    }
}

impl LookupConfig {
    pub fn fetcher(&self) -> OpenLibraryFetcher {
        OpenLibraryFetcher::new(
            self.base_url.clone(),
            &self.user_agent,
            self.timeout_secs.map(Duration::from_secs),
        )
    }
}

impl BookshelfConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Reads and parses the config file at `path`.
pub fn load_config(path: &Path) -> ConfigResult<BookshelfConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    BookshelfConfig::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::{load_config, BookshelfConfig, ConfigError};
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BookshelfConfig::from_toml_str("").unwrap();
        assert_eq!(config, BookshelfConfig::default());
        assert_eq!(config.site.title, "Simple Book Catalog");
        assert_eq!(config.lookup.base_url, "https://openlibrary.org");
        assert_eq!(config.lookup.timeout_secs, None);
    }

    #[test]
    fn sections_override_selected_fields() {
        let config = BookshelfConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/bookshelf/site.sqlite3"

            [lookup]
            timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/bookshelf/site.sqlite3")
        );
        assert_eq!(config.lookup.timeout_secs, Some(5));
        assert_eq!(config.lookup.base_url, "https://openlibrary.org");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[site]\ntitle = \"Office Library\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.site.title, "Office Library");
    }

    #[test]
    fn reports_missing_file_and_bad_syntax() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let err = BookshelfConfig::from_toml_str("[lookup\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
