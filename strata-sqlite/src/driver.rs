use crate::SqliteConnection;
use strata_core::{Connection, DataSourceConfig, Driver, Error, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver {}

impl SqliteDriver {
    pub const NAME: &'static str = "sqlite";

    pub const fn new() -> Self {
        Self {}
    }

    /// The path handed to sqlite for a `sqlite://` url.
    ///
    /// `sqlite://memory` opens an in memory database, a query string turns the
    /// path into a `file:` uri so that options like `mode=rwc` apply.
    pub fn database_path(url: &str) -> Result<String> {
        let url = url.trim();
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        let prefix = format!("{}://", Self::NAME);
        let Some(path) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                &prefix
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let path = urlencoding::decode(path)
            .map_err(Error::new)
            .map_err(|e| e.context(format!("Error while decoding connection URL: `{}`", url)))?
            .into_owned();
        Ok(match path.as_str() {
            "" | "memory" | ":memory:" => ":memory:".into(),
            v if v.contains('?') && !v.starts_with("file:") => format!("file:{}", v),
            v => v.to_owned(),
        })
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn connect(&self, config: &DataSourceConfig) -> Result<Box<dyn Connection>> {
        let path = Self::database_path(&config.connection_url)?;
        log::debug!("Opening sqlite database `{}` for `{}`", path, config.name);
        let mut connection = SqliteConnection::open(&path)?;
        if !config.auto_commit {
            connection.begin()?;
        }
        Ok(Box::new(connection))
    }
}
