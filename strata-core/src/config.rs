use crate::{Context, PersistenceError, Result};
use url::Url;

pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Settings of one data source.
#[derive(Clone, Debug, PartialEq)]
pub struct DataSourceConfig {
    pub name: String,
    pub connection_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Prepended to every table name.
    pub table_prefix: String,
    /// Log every executed statement at info level.
    pub show_sql: bool,
    /// Overrides the dialect quote: one character for both sides or a begin/end pair.
    pub identifier_quote: Option<String>,
    /// Explicit dialect name, inferred from the url scheme when missing.
    pub dialect: Option<String>,
    pub auto_commit: bool,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DATA_SOURCE.into(),
            connection_url: String::new(),
            username: None,
            password: None,
            table_prefix: String::new(),
            show_sql: false,
            identifier_quote: None,
            dialect: None,
            auto_commit: true,
        }
    }
}

impl DataSourceConfig {
    pub fn new(name: impl Into<String>, connection_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_url: connection_url.into(),
            ..Default::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into().trim().to_owned();
        self
    }

    pub fn show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    pub fn identifier_quote(mut self, quote: impl Into<String>) -> Self {
        self.identifier_quote = Some(quote.into());
        self
    }

    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PersistenceError::configuration(
                "A data source must have a name",
            ));
        }
        if self.connection_url.trim().is_empty() {
            return Err(PersistenceError::configuration(format!(
                "Data source `{}` does not declare a connection url",
                self.name
            )));
        }
        // file based databases take no credentials
        let username = self.username.as_deref().is_some_and(|v| !v.trim().is_empty());
        if let Ok(url) = self.url() {
            if url.scheme() != "sqlite" && url.username().is_empty() && !username {
                return Err(PersistenceError::configuration(format!(
                    "Data source `{}` does not declare a username",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn url(&self) -> Result<Url> {
        let url = self.connection_url.trim();
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        Url::parse(url)
            .map_err(|e| PersistenceError::configuration(e.to_string()))
            .with_context(|| {
                format!(
                    "Cannot read the scheme of the url `{}` of data source `{}`",
                    self.connection_url, self.name
                )
            })
    }

    /// Lowercase scheme of the connection url, a leading `jdbc:` is ignored.
    pub fn scheme(&self) -> Result<String> {
        Ok(self.url()?.scheme().to_owned())
    }
}
