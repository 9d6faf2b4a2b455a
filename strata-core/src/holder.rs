use crate::{
    Connection, Context, DataSource, DataSourceConfig, Dialect, Error, PersistenceError, Result,
    Transactions,
};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

struct Holded {
    data_source: Arc<DataSource>,
    connection: Mutex<Option<Box<dyn Connection>>>,
}

/// Handle on one live connection of a data source.
///
/// Clones share the same connection. The connection is released by
/// [`ConnectionHolder::close`] unless the current thread's transaction owns it,
/// in which case the transaction releases it when it ends.
#[derive(Clone)]
pub struct ConnectionHolder {
    inner: Arc<Holded>,
}

impl ConnectionHolder {
    /// Acquire a new connection from `data_source`.
    pub fn new(data_source: Arc<DataSource>) -> Result<Self> {
        let connection = data_source.connection().with_context(|| {
            format!(
                "Cannot acquire a connection from data source `{}`",
                data_source.name()
            )
        })?;
        log::debug!("Connection acquired from data source `{}`", data_source.name());
        Ok(Self {
            inner: Arc::new(Holded {
                data_source,
                connection: Mutex::new(Some(connection)),
            }),
        })
    }

    pub fn data_source(&self) -> &Arc<DataSource> {
        &self.inner.data_source
    }

    pub fn config(&self) -> &DataSourceConfig {
        self.inner.data_source.config()
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.inner.data_source.dialect()
    }

    /// Run `f` on the connection, failing when it was already released.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut dyn Connection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .inner
            .connection
            .lock()
            .map_err(|e| Error::msg(e.to_string()))?;
        match guard.as_mut() {
            Some(connection) if !connection.is_closed() => f(connection.as_mut()),
            _ => Err(PersistenceError::execution(format!(
                "The connection to data source `{}` is closed",
                self.inner.data_source.name()
            ))),
        }
    }

    pub fn begin(&self) -> Result<()> {
        self.with_connection(|c| c.begin())
    }

    pub fn commit(&self) -> Result<()> {
        self.with_connection(|c| c.commit())
    }

    pub fn rollback(&self) -> Result<()> {
        self.with_connection(|c| c.rollback())
    }

    pub fn is_closed(&self) -> bool {
        let guard = self
            .inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().is_none_or(|v| v.is_closed())
    }

    /// Release the connection. Never fails: calling it twice, or on a
    /// connection the database already dropped, does nothing. Holders owned by
    /// the current thread's transaction stay open.
    pub fn close(&self) {
        if Transactions::owns(self) {
            log::debug!(
                "Connection of data source `{}` is kept open by the current transaction",
                self.inner.data_source.name()
            );
            return;
        }
        self.release();
    }

    pub(crate) fn release(&self) {
        let connection = self
            .inner
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut connection) = connection else {
            return;
        };
        if connection.is_closed() {
            return;
        }
        if let Err(error) = connection.close() {
            let error = error.context(PersistenceError::Cleanup(format!(
                "Failed to close a connection of data source `{}`",
                self.inner.data_source.name()
            )));
            log::warn!("{:#}", error);
        }
    }

    pub fn ptr_eq(&self, other: &ConnectionHolder) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ConnectionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHolder")
            .field("data_source", &self.inner.data_source.name())
            .field("closed", &self.is_closed())
            .finish()
    }
}
