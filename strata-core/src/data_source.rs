use crate::{
    Connection, ConnectionHolder, DataSourceConfig, Dialect, Driver, EntityMetaRegistry,
    PersistenceError, Result, Session, SessionEventListener, Transactions, resolve_dialect,
};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// A configured database: settings, the driver opening its connections and
/// the dialect rendering its SQL.
pub struct DataSource {
    config: DataSourceConfig,
    driver: Arc<dyn Driver>,
    dialect: Arc<dyn Dialect>,
}

impl DataSource {
    pub fn new(config: DataSourceConfig, driver: Arc<dyn Driver>) -> Result<Self> {
        config.validate()?;
        let dialect = resolve_dialect(&config)?;
        log::debug!(
            "Data source `{}` uses driver `{}` and dialect `{}`",
            config.name,
            driver.name(),
            dialect.name()
        );
        Ok(Self {
            config,
            driver,
            dialect,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    /// Open a raw connection. Failures are reported to the caller as they are.
    pub fn connection(&self) -> Result<Box<dyn Connection>> {
        self.driver.connect(&self.config)
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("config", &self.config)
            .field("driver", &self.driver.name())
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

/// Persistence state shared by the sessions of an application: entity
/// descriptors, data sources and the optional event listener.
pub struct Database {
    registry: Arc<EntityMetaRegistry>,
    data_sources: BTreeMap<String, Arc<DataSource>>,
    default_name: Option<String>,
    listener: Option<Arc<dyn SessionEventListener>>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new(Arc::new(EntityMetaRegistry::new()))
    }
}

impl Database {
    pub fn new(registry: Arc<EntityMetaRegistry>) -> Self {
        Self {
            registry,
            data_sources: BTreeMap::new(),
            default_name: None,
            listener: None,
        }
    }

    /// Register a data source. The first one registered is the default.
    pub fn add_data_source(
        &mut self,
        config: DataSourceConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<&mut Self> {
        let data_source = DataSource::new(config, driver)?;
        let name = data_source.name().to_owned();
        if self.data_sources.contains_key(&name) {
            return Err(PersistenceError::configuration(format!(
                "Data source `{name}` is already registered"
            )));
        }
        self.default_name.get_or_insert_with(|| name.clone());
        self.data_sources.insert(name, Arc::new(data_source));
        Ok(self)
    }

    pub fn with_data_source(
        mut self,
        config: DataSourceConfig,
        driver: Arc<dyn Driver>,
    ) -> Result<Self> {
        self.add_data_source(config, driver)?;
        Ok(self)
    }

    pub fn default_data_source_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn listener(mut self, listener: Arc<dyn SessionEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn registry(&self) -> &Arc<EntityMetaRegistry> {
        &self.registry
    }

    pub fn event_listener(&self) -> Option<&Arc<dyn SessionEventListener>> {
        self.listener.as_ref()
    }

    pub fn data_source(&self, name: &str) -> Result<&Arc<DataSource>> {
        self.data_sources.get(name).ok_or_else(|| {
            PersistenceError::configuration(format!("Data source `{name}` is not registered"))
        })
    }

    pub fn default_data_source(&self) -> Result<&Arc<DataSource>> {
        let Some(name) = &self.default_name else {
            return Err(PersistenceError::configuration(
                "No data source is registered",
            ));
        };
        self.data_source(name)
    }

    /// A holder on `name`, or on the default data source. Inside a transaction
    /// the holder already enlisted for the data source is reused, a new one is
    /// enlisted otherwise.
    pub fn connection_holder(&self, name: Option<&str>) -> Result<ConnectionHolder> {
        let data_source = match name {
            Some(name) => self.data_source(name)?,
            None => self.default_data_source()?,
        };
        if !Transactions::is_active() {
            return ConnectionHolder::new(data_source.clone());
        }
        if let Some(holder) = Transactions::holder(data_source.name()) {
            return Ok(holder);
        }
        let holder = ConnectionHolder::new(data_source.clone())?;
        if let Err(error) = Transactions::register(data_source.name(), &holder) {
            holder.release();
            return Err(error);
        }
        Ok(holder)
    }

    /// Session on the default data source.
    pub fn open_session(&self) -> Result<Session> {
        self.open_session_on(None)
    }

    pub fn open_session_on(&self, name: Option<&str>) -> Result<Session> {
        let holder = self.connection_holder(name)?;
        Ok(Session::new(holder, self.registry.clone(), self.listener.clone()))
    }

    /// Run `f` with a session that is closed afterwards.
    pub fn session<T>(&self, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        let session = self.open_session()?;
        let result = f(&session);
        session.close();
        result
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("data_sources", &self.data_sources)
            .field("default_name", &self.default_name)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
