use crate::{DataSourceConfig, Params, Result, RowLabeled, RowsAffected};
use std::{fmt::Debug, time::Duration};

pub const DEFAULT_FETCH_SIZE: u32 = 10000;
pub const DEFAULT_MAX_ROWS: u32 = 1000;

/// Per statement hints forwarded to the driver. Zero means "driver default".
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatementOptions {
    pub fetch_size: u32,
    pub max_rows: u32,
    pub query_timeout: Option<Duration>,
}

impl StatementOptions {
    /// Options used by entity queries.
    pub fn entity() -> Self {
        Self {
            fetch_size: DEFAULT_FETCH_SIZE,
            max_rows: DEFAULT_MAX_ROWS,
            query_timeout: None,
        }
    }

    pub fn fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    pub fn max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

/// Which generated keys a write should report back.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub enum KeyRequest {
    #[default]
    None,
    /// Whatever the database reports for the statement.
    Auto,
    /// The named columns, for databases that need to be told.
    Columns(Vec<String>),
}

impl KeyRequest {
    pub fn is_none(&self) -> bool {
        *self == KeyRequest::None
    }
}

/// A raw database connection, implemented by drivers.
///
/// Every method blocks the calling thread until the database answers.
pub trait Connection: Send {
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
        options: &StatementOptions,
    ) -> Result<Vec<RowLabeled>>;

    fn execute(&mut self, sql: &str, params: &Params, keys: &KeyRequest) -> Result<RowsAffected>;

    /// Execute `sql` once per parameter set, results follow the input order.
    fn execute_batch(
        &mut self,
        sql: &str,
        params: &[Params],
        keys: &KeyRequest,
    ) -> Result<Vec<RowsAffected>> {
        params
            .iter()
            .map(|v| self.execute(sql, v, keys))
            .collect()
    }

    /// Execute complete statements without parameters, returning each effect count.
    fn execute_statements(&mut self, statements: &[String]) -> Result<Vec<u64>> {
        let params = Params::create();
        statements
            .iter()
            .map(|v| {
                self.execute(v, &params, &KeyRequest::None)
                    .map(|r| r.rows_affected)
            })
            .collect()
    }

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Opens raw connections for a data source.
pub trait Driver: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn connect(&self, config: &DataSourceConfig) -> Result<Box<dyn Connection>>;
}
