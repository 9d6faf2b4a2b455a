#![allow(dead_code)]
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};
use strata::{
    Connection, DataSourceConfig, Database, Driver, Entity, EntityKey, KeyRequest, Params,
    Result, RowLabeled, RowsAffected, Shardable, StatementOptions, Value,
};

#[derive(Entity, Default, Debug, Clone, PartialEq)]
pub struct User {
    #[strata(id, auto_increment)]
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    #[strata(default = "18")]
    pub age: Option<i32>,
}

impl User {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(EntityKey, Default, Debug, Clone, PartialEq)]
pub struct MemberKey {
    pub group_id: i64,
    pub user_id: i64,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table_name = "member")]
pub struct Member {
    #[strata(primary_key)]
    pub key: MemberKey,
    #[strata(default = "guest")]
    pub role: Option<String>,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table_name = "active_user", view)]
pub struct ActiveUser {
    #[strata(id)]
    pub id: i64,
    pub name: String,
}

#[derive(Entity, Default, Debug, Clone, PartialEq)]
#[strata(table_name = "orders", sharding_rule = strata::ModuloShardingRule::new(2))]
pub struct Order {
    #[strata(id)]
    pub id: i64,
    pub total: i64,
}

impl Shardable for Order {
    fn sharding_param(&self) -> Value {
        Value::Int64(Some(self.id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query,
    Execute,
    Batch,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub call: Call,
    pub sql: String,
    pub params: Vec<Params>,
    pub keys: KeyRequest,
}

/// Everything the fake database saw, and the answers it gives.
#[derive(Debug)]
pub struct Journal {
    pub statements: Vec<Recorded>,
    /// Rows returned by the next queries, an empty result once exhausted.
    pub responses: VecDeque<Vec<RowLabeled>>,
    pub next_key: i64,
    /// Inserts still to answer without a generated key.
    pub keyless: usize,
    pub affected: u64,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
    pub connects: usize,
    pub fail_close: bool,
}

impl Default for Journal {
    fn default() -> Self {
        Self {
            statements: Vec::new(),
            responses: VecDeque::new(),
            next_key: 1,
            keyless: 0,
            affected: 1,
            begins: 0,
            commits: 0,
            rollbacks: 0,
            closes: 0,
            connects: 0,
            fail_close: false,
        }
    }
}

impl Journal {
    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(|v| v.sql.as_str()).collect()
    }

    pub fn respond(&mut self, rows: Vec<RowLabeled>) {
        self.responses.push_back(rows);
    }

    pub fn respond_count(&mut self, count: i64) {
        self.respond(vec![row(&["count(*)"], vec![Value::Int64(Some(count))])]);
    }
}

pub fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
    RowLabeled::new(
        labels.iter().map(|v| v.to_string()).collect::<Vec<_>>().into(),
        values.into(),
    )
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    pub journal: Arc<Mutex<Journal>>,
}

impl RecordingDriver {
    pub fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }
}

struct RecordingConnection {
    journal: Arc<Mutex<Journal>>,
    closed: bool,
}

impl RecordingConnection {
    fn result(journal: &mut Journal, sql: &str, keys: &KeyRequest) -> RowsAffected {
        let mut result = RowsAffected {
            rows_affected: journal.affected,
            ..Default::default()
        };
        if !keys.is_none() && sql.starts_with("INSERT") {
            if journal.keyless > 0 {
                journal.keyless -= 1;
            } else {
                result.generated_keys.push(row(
                    &["GENERATED_KEY"],
                    vec![Value::Int64(Some(journal.next_key))],
                ));
                journal.next_key += 1;
            }
        }
        result
    }
}

impl Connection for RecordingConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
        _options: &StatementOptions,
    ) -> Result<Vec<RowLabeled>> {
        let mut journal = self.journal.lock().unwrap();
        journal.statements.push(Recorded {
            call: Call::Query,
            sql: sql.into(),
            params: vec![params.clone()],
            keys: KeyRequest::None,
        });
        Ok(journal.responses.pop_front().unwrap_or_default())
    }

    fn execute(&mut self, sql: &str, params: &Params, keys: &KeyRequest) -> Result<RowsAffected> {
        let mut journal = self.journal.lock().unwrap();
        journal.statements.push(Recorded {
            call: Call::Execute,
            sql: sql.into(),
            params: vec![params.clone()],
            keys: keys.clone(),
        });
        Ok(Self::result(&mut journal, sql, keys))
    }

    fn execute_batch(
        &mut self,
        sql: &str,
        params: &[Params],
        keys: &KeyRequest,
    ) -> Result<Vec<RowsAffected>> {
        let mut journal = self.journal.lock().unwrap();
        journal.statements.push(Recorded {
            call: Call::Batch,
            sql: sql.into(),
            params: params.to_vec(),
            keys: keys.clone(),
        });
        Ok(params
            .iter()
            .map(|_| Self::result(&mut journal, sql, keys))
            .collect())
    }

    fn begin(&mut self) -> Result<()> {
        self.journal.lock().unwrap().begins += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.journal.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.journal.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut journal = self.journal.lock().unwrap();
        journal.closes += 1;
        self.closed = true;
        if journal.fail_close {
            return Err(strata::Error::msg("connection reset by peer"));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn connect(&self, _config: &DataSourceConfig) -> Result<Box<dyn Connection>> {
        self.journal.lock().unwrap().connects += 1;
        Ok(Box::new(RecordingConnection {
            journal: self.journal.clone(),
            closed: false,
        }))
    }
}

/// A database backed by a [`RecordingDriver`] using the dialect of `url`.
pub fn database(url: &str) -> (Database, RecordingDriver) {
    let driver = RecordingDriver::default();
    let database = Database::default()
        .with_data_source(
            DataSourceConfig::new("default", url),
            Arc::new(driver.clone()),
        )
        .expect("The recording data source should register");
    (database, driver)
}
