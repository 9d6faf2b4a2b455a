use crate::{Entity, Fields, Params, Value};
use std::{fmt, marker::PhantomData};

/// Row lock appended to a SELECT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DbLocker {
    ForUpdate,
    ForUpdateNoWait,
    Custom(String),
}

impl DbLocker {
    /// Clause with its leading space.
    pub fn lock_sql(&self) -> String {
        match self {
            DbLocker::ForUpdate => " FOR UPDATE".into(),
            DbLocker::ForUpdateNoWait => " FOR UPDATE NOWAIT".into(),
            DbLocker::Custom(v) => format!(" {}", v.trim()),
        }
    }
}

/// Raw SQL and its parameters.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Sql {
    pub sql: String,
    pub params: Params,
}

impl Sql {
    pub fn create(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Params::create(),
        }
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.add(value);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl From<&str> for Sql {
    fn from(value: &str) -> Self {
        Sql::create(value)
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sql, self.params)
    }
}

/// Batch of writes: one statement executed once per parameter set, a list of
/// complete statements, or both.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct BatchSql {
    pub sql: Option<String>,
    pub params: Vec<Params>,
    pub statements: Vec<String>,
}

impl BatchSql {
    pub fn create() -> Self {
        Default::default()
    }

    pub fn with_sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..Default::default()
        }
    }

    pub fn add_params(mut self, params: Params) -> Self {
        self.params.push(params);
        self
    }

    pub fn add_statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.statements.is_empty()
    }
}

/// Entity targeted query options: column filter, row lock and shard.
pub struct EntitySql<E> {
    pub fields: Option<Fields>,
    pub locker: Option<DbLocker>,
    pub shard: Option<Value>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Default for EntitySql<E> {
    fn default() -> Self {
        Self {
            fields: None,
            locker: None,
            shard: None,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for EntitySql<E> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            locker: self.locker.clone(),
            shard: self.shard.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> fmt::Debug for EntitySql<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySql")
            .field("entity", &std::any::type_name::<E>())
            .field("fields", &self.fields)
            .field("locker", &self.locker)
            .field("shard", &self.shard)
            .finish()
    }
}

impl<E: Entity> EntitySql<E> {
    pub fn create() -> Self {
        Default::default()
    }

    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn for_update(mut self, locker: DbLocker) -> Self {
        self.locker = Some(locker);
        self
    }

    pub fn shard(mut self, shard: impl Into<Value>) -> Self {
        self.shard = Some(shard.into());
        self
    }

    pub fn lock_sql(&self) -> String {
        self.locker
            .as_ref()
            .map(DbLocker::lock_sql)
            .unwrap_or_default()
    }
}
