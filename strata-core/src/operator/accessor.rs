use crate::{Dialect, EntityMeta, KeyRequest, Params, Result, RowsAffected, StatementOptions};
use std::{fmt, sync::Arc};

/// Statement as seen once it ran.
pub struct StatementContext<'a> {
    pub sql: &'a str,
    /// One parameter set per execution, a single one for plain updates.
    pub params: &'a [Params],
    /// One result per parameter set, in the same order.
    pub results: &'a [RowsAffected],
}

/// Hook run right after a write statement executed successfully.
pub trait AfterExecution {
    fn after_statement_execution(&mut self, context: &StatementContext) -> Result<()>;
}

impl<F> AfterExecution for F
where
    F: FnMut(&StatementContext) -> Result<()>,
{
    fn after_statement_execution(&mut self, context: &StatementContext) -> Result<()> {
        self(context)
    }
}

/// Options of a write statement.
#[derive(Default)]
pub struct AccessorConfig<'a> {
    pub statement_options: StatementOptions,
    pub key_request: KeyRequest,
    pub(crate) after: Option<Box<dyn AfterExecution + 'a>>,
}

impl<'a> AccessorConfig<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn statement_options(mut self, options: StatementOptions) -> Self {
        self.statement_options = options;
        self
    }

    pub fn key_request(mut self, key_request: KeyRequest) -> Self {
        self.key_request = key_request;
        self
    }

    pub fn after_statement_execution(mut self, hook: impl AfterExecution + 'a) -> Self {
        self.after = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for AccessorConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorConfig")
            .field("statement_options", &self.statement_options)
            .field("key_request", &self.key_request)
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Copies the keys generated by an insert back into the inserted entities.
///
/// Each entity takes the key reported by its own statement execution. A field
/// the caller already set keeps its value, an execution reporting no key
/// leaves its entity alone.
pub struct EntityKeyWriter<'e, E> {
    meta: Arc<EntityMeta<E>>,
    dialect: Arc<dyn Dialect>,
    entities: Vec<&'e mut E>,
}

impl<'e, E: 'static> EntityKeyWriter<'e, E> {
    pub fn new(
        meta: Arc<EntityMeta<E>>,
        dialect: Arc<dyn Dialect>,
        entities: impl IntoIterator<Item = &'e mut E>,
    ) -> Self {
        Self {
            meta,
            dialect,
            entities: entities.into_iter().collect(),
        }
    }

    /// The key request matching the dialect capabilities.
    pub fn key_request(meta: &EntityMeta<E>, dialect: &dyn Dialect) -> KeyRequest {
        let columns = meta.table().autoincrement_keys();
        if columns.is_empty() {
            KeyRequest::None
        } else if dialect.supports_return_generated_keys() {
            KeyRequest::Auto
        } else {
            KeyRequest::Columns(columns.into_iter().map(ToOwned::to_owned).collect())
        }
    }
}

impl<E: 'static> AfterExecution for EntityKeyWriter<'_, E> {
    fn after_statement_execution(&mut self, context: &StatementContext) -> Result<()> {
        let columns = self
            .meta
            .table()
            .autoincrement_keys()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Ok(());
        }
        for (entity, result) in self.entities.iter_mut().zip(context.results) {
            let Some(key) = self
                .dialect
                .generated_key(&result.generated_keys, &columns)
                .into_iter()
                .next()
                .filter(|v| !v.is_empty())
            else {
                continue;
            };
            for (column, value) in key {
                let Some(property) = self.meta.property(&column) else {
                    continue;
                };
                if property.get(&**entity).is_null() {
                    property.set(&mut **entity, value)?;
                }
            }
        }
        Ok(())
    }
}
