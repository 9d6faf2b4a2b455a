use crate::{
    AccessorConfig, BatchSql, BatchUpdateOperator, Cond, ConnectionHolder, Dialect, Entity,
    EntityHandler, EntityId, EntityKeyWriter, EntityMeta, EntityMetaRegistry, EntitySql, Fields,
    Operator, Page, Params, PersistenceError, PropertyMeta, QueryOperator, Result, ResultSet,
    RowHandler, ScalarHandler, SessionEventContext, SessionEventListener, Shardable, ShardingList,
    Sql, StatementOptions, UpdateOperator, Value, Where, check_field,
};
use std::{fmt, sync::Arc};

/// Unit of interaction with one data source.
///
/// A session renders statements through the data source dialect, runs them on
/// its [`ConnectionHolder`] and maps rows back into entities. Closing the
/// session (or dropping it) releases the connection unless the current
/// thread's transaction owns it.
pub struct Session {
    holder: ConnectionHolder,
    registry: Arc<EntityMetaRegistry>,
    listener: Option<Arc<dyn SessionEventListener>>,
}

/// Columns and the properties bound for them, computed from the first entity
/// of an insert.
struct InsertPlan {
    columns: Vec<String>,
    bound: Vec<usize>,
}

impl Session {
    pub fn new(
        holder: ConnectionHolder,
        registry: Arc<EntityMetaRegistry>,
        listener: Option<Arc<dyn SessionEventListener>>,
    ) -> Self {
        Self {
            holder,
            registry,
            listener,
        }
    }

    pub fn holder(&self) -> &ConnectionHolder {
        &self.holder
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        self.holder.dialect()
    }

    pub fn meta<E: Entity>(&self) -> Result<Arc<EntityMeta<E>>> {
        self.registry.load::<E>()
    }

    fn prefix(&self) -> &str {
        &self.holder.config().table_prefix
    }

    /// Release the connection, see [`ConnectionHolder::close`].
    pub fn close(self) {
        self.holder.close();
    }

    fn notify(
        &self,
        operator: &dyn Operator,
        hook: fn(&dyn SessionEventListener, &SessionEventContext),
    ) {
        if let Some(listener) = &self.listener {
            hook(listener.as_ref(), &SessionEventContext::new(operator));
        }
    }

    fn run_query<T>(&self, operator: QueryOperator<'_, T>) -> Result<Vec<T>> {
        self.notify(&operator, |l, c| l.on_query_before(c));
        let operator = operator.execute()?;
        self.notify(&operator, |l, c| l.on_query_after(c));
        Ok(operator.into_rows())
    }

    fn run_update(&self, operator: UpdateOperator<'_>) -> Result<u64> {
        self.notify(&operator, |l, c| l.on_update_before(c));
        let operator = operator.execute()?;
        self.notify(&operator, |l, c| l.on_update_after(c));
        Ok(operator.effect_count())
    }

    fn run_batch(&self, operator: BatchUpdateOperator<'_>) -> Result<Vec<u64>> {
        self.notify(&operator, |l, c| l.on_update_before(c));
        let operator = operator.execute()?;
        self.notify(&operator, |l, c| l.on_update_after(c));
        Ok(operator.effect_counts().to_vec())
    }

    fn entity_query<E: Entity>(
        &self,
        meta: &Arc<EntityMeta<E>>,
        sql: String,
    ) -> QueryOperator<'static, E> {
        QueryOperator::new(sql, self.holder.clone(), EntityHandler::new(meta.clone()))
            .options(StatementOptions::entity())
    }

    /// Every row of `sql`.
    pub fn find<'h, T>(&self, sql: &Sql, handler: impl RowHandler<T> + 'h) -> Result<ResultSet<T>> {
        let operator = QueryOperator::new(sql.sql.clone(), self.holder.clone(), handler)
            .params(&sql.params);
        Ok(ResultSet::of(self.run_query(operator)?))
    }

    /// One page of `sql`. When the page counts the total and there is nothing
    /// to count, the rows are not queried.
    pub fn find_paged<'h, T>(
        &self,
        sql: &Sql,
        handler: impl RowHandler<T> + 'h,
        page: Page,
    ) -> Result<ResultSet<T>> {
        let mut count = 0;
        if page.count() {
            count = self.count_sql(sql)?;
            if count == 0 {
                return Ok(ResultSet::paged(Vec::new(), &page, 0));
            }
        }
        let paged = self
            .dialect()
            .build_paged_query_sql(&sql.sql, page.page(), page.page_size());
        let operator =
            QueryOperator::new(paged, self.holder.clone(), handler).params(&sql.params);
        Ok(ResultSet::paged(self.run_query(operator)?, &page, count))
    }

    pub fn find_first<'h, T>(
        &self,
        sql: &Sql,
        handler: impl RowHandler<T> + 'h,
    ) -> Result<Option<T>> {
        let first = self.dialect().build_paged_query_sql(&sql.sql, 1, 1);
        let operator = QueryOperator::new(first, self.holder.clone(), handler).params(&sql.params);
        Ok(self.run_query(operator)?.into_iter().next())
    }

    /// Condition on the properties of `example` that are neither null nor
    /// equal to their value in `E::default()`.
    fn example_filter<E: Entity>(&self, meta: &EntityMeta<E>, example: &E) -> Where {
        let unset = E::default();
        let mut cond = Cond::create();
        for property in meta.properties() {
            let value = property.get(example);
            if value.is_null() || value == property.get(&unset) {
                continue;
            }
            if !cond.is_empty() {
                cond = cond.and();
            }
            cond = cond
                .eq(&self.dialect().wrap_identifier(property.name()))
                .param(value);
        }
        Where::create(cond)
    }

    /// Entities matching every property set in `example`. Properties holding
    /// null or their default value are not part of the condition.
    pub fn find_by_example<E: Entity>(
        &self,
        example: &E,
        fields: Option<&Fields>,
        page: Option<Page>,
    ) -> Result<ResultSet<E>> {
        let meta = self.meta::<E>()?;
        let mut entity_sql = EntitySql::<E>::create();
        entity_sql.fields = fields.cloned();
        self.find_where(&entity_sql, self.example_filter(&meta, example), page)
    }

    /// Like [`Session::find_by_example`], in the shard named by `example`.
    pub fn find_by_example_sharded<E: Entity + Shardable>(
        &self,
        example: &E,
        fields: Option<&Fields>,
        page: Option<Page>,
    ) -> Result<ResultSet<E>> {
        let meta = self.meta::<E>()?;
        let mut entity_sql = EntitySql::<E>::create().shard(example.sharding_param());
        entity_sql.fields = fields.cloned();
        self.find_where(&entity_sql, self.example_filter(&meta, example), page)
    }

    fn select_sql<E: Entity>(&self, meta: &EntityMeta<E>, entity: &EntitySql<E>) -> Result<String> {
        let columns = select_columns(meta, entity.fields.as_ref())?;
        self.dialect()
            .build_select_sql(meta.table(), self.prefix(), entity.shard.as_ref(), &columns)
    }

    pub fn find_where<E: Entity>(
        &self,
        entity: &EntitySql<E>,
        filter: Where,
        page: Option<Page>,
    ) -> Result<ResultSet<E>> {
        let meta = self.meta::<E>()?;
        let mut sql = self.select_sql(&meta, entity)?;
        sql.push_str(&filter.to_sql());
        let mut count = 0;
        if let Some(page) = &page {
            if page.count() {
                count = self.count_sharded::<E>(&filter, entity.shard.as_ref())?;
                if count == 0 {
                    return Ok(ResultSet::paged(Vec::new(), page, 0));
                }
            }
            sql = self
                .dialect()
                .build_paged_query_sql(&sql, page.page(), page.page_size());
        }
        sql.push_str(&entity.lock_sql());
        let operator = self.entity_query(&meta, sql).params(filter.params());
        let rows = self.run_query(operator)?;
        Ok(match page {
            Some(page) => ResultSet::paged(rows, &page, count),
            None => ResultSet::of(rows),
        })
    }

    pub fn find_first_where<E: Entity>(
        &self,
        entity: &EntitySql<E>,
        filter: Where,
    ) -> Result<Option<E>> {
        let meta = self.meta::<E>()?;
        let mut sql = self.select_sql(&meta, entity)?;
        sql.push_str(&filter.to_sql());
        let mut sql = self.dialect().build_paged_query_sql(&sql, 1, 1);
        sql.push_str(&entity.lock_sql());
        let operator = self.entity_query(&meta, sql).params(filter.params());
        Ok(self.run_query(operator)?.into_iter().next())
    }

    pub fn find_by_id<E: Entity>(&self, entity: &EntitySql<E>, id: &E::Id) -> Result<Option<E>> {
        let meta = self.meta::<E>()?;
        let keys = key_values(&meta, id)?;
        let columns = select_columns(&meta, entity.fields.as_ref())?;
        let mut sql = self.dialect().build_select_by_pk_sql(
            meta.table(),
            self.prefix(),
            entity.shard.as_ref(),
            &[],
            &columns,
        )?;
        sql.push_str(&entity.lock_sql());
        let operator = self.entity_query(&meta, sql).params(&keys);
        Ok(self.run_query(operator)?.into_iter().next())
    }

    fn insert_plan<E: Entity>(
        &self,
        meta: &EntityMeta<E>,
        entity: &E,
        fields: Option<&Fields>,
    ) -> Result<InsertPlan> {
        let mut plan = InsertPlan {
            columns: Vec::new(),
            bound: Vec::new(),
        };
        for (i, property) in meta.properties().iter().enumerate() {
            if !check_field(fields, property.name()) {
                continue;
            }
            if property.column.auto_increment {
                if let Some(sequence) = &property.column.sequence {
                    self.dialect().sequence_next_val_sql(sequence)?;
                    plan.columns.push(property.name().to_owned());
                }
                continue;
            }
            let value = write_value(property, entity)?;
            if !value.is_null() || property.column.nullable {
                plan.columns.push(property.name().to_owned());
                plan.bound.push(i);
            }
        }
        if plan.columns.is_empty() {
            return Err(PersistenceError::mapping(format!(
                "Nothing to insert into `{}`, every column was filtered out",
                meta.table_name()
            )));
        }
        Ok(plan)
    }

    fn insert_params<E: Entity>(
        meta: &EntityMeta<E>,
        plan: &InsertPlan,
        entity: &E,
    ) -> Result<Params> {
        let properties = meta.properties();
        plan.bound
            .iter()
            .map(|i| write_value(&properties[*i], entity))
            .collect()
    }

    fn accessor<'e, E: Entity>(
        &self,
        meta: &Arc<EntityMeta<E>>,
        entities: impl IntoIterator<Item = &'e mut E>,
    ) -> AccessorConfig<'e> {
        let dialect = self.dialect().clone();
        let key_request = EntityKeyWriter::<E>::key_request(meta, dialect.as_ref());
        if key_request.is_none() {
            return AccessorConfig::new();
        }
        AccessorConfig::new()
            .key_request(key_request)
            .after_statement_execution(EntityKeyWriter::new(meta.clone(), dialect, entities))
    }

    fn insert_in<E: Entity>(
        &self,
        entity: &mut E,
        fields: Option<&Fields>,
        shard: Option<&Value>,
    ) -> Result<u64> {
        let meta = self.meta::<E>()?;
        meta.check_mutable()?;
        let plan = self.insert_plan(&meta, entity, fields)?;
        let params = Self::insert_params(&meta, &plan, entity)?;
        let sql = self
            .dialect()
            .build_insert_sql(meta.table(), self.prefix(), shard, &plan.columns)?;
        let operator = UpdateOperator::new(sql, self.holder.clone())
            .params(&params)
            .accessor(self.accessor(&meta, [entity]));
        self.run_update(operator)
    }

    /// Insert `entity`, generated keys are copied back into it. Returns the
    /// number of inserted rows.
    pub fn insert<E: Entity>(&self, entity: &mut E, fields: Option<&Fields>) -> Result<u64> {
        self.insert_in(entity, fields, None)
    }

    /// Insert `entity` into the shard it names.
    pub fn insert_shardable<E: Entity + Shardable>(
        &self,
        entity: &mut E,
        fields: Option<&Fields>,
    ) -> Result<u64> {
        let shard = entity.sharding_param();
        self.insert_in(entity, fields, Some(&shard))
    }

    /// Insert every entity with one batched statement. The columns are decided
    /// by the first entity.
    pub fn insert_all<E: Entity>(
        &self,
        entities: &mut [E],
        fields: Option<&Fields>,
    ) -> Result<Vec<u64>> {
        let meta = self.meta::<E>()?;
        meta.check_mutable()?;
        let Some(first) = entities.first() else {
            return Ok(Vec::new());
        };
        let plan = self.insert_plan(&meta, first, fields)?;
        let sql = self
            .dialect()
            .build_insert_sql(meta.table(), self.prefix(), None, &plan.columns)?;
        let mut operator = BatchUpdateOperator::new(Some(sql), self.holder.clone());
        for entity in entities.iter() {
            operator = operator.add_params(Self::insert_params(&meta, &plan, entity)?)?;
        }
        let operator = operator.accessor(self.accessor(&meta, entities.iter_mut()));
        self.run_batch(operator)
    }

    /// Insert each element into its own shard.
    pub fn insert_sharded<E: Entity>(
        &self,
        entities: &mut ShardingList<E>,
        fields: Option<&Fields>,
    ) -> Result<Vec<u64>> {
        entities
            .iter_mut()
            .map(|v| self.insert_in(&mut v.element, fields, Some(&v.shard)))
            .collect()
    }

    fn update_sql<E: Entity>(
        &self,
        meta: &EntityMeta<E>,
        fields: Option<&Fields>,
        shard: Option<&Value>,
    ) -> Result<(String, Vec<usize>)> {
        let bound = update_properties(meta, fields);
        let columns = bound
            .iter()
            .map(|i| meta.properties()[*i].name().to_owned())
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(PersistenceError::mapping(format!(
                "Nothing to update in `{}`, every column was filtered out",
                meta.table_name()
            )));
        }
        let sql = self
            .dialect()
            .build_update_by_pk_sql(meta.table(), self.prefix(), shard, &[], &columns)?;
        Ok((sql, bound))
    }

    /// Values first, in property order, then the primary key.
    fn update_params<E: Entity>(
        meta: &EntityMeta<E>,
        bound: &[usize],
        entity: &E,
    ) -> Result<Params> {
        let properties = meta.properties();
        let mut params = bound
            .iter()
            .map(|i| write_value(&properties[*i], entity))
            .collect::<Result<Params>>()?;
        params.add_params(&key_values(meta, entity.id())?);
        Ok(params)
    }

    fn update_in<'e, E: Entity>(
        &self,
        entity: &'e E,
        fields: Option<&Fields>,
        shard: Option<&Value>,
    ) -> Result<Option<&'e E>> {
        let meta = self.meta::<E>()?;
        meta.check_mutable()?;
        let (sql, bound) = self.update_sql(&meta, fields, shard)?;
        let params = Self::update_params(&meta, &bound, entity)?;
        let operator = UpdateOperator::new(sql, self.holder.clone()).params(&params);
        Ok((self.run_update(operator)? > 0).then_some(entity))
    }

    /// Update `entity` by primary key, `None` when no row matched.
    pub fn update<'e, E: Entity>(
        &self,
        entity: &'e E,
        fields: Option<&Fields>,
    ) -> Result<Option<&'e E>> {
        self.update_in(entity, fields, None)
    }

    pub fn update_shardable<'e, E: Entity + Shardable>(
        &self,
        entity: &'e E,
        fields: Option<&Fields>,
    ) -> Result<Option<&'e E>> {
        self.update_in(entity, fields, Some(&entity.sharding_param()))
    }

    /// Update every entity with one batched statement.
    pub fn update_all<'e, E: Entity>(
        &self,
        entities: &'e [E],
        fields: Option<&Fields>,
    ) -> Result<&'e [E]> {
        let meta = self.meta::<E>()?;
        meta.check_mutable()?;
        if entities.is_empty() {
            return Ok(entities);
        }
        let (sql, bound) = self.update_sql(&meta, fields, None)?;
        let mut operator = BatchUpdateOperator::new(Some(sql), self.holder.clone());
        for entity in entities {
            operator = operator.add_params(Self::update_params(&meta, &bound, entity)?)?;
        }
        self.run_batch(operator)?;
        Ok(entities)
    }

    /// Update each element in its own shard, returning the ones that matched a row.
    pub fn update_sharded<'e, E: Entity>(
        &self,
        entities: &'e ShardingList<E>,
        fields: Option<&Fields>,
    ) -> Result<Vec<&'e E>> {
        let mut result = Vec::new();
        for element in entities.iter() {
            if let Some(v) = self.update_in(&element.element, fields, Some(&element.shard))? {
                result.push(v);
            }
        }
        Ok(result)
    }

    fn delete_sql<E: Entity>(&self, meta: &EntityMeta<E>, shard: Option<&Value>) -> Result<String> {
        meta.check_mutable()?;
        self.dialect()
            .build_delete_by_pk_sql(meta.table(), self.prefix(), shard, &[])
    }

    fn delete_in<E: Entity>(&self, id: &E::Id, shard: Option<&Value>) -> Result<u64> {
        let meta = self.meta::<E>()?;
        let sql = self.delete_sql(&meta, shard)?;
        let params = key_values(&meta, id)?;
        self.run_update(UpdateOperator::new(sql, self.holder.clone()).params(&params))
    }

    /// Delete `entity` by primary key, `None` when no row matched.
    pub fn delete<'e, E: Entity>(&self, entity: &'e E) -> Result<Option<&'e E>> {
        Ok((self.delete_in::<E>(entity.id(), None)? > 0).then_some(entity))
    }

    /// Delete `entity` from the shard it names.
    pub fn delete_shardable<'e, E: Entity + Shardable>(
        &self,
        entity: &'e E,
    ) -> Result<Option<&'e E>> {
        let shard = entity.sharding_param();
        Ok((self.delete_in::<E>(entity.id(), Some(&shard))? > 0).then_some(entity))
    }

    pub fn delete_by_id<E: Entity>(&self, id: &E::Id) -> Result<u64> {
        self.delete_in::<E>(id, None)
    }

    /// Delete every id with one batched statement, effect counts follow the ids.
    pub fn delete_by_ids<E: Entity>(&self, ids: &[E::Id]) -> Result<Vec<u64>> {
        let meta = self.meta::<E>()?;
        let sql = self.delete_sql(&meta, None)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut operator = BatchUpdateOperator::new(Some(sql), self.holder.clone());
        for id in ids {
            operator = operator.add_params(key_values(&meta, id)?)?;
        }
        self.run_batch(operator)
    }

    /// Delete each id from its own shard, effect counts follow the ids.
    pub fn delete_by_ids_sharded<E: Entity>(&self, ids: &ShardingList<E::Id>) -> Result<Vec<u64>> {
        ids.iter()
            .map(|v| self.delete_in::<E>(&v.element, Some(&v.shard)))
            .collect()
    }

    pub fn delete_all<'e, E: Entity>(&self, entities: &'e [E]) -> Result<&'e [E]> {
        let meta = self.meta::<E>()?;
        let sql = self.delete_sql(&meta, None)?;
        if entities.is_empty() {
            return Ok(entities);
        }
        let mut operator = BatchUpdateOperator::new(Some(sql), self.holder.clone());
        for entity in entities {
            operator = operator.add_params(key_values(&meta, entity.id())?)?;
        }
        self.run_batch(operator)?;
        Ok(entities)
    }

    /// Delete each element from its own shard, returning the ones that matched a row.
    pub fn delete_sharded<'e, E: Entity>(
        &self,
        entities: &'e ShardingList<E>,
    ) -> Result<Vec<&'e E>> {
        let mut result = Vec::new();
        for element in entities.iter() {
            if self.delete_in::<E>(element.element.id(), Some(&element.shard))? > 0 {
                result.push(&element.element);
            }
        }
        Ok(result)
    }

    fn run_count(&self, sql: String, params: &Params) -> Result<u64> {
        let operator = QueryOperator::new(sql, self.holder.clone(), ScalarHandler::<u64>::default())
            .params(params);
        Ok(self.run_query(operator)?.into_iter().next().unwrap_or_default())
    }

    /// Rows of `E` matching `filter`.
    pub fn count<E: Entity>(&self, filter: &Where) -> Result<u64> {
        self.count_sharded::<E>(filter, None)
    }

    pub fn count_sharded<E: Entity>(&self, filter: &Where, shard: Option<&Value>) -> Result<u64> {
        let meta = self.meta::<E>()?;
        let sql = format!(
            "SELECT count(*) FROM {}{}",
            self.dialect()
                .build_table_name(self.prefix(), meta.table(), shard),
            filter.condition_sql()
        );
        self.run_count(sql, filter.params())
    }

    /// Rows returned by `sql`.
    pub fn count_sql(&self, sql: &Sql) -> Result<u64> {
        self.run_count(format!("SELECT count(*) FROM ({}) c_t", sql.sql), &sql.params)
    }

    pub fn execute_for_update(&self, sql: &Sql) -> Result<u64> {
        self.run_update(
            UpdateOperator::new(sql.sql.clone(), self.holder.clone()).params(&sql.params),
        )
    }

    /// Effect counts of the batch statement executions followed by the ones of
    /// the complete statements.
    pub fn execute_batch(&self, batch: BatchSql) -> Result<Vec<u64>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.run_batch(BatchUpdateOperator::from_batch_sql(batch, self.holder.clone())?)
    }

    /// Create the table of `E` when missing.
    pub fn create_table<E: Entity>(&self, shard: Option<&Value>) -> Result<()> {
        let meta = self.meta::<E>()?;
        let sql = self
            .dialect()
            .build_create_sql(meta.table(), self.prefix(), shard)?;
        self.run_update(UpdateOperator::new(sql, self.holder.clone()))
            .map(|_| ())
    }

    pub fn drop_table<E: Entity>(&self, shard: Option<&Value>) -> Result<()> {
        let meta = self.meta::<E>()?;
        let sql = self
            .dialect()
            .build_drop_sql(meta.table(), self.prefix(), shard)?;
        self.run_update(UpdateOperator::new(sql, self.holder.clone()))
            .map(|_| ())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.holder.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("holder", &self.holder)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// The value written for `property`: NULL is replaced by the column default.
fn write_value<E: 'static>(property: &PropertyMeta<E>, entity: &E) -> Result<Value> {
    let value = property.get(entity);
    if value.is_null() {
        if let Some(default) = property.column.default_value()? {
            return Ok(default);
        }
    }
    Ok(value)
}

/// Selected columns: an inclusion filter is taken as is and validated by the
/// dialect, an exclusion filter removes columns from the table ones.
fn select_columns<E: 'static>(
    meta: &EntityMeta<E>,
    fields: Option<&Fields>,
) -> Result<Vec<String>> {
    match fields {
        Some(fields) if !fields.is_empty() && !fields.is_excluded() => Ok(fields.names().to_vec()),
        Some(fields) if !fields.is_empty() => {
            let columns = meta
                .table()
                .column_names()
                .filter(|v| fields.check(v))
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if columns.is_empty() {
                return Err(PersistenceError::mapping(format!(
                    "Every column of `{}` was excluded",
                    meta.table_name()
                )));
            }
            Ok(columns)
        }
        _ => Ok(Vec::new()),
    }
}

/// Indices of the properties written by an update: filtered, not part of the
/// key, not read only.
fn update_properties<E: 'static>(meta: &EntityMeta<E>, fields: Option<&Fields>) -> Vec<usize> {
    meta.properties()
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            check_field(fields, p.name()) && !p.column.primary_key && !p.column.readonly
        })
        .map(|(i, _)| i)
        .collect()
}

/// Parameters matching the primary key columns, in key declaration order.
fn key_values<E: 'static, I: EntityId + ?Sized>(meta: &EntityMeta<E>, id: &I) -> Result<Params> {
    let values = id.id_values();
    let expected = meta.table().primary_keys.len();
    if values.len() != expected {
        return Err(PersistenceError::mapping(format!(
            "`{}` has {} primary key columns but the id provides {} values",
            meta.table_name(),
            expected,
            values.len()
        )));
    }
    Ok(Params::from(values))
}
