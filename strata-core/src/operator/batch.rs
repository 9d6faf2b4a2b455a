use crate::{
    AccessorConfig, BatchSql, ConnectionHolder, Context, OperationKind, Operator, Params,
    PersistenceError, Result, RowsAffected, StatementContext, Value,
    operator::{Built, Executed, Stage, Statement},
    printable_query,
};
use std::{marker::PhantomData, time::Duration};

/// One statement executed once per parameter set, followed by complete
/// statements without parameters. Effect counts follow that order.
pub struct BatchUpdateOperator<'a, S = Built> {
    statement: Statement,
    holder: ConnectionHolder,
    batch_params: Vec<Params>,
    statements: Vec<String>,
    accessor: AccessorConfig<'a>,
    results: Vec<RowsAffected>,
    _stage: PhantomData<S>,
}

impl<'a> BatchUpdateOperator<'a, Built> {
    /// Batch of `sql`, or of complete statements only when `sql` is `None`.
    pub fn new(sql: Option<String>, holder: ConnectionHolder) -> Self {
        Self {
            statement: Statement::new(sql.unwrap_or_default()),
            holder,
            batch_params: Vec::new(),
            statements: Vec::new(),
            accessor: AccessorConfig::default(),
            results: Vec::new(),
            _stage: PhantomData,
        }
    }

    pub fn from_batch_sql(batch: BatchSql, holder: ConnectionHolder) -> Result<Self> {
        let mut result = Self::new(batch.sql, holder);
        for params in batch.params {
            result = result.add_params(params)?;
        }
        for statement in batch.statements {
            result = result.add_statement(statement);
        }
        Ok(result)
    }

    /// Batches only bind whole parameter sets.
    pub fn param(self, value: impl Into<Value>) -> Result<Self> {
        Err(PersistenceError::configuration(format!(
            "Cannot bind the single parameter {} to a batch, add a parameter set instead",
            value.into()
        )))
    }

    /// One more execution of the batch statement.
    pub fn add_params(mut self, params: Params) -> Result<Self> {
        if self.statement.sql.trim().is_empty() {
            return Err(PersistenceError::configuration(
                "Cannot add a parameter set to a batch without a statement",
            ));
        }
        self.batch_params.push(params);
        Ok(self)
    }

    pub fn add_statement(mut self, statement: impl Into<String>) -> Self {
        self.statements.push(statement.into());
        self
    }

    pub fn accessor(mut self, accessor: AccessorConfig<'a>) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn execute(mut self) -> Result<BatchUpdateOperator<'a, Executed>> {
        let holder = self.holder.clone();
        let keys = &self.accessor.key_request;
        let batch_params = &self.batch_params;
        let statements = &self.statements;
        let results = self
            .statement
            .timed(&holder, |statement| {
                holder.with_connection(|c| {
                    let mut results = if batch_params.is_empty() {
                        Vec::new()
                    } else {
                        c.execute_batch(&statement.sql, batch_params, keys)?
                    };
                    if !statements.is_empty() {
                        results.extend(c.execute_statements(statements)?.into_iter().map(
                            |rows_affected| RowsAffected {
                                rows_affected,
                                ..Default::default()
                            },
                        ));
                    }
                    let counts = results.iter().map(|v| v.rows_affected).collect();
                    Ok((results, counts))
                })
            })
            .with_context(|| {
                format!(
                    "While executing the batch:\n{}",
                    printable_query!(self.statement.sql)
                )
            })?;
        if let Some(after) = self.accessor.after.as_mut() {
            let executed = self.batch_params.len().min(results.len());
            after.after_statement_execution(&StatementContext {
                sql: &self.statement.sql,
                params: &self.batch_params,
                results: &results[..executed],
            })?;
        }
        Ok(BatchUpdateOperator {
            statement: self.statement,
            holder: self.holder,
            batch_params: self.batch_params,
            statements: self.statements,
            accessor: self.accessor,
            results,
            _stage: PhantomData,
        })
    }
}

impl<S> BatchUpdateOperator<'_, S> {
    pub fn batch_params(&self) -> &[Params] {
        &self.batch_params
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl BatchUpdateOperator<'_, Executed> {
    pub fn results(&self) -> &[RowsAffected] {
        &self.results
    }

    pub fn effect_total(&self) -> u64 {
        self.results.iter().map(|v| v.rows_affected).sum()
    }
}

impl<S: Stage> Operator for BatchUpdateOperator<'_, S> {
    fn sql(&self) -> &str {
        &self.statement.sql
    }

    /// Always empty, see [`BatchUpdateOperator::batch_params`].
    fn params(&self) -> &Params {
        &self.statement.params
    }

    fn kind(&self) -> OperationKind {
        OperationKind::BatchUpdate
    }

    fn effect_counts(&self) -> &[u64] {
        &self.statement.effect_counts
    }

    fn expend_time(&self) -> Duration {
        self.statement.expend_time
    }

    fn is_executed(&self) -> bool {
        S::EXECUTED
    }
}
