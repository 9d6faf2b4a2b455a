use crate::{
    AccessorConfig, ConnectionHolder, Context, OperationKind, Operator, Params, Result,
    RowLabeled, RowsAffected, StatementContext, Value,
    operator::{Built, Executed, Stage, Statement},
    printable_query,
};
use std::{marker::PhantomData, slice, time::Duration};

/// A single INSERT, UPDATE, DELETE or DDL statement.
pub struct UpdateOperator<'a, S = Built> {
    statement: Statement,
    holder: ConnectionHolder,
    accessor: AccessorConfig<'a>,
    result: RowsAffected,
    _stage: PhantomData<S>,
}

impl<'a> UpdateOperator<'a, Built> {
    pub fn new(sql: impl Into<String>, holder: ConnectionHolder) -> Self {
        Self {
            statement: Statement::new(sql),
            holder,
            accessor: AccessorConfig::default(),
            result: RowsAffected::default(),
            _stage: PhantomData,
        }
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.statement.params.add(value);
        self
    }

    pub fn params(mut self, params: &Params) -> Self {
        self.statement.params.add_params(params);
        self
    }

    pub fn accessor(mut self, accessor: AccessorConfig<'a>) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn execute(mut self) -> Result<UpdateOperator<'a, Executed>> {
        let holder = self.holder.clone();
        let keys = &self.accessor.key_request;
        let result = self
            .statement
            .timed(&holder, |statement| {
                let result = holder
                    .with_connection(|c| c.execute(&statement.sql, &statement.params, keys))?;
                let count = result.rows_affected;
                Ok((result, vec![count]))
            })
            .with_context(|| {
                format!(
                    "While executing the statement:\n{}",
                    printable_query!(self.statement.sql)
                )
            })?;
        if let Some(after) = self.accessor.after.as_mut() {
            after.after_statement_execution(&StatementContext {
                sql: &self.statement.sql,
                params: slice::from_ref(&self.statement.params),
                results: slice::from_ref(&result),
            })?;
        }
        Ok(UpdateOperator {
            statement: self.statement,
            holder: self.holder,
            accessor: self.accessor,
            result,
            _stage: PhantomData,
        })
    }
}

impl UpdateOperator<'_, Executed> {
    pub fn effect_count(&self) -> u64 {
        self.result.rows_affected
    }

    pub fn generated_keys(&self) -> &[RowLabeled] {
        &self.result.generated_keys
    }
}

impl<S: Stage> Operator for UpdateOperator<'_, S> {
    fn sql(&self) -> &str {
        &self.statement.sql
    }

    fn params(&self) -> &Params {
        &self.statement.params
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Update
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
