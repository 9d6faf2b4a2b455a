use crate::{
    ConnectionHolder, Context, OperationKind, Operator, Params, Result, RowHandler,
    StatementOptions, Value,
    operator::{Built, Executed, Stage, Statement},
    printable_query,
};
use std::{marker::PhantomData, time::Duration};

/// A SELECT and the handler turning its rows into `T`.
pub struct QueryOperator<'h, T, S = Built> {
    statement: Statement,
    holder: ConnectionHolder,
    handler: Box<dyn RowHandler<T> + 'h>,
    options: StatementOptions,
    rows: Vec<T>,
    _stage: PhantomData<S>,
}

impl<'h, T> QueryOperator<'h, T, Built> {
    pub fn new(
        sql: impl Into<String>,
        holder: ConnectionHolder,
        handler: impl RowHandler<T> + 'h,
    ) -> Self {
        Self {
            statement: Statement::new(sql),
            holder,
            handler: Box::new(handler),
            options: StatementOptions::default(),
            rows: Vec::new(),
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

    pub fn options(mut self, options: StatementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn execute(mut self) -> Result<QueryOperator<'h, T, Executed>> {
        let holder = self.holder.clone();
        let handler = &self.handler;
        let options = self.options;
        let rows = self
            .statement
            .timed(&holder, |statement| {
                let rows = holder
                    .with_connection(|c| c.query(&statement.sql, &statement.params, &options))?
                    .iter()
                    .map(|row| handler.handle(row))
                    .collect::<Result<Vec<_>>>()?;
                let count = rows.len() as u64;
                Ok((rows, vec![count]))
            })
            .with_context(|| {
                format!(
                    "While executing the query:\n{}",
                    printable_query!(self.statement.sql)
                )
            })?;
        Ok(QueryOperator {
            statement: self.statement,
            holder: self.holder,
            handler: self.handler,
            options: self.options,
            rows,
            _stage: PhantomData,
        })
    }
}

impl<T> QueryOperator<'_, T, Executed> {
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

impl<T, S: Stage> Operator for QueryOperator<'_, T, S> {
    fn sql(&self) -> &str {
        &self.statement.sql
    }

    fn params(&self) -> &Params {
        &self.statement.params
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Query
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
