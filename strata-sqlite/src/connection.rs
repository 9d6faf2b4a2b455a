use crate::{
    CBox,
    bind::bind_params,
    error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use libsqlite3_sys::{
    SQLITE_BUSY, SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_busy_timeout, sqlite3_close, sqlite3_column_count,
    sqlite3_errmsg, sqlite3_finalize, sqlite3_last_insert_rowid, sqlite3_open_v2,
    sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt, sqlite3_total_changes,
};
use std::{
    ffi::{CStr, CString, c_int},
    ptr,
    sync::Arc,
};
use strata_core::{
    Connection, Error, KeyRequest, Params, Result, RowLabeled, RowsAffected, StatementOptions,
    Value, printable_query,
};

/// Label of the row reporting the rowid of an insert.
pub const GENERATED_KEY: &str = "GENERATED_KEY";

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
    pub(crate) transaction: bool,
}

impl SqliteConnection {
    /// Opens `path`, either a file name, `:memory:` or a `file:` uri.
    pub fn open(path: &str) -> Result<Self> {
        let context = || format!("While opening the sqlite database `{}`", path);
        let path = match CString::new(path) {
            Ok(v) => v,
            Err(e) => {
                let error = Error::new(e).context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        unsafe {
            let rc = sqlite3_open_v2(
                path.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                let message = if connection.is_null() {
                    "Out of memory".to_string()
                } else {
                    error_message_from_ptr(&sqlite3_errmsg(*connection)).to_string()
                };
                let error = Error::msg(message).context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        Ok(Self {
            connection,
            transaction: false,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.connection.is_null() {
            let error = Error::msg("The sqlite connection is closed");
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }

    fn error(&self, context: String) -> Error {
        let message = unsafe { sqlite3_errmsg(*self.connection) };
        let error = Error::msg(error_message_from_ptr(&message).to_string()).context(context);
        log::error!("{:#}", error);
        error
    }

    pub(crate) fn prepare(&mut self, sql: &str) -> Result<CBox<*mut sqlite3_stmt>> {
        self.check_open()?;
        let context = || format!("While preparing the query:\n{}", printable_query!(sql));
        let query = match CString::new(sql.as_bytes()) {
            Ok(query) => query,
            Err(e) => {
                let error =
                    Error::new(e).context("Could not create a CString from the query String");
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(
                *self.connection,
                query.as_ptr(),
                sql.len() as c_int,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            return Err(self.error(context()));
        }
        if !tail.is_null() && unsafe { *tail } != 0 {
            let remaining = unsafe { CStr::from_ptr(tail) }.to_string_lossy();
            if !remaining.trim().is_empty() {
                let error = Error::msg("Cannot prepare more than one statement at a time")
                    .context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
        }
        if statement.is_null() {
            let error = Error::msg("The query does not contain any statement").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(statement)
    }

    /// Steps `statement` to completion, collecting at most `max_rows` rows when non zero.
    pub(crate) fn run_prepared(
        &mut self,
        statement: &CBox<*mut sqlite3_stmt>,
        sql: &str,
        max_rows: u32,
    ) -> Result<Vec<RowLabeled>> {
        let statement = **statement;
        let count = unsafe { sqlite3_column_count(statement) };
        let labels = (0..count)
            .map(|i| extract_name(statement, i))
            .collect::<Result<Arc<[_]>>>()?;
        let mut rows = Vec::new();
        loop {
            match unsafe { sqlite3_step(statement) } {
                SQLITE_BUSY => {
                    continue;
                }
                SQLITE_DONE => {
                    break;
                }
                SQLITE_ROW => {
                    if max_rows > 0 && rows.len() >= max_rows as usize {
                        break;
                    }
                    rows.push(RowLabeled {
                        labels: labels.clone(),
                        values: (0..count)
                            .map(|i| extract_value(statement, i))
                            .collect::<Result<_>>()?,
                    });
                }
                _ => {
                    return Err(self.error(format!(
                        "While executing the query:\n{}",
                        printable_query!(sql)
                    )));
                }
            }
        }
        Ok(rows)
    }

    fn run_plain(&mut self, sql: &str) -> Result<()> {
        let statement = self.prepare(sql)?;
        self.run_prepared(&statement, sql, 0).map(|_| ())
    }

    fn total_changes(&self) -> u64 {
        unsafe { sqlite3_total_changes(*self.connection) as u64 }
    }

    fn write(
        &mut self,
        statement: &CBox<*mut sqlite3_stmt>,
        sql: &str,
        params: &Params,
        keys: &KeyRequest,
    ) -> Result<RowsAffected> {
        bind_params(**statement, params)?;
        let before = self.total_changes();
        self.run_prepared(statement, sql, 0)?;
        let mut result = RowsAffected {
            rows_affected: self.total_changes().saturating_sub(before),
            ..Default::default()
        };
        if !keys.is_none() && result.rows_affected > 0 && is_insert(sql) {
            let rowid = unsafe { sqlite3_last_insert_rowid(*self.connection) };
            result.generated_keys.push(RowLabeled::new(
                [GENERATED_KEY.to_string()].into(),
                [Value::Int64(Some(rowid))].into(),
            ));
        }
        Ok(result)
    }
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|v| v.eq_ignore_ascii_case("INSERT"))
}

impl Connection for SqliteConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
        options: &StatementOptions,
    ) -> Result<Vec<RowLabeled>> {
        let statement = self.prepare(sql)?;
        if let Some(timeout) = options.query_timeout {
            unsafe {
                sqlite3_busy_timeout(*self.connection, timeout.as_millis() as c_int);
            }
        }
        bind_params(*statement, params)?;
        self.run_prepared(&statement, sql, options.max_rows)
    }

    fn execute(&mut self, sql: &str, params: &Params, keys: &KeyRequest) -> Result<RowsAffected> {
        let statement = self.prepare(sql)?;
        self.write(&statement, sql, params, keys)
    }

    /// Prepares `sql` once and runs it for every parameter set.
    fn execute_batch(
        &mut self,
        sql: &str,
        params: &[Params],
        keys: &KeyRequest,
    ) -> Result<Vec<RowsAffected>> {
        let statement = self.prepare(sql)?;
        params
            .iter()
            .map(|v| self.write(&statement, sql, v, keys))
            .collect()
    }

    fn begin(&mut self) -> Result<()> {
        self.run_plain("BEGIN")?;
        self.transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.run_plain("COMMIT")?;
        self.transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.run_plain("ROLLBACK")?;
        self.transaction = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.connection.is_null() {
            return Ok(());
        }
        if self.transaction {
            log::warn!("Closing a sqlite connection with an open transaction, rolling it back");
            self.rollback()?;
        }
        let connection = std::mem::replace(&mut self.connection.ptr, ptr::null_mut());
        let rc = unsafe { sqlite3_close(connection) };
        if rc != SQLITE_OK {
            let error = Error::msg(format!("Could not close the sqlite connection (code {})", rc));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.connection.is_null()
    }
}
