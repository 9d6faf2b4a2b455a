use crate::error_message_from_ptr;
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    os::raw::{c_char, c_void},
};
use strata_core::{Error, Params, Result, Value, truncate_long};
use time::{format_description::BorrowedFormatItem, macros::format_description};

const TIME: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const TIMESTAMP: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const TIMESTAMP_WITH_TIMEZONE: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
);

fn format_error(error: time::error::Format) -> Error {
    let error = Error::new(error).context("Could not format a time value as a query parameter");
    log::error!("{:#}", error);
    error
}

unsafe fn bind_text(statement: *mut sqlite3_stmt, index: c_int, v: &str) -> c_int {
    unsafe {
        sqlite3_bind_text(
            statement,
            index,
            v.as_ptr() as *const c_char,
            v.len() as c_int,
            SQLITE_TRANSIENT(),
        )
    }
}

/// Binds one value to the 1-based parameter `index`.
pub(crate) fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    unsafe {
        let rc = match value {
            v if v.is_null() => sqlite3_bind_null(statement, index),
            Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, *v),
            Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, *v),
            Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, *v as c_int),
            Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, *v as sqlite3_int64),
            Value::UInt64(Some(v)) => {
                let Ok(v) = sqlite3_int64::try_from(*v) else {
                    let error = Error::msg(format!(
                        "Cannot bind u64 value `{}` into sqlite integer because it's out of bounds",
                        v
                    ));
                    log::error!("{:#}", error);
                    return Err(error);
                };
                sqlite3_bind_int64(statement, index, v)
            }
            Value::Float32(Some(v)) => sqlite3_bind_double(statement, index, *v as f64),
            Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, *v),
            Value::Varchar(Some(v)) => bind_text(statement, index, v),
            Value::Blob(Some(v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            ),
            // Text keeps the full precision, the readers parse it back.
            Value::Decimal(Some(v)) => bind_text(statement, index, &v.to_string()),
            Value::Date(Some(v)) => bind_text(statement, index, &v.to_string()),
            Value::Time(Some(v)) => {
                let v = v.format(TIME).map_err(format_error)?;
                bind_text(statement, index, &v)
            }
            Value::Timestamp(Some(v)) => {
                let v = v.format(TIMESTAMP).map_err(format_error)?;
                bind_text(statement, index, &v)
            }
            Value::TimestampWithTimezone(Some(v)) => {
                let v = v.format(TIMESTAMP_WITH_TIMEZONE).map_err(format_error)?;
                bind_text(statement, index, &v)
            }
            Value::Uuid(Some(v)) => bind_text(statement, index, &v.to_string()),
            _ => {
                let error = Error::msg(format!("Cannot use a {:?} as a query parameter", value));
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        if rc != SQLITE_OK {
            let db = sqlite3_db_handle(statement);
            let query = CStr::from_ptr(sqlite3_sql(statement)).to_string_lossy();
            let error = Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string())
                .context(format!(
                    "Cannot bind parameter {} to query:\n{}",
                    index,
                    truncate_long!(query)
                ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(())
    }
}

/// Clears the previous bindings of `statement` and binds `params` in order.
pub(crate) fn bind_params(statement: *mut sqlite3_stmt, params: &Params) -> Result<()> {
    unsafe {
        sqlite3_reset(statement);
        sqlite3_clear_bindings(statement);
        let expected = sqlite3_bind_parameter_count(statement) as usize;
        if expected != params.len() {
            let error = Error::msg(format!(
                "The statement expects {} parameters but {} were given",
                expected,
                params.len()
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
    }
    for (i, value) in params.values().iter().enumerate() {
        bind_value(statement, i as c_int + 1, value)?;
    }
    Ok(())
}
