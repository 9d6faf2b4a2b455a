use crate::{ConnectionHolder, Error, PersistenceError, Result};
use std::cell::RefCell;

#[derive(Default)]
struct Unit {
    level: u32,
    holders: Vec<(String, ConnectionHolder)>,
}

thread_local! {
    static CURRENT: RefCell<Option<Unit>> = const { RefCell::new(None) };
}

/// Ambient unit of work bound to the current thread.
///
/// Holders obtained through [`crate::Database::connection_holder`] while a
/// transaction is active are shared per data source and enlisted: a database
/// transaction is started on each of them and they stay open until the
/// outermost [`Transactions::close`].
///
/// ```rust,ignore
/// Transactions::execute(|| {
///     let session = database.open_session()?;
///     session.insert(&mut order, None)?;
///     Ok(())
/// })?;
/// ```
pub struct Transactions;

impl Transactions {
    /// Start a transaction, or enter one level deeper in the current one.
    pub fn begin() {
        CURRENT.with_borrow_mut(|current| {
            current.get_or_insert_with(Unit::default).level += 1;
        });
    }

    pub fn is_active() -> bool {
        CURRENT.with_borrow(|v| v.is_some())
    }

    /// Nesting depth, 0 outside any transaction.
    pub fn level() -> u32 {
        CURRENT.with_borrow(|v| v.as_ref().map(|u| u.level).unwrap_or_default())
    }

    /// The holder enlisted for `data_source`, if any.
    pub fn holder(data_source: &str) -> Option<ConnectionHolder> {
        CURRENT.with_borrow(|current| {
            current.as_ref().and_then(|unit| {
                unit.holders
                    .iter()
                    .find(|(name, _)| name == data_source)
                    .map(|(_, holder)| holder.clone())
            })
        })
    }

    /// Enlist `holder`, starting a database transaction on it.
    pub(crate) fn register(data_source: &str, holder: &ConnectionHolder) -> Result<()> {
        if !Self::is_active() {
            return Err(PersistenceError::configuration(
                "No transaction is active on the current thread",
            ));
        }
        holder.begin()?;
        CURRENT.with_borrow_mut(|current| {
            if let Some(unit) = current {
                unit.holders.push((data_source.to_owned(), holder.clone()));
            }
        });
        log::debug!("Data source `{}` enlisted in the current transaction", data_source);
        Ok(())
    }

    /// Whether `holder` is enlisted in the current thread's transaction.
    pub fn owns(holder: &ConnectionHolder) -> bool {
        CURRENT.with_borrow(|current| {
            current
                .as_ref()
                .is_some_and(|unit| unit.holders.iter().any(|(_, v)| v.ptr_eq(holder)))
        })
    }

    fn holders() -> Vec<ConnectionHolder> {
        CURRENT.with_borrow(|current| {
            current
                .as_ref()
                .map(|unit| unit.holders.iter().map(|(_, v)| v.clone()).collect())
                .unwrap_or_default()
        })
    }

    /// Commit every enlisted holder. Inner levels leave the work to the outermost one.
    pub fn commit() -> Result<()> {
        match Self::level() {
            0 => Err(PersistenceError::configuration(
                "Cannot commit, no transaction is active on the current thread",
            )),
            1 => {
                for holder in Self::holders() {
                    holder.commit()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Roll back every enlisted holder, at any nesting level.
    pub fn rollback() -> Result<()> {
        if !Self::is_active() {
            return Err(PersistenceError::configuration(
                "Cannot roll back, no transaction is active on the current thread",
            ));
        }
        let mut failure: Option<Error> = None;
        for holder in Self::holders() {
            if let Err(error) = holder.rollback() {
                log::warn!("{:#}", error);
                failure.get_or_insert(error);
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Leave one level. Leaving the outermost level releases every enlisted holder.
    pub fn close() {
        let released = CURRENT.with_borrow_mut(|current| {
            let unit = current.as_mut()?;
            unit.level = unit.level.saturating_sub(1);
            if unit.level > 0 {
                return None;
            }
            current.take()
        });
        if let Some(unit) = released {
            for (_, holder) in unit.holders {
                holder.release();
            }
        }
    }

    /// Run `f` inside a transaction level: commit when it succeeds, roll back when it fails.
    pub fn execute<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
        Self::begin();
        let result = f().and_then(|v| Self::commit().map(|_| v));
        if result.is_err() {
            if let Err(error) = Self::rollback() {
                log::warn!("Rollback failed: {:#}", error);
            }
        }
        Self::close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting() {
        assert!(!Transactions::is_active());
        Transactions::begin();
        Transactions::begin();
        assert_eq!(Transactions::level(), 2);
        assert!(Transactions::commit().is_ok());
        Transactions::close();
        assert_eq!(Transactions::level(), 1);
        Transactions::close();
        assert!(!Transactions::is_active());
        assert!(Transactions::commit().is_err());
    }

    #[test]
    fn execute_closes() {
        let result = Transactions::execute(|| {
            assert_eq!(Transactions::level(), 1);
            Transactions::execute(|| Ok(Transactions::level()))
        });
        assert_eq!(result.unwrap(), 2);
        assert!(!Transactions::is_active());
        let failed = Transactions::execute(|| -> Result<()> { Err(Error::msg("boom")) });
        assert!(failed.is_err());
        assert!(!Transactions::is_active());
    }
}
