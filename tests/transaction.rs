mod common;

#[cfg(test)]
mod tests {
    use crate::common::{User, database};
    use std::sync::{Arc, Mutex};
    use strata::{
        Error, ErrorKind, OperationKind, Result, SessionEventContext, SessionEventListener,
        Transactions, Where,
    };

    #[test]
    fn sessions_share_the_transaction_connection() {
        let (database, driver) = database("sqlite://memory");
        let result = Transactions::execute(|| {
            let first = database.open_session()?;
            let mut user = User::named("a");
            first.insert(&mut user, None)?;
            first.close();
            let second = database.open_session()?;
            assert!(second.holder().ptr_eq(&database.connection_holder(None)?));
            second.count::<User>(&Where::empty())
        });
        assert_eq!(result.unwrap(), 0);
        let journal = driver.journal();
        assert_eq!(journal.connects, 1);
        assert_eq!(journal.begins, 1);
        assert_eq!(journal.commits, 1);
        assert_eq!(journal.rollbacks, 0);
        assert_eq!(journal.closes, 1);
        assert!(!Transactions::is_active());
    }

    #[test]
    fn failure_rolls_back() {
        let (database, driver) = database("sqlite://memory");
        let result: Result<()> = Transactions::execute(|| {
            database.session(|session| {
                let mut user = User::named("a");
                session.insert(&mut user, None)?;
                Err(Error::msg("UNIQUE constraint failed: user.name"))
            })
        });
        let error = result.unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Execution);
        let journal = driver.journal();
        assert_eq!(journal.commits, 0);
        assert_eq!(journal.rollbacks, 1);
        assert_eq!(journal.closes, 1);
    }

    #[test]
    fn nested_levels_commit_once() {
        let (database, driver) = database("sqlite://memory");
        Transactions::execute(|| {
            database.session(|session| session.execute_for_update(&"DELETE FROM a".into()))?;
            Transactions::execute(|| {
                database.session(|session| session.execute_for_update(&"DELETE FROM b".into()))
            })?;
            assert_eq!(driver.journal().commits, 0);
            Ok(())
        })
        .unwrap();
        let journal = driver.journal();
        assert_eq!(journal.connects, 1);
        assert_eq!(journal.commits, 1);
        assert_eq!(journal.statements.len(), 2);
    }

    #[test]
    fn closing_twice_never_fails() {
        let (database, driver) = database("sqlite://memory");
        driver.journal().fail_close = true;
        let holder = database.connection_holder(None).unwrap();
        holder.close();
        holder.close();
        assert!(holder.is_closed());
        assert_eq!(driver.journal().closes, 1);
        let error = holder.with_connection(|_| Ok(())).unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Execution);
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, hook: &str, context: &SessionEventContext) {
            let operator = context.operator;
            self.events.lock().unwrap().push(format!(
                "{hook} {} {} {:?}",
                context.kind,
                operator.sql(),
                operator.effect_counts()
            ));
        }
    }

    impl SessionEventListener for Recorder {
        fn on_query_before(&self, context: &SessionEventContext) {
            self.record("query_before", context);
        }

        fn on_query_after(&self, context: &SessionEventContext) {
            self.record("query_after", context);
        }

        fn on_update_before(&self, context: &SessionEventContext) {
            self.record("update_before", context);
        }

        fn on_update_after(&self, context: &SessionEventContext) {
            assert!(context.operator.is_executed());
            self.record("update_after", context);
        }
    }

    #[test]
    fn events_surround_each_operator() {
        let (database, _driver) = database("sqlite://memory");
        let recorder = Arc::new(Recorder::default());
        let database = database.listener(recorder.clone());
        let mut users = vec![User::named("a"), User::named("b")];
        database
            .session(|session| {
                session.insert_all(&mut users, None)?;
                session.count::<User>(&Where::empty())
            })
            .unwrap();
        let events = recorder.events.lock().unwrap();
        let insert = r#"INSERT INTO "user" ("name", "email", "age") VALUES (?, ?, ?)"#;
        let count = r#"SELECT count(*) FROM "user""#;
        assert_eq!(
            *events,
            [
                format!("update_before {} {insert} []", OperationKind::BatchUpdate),
                format!("update_after {} {insert} [1, 1]", OperationKind::BatchUpdate),
                format!("query_before {} {count} []", OperationKind::Query),
                format!("query_after {} {count} [0]", OperationKind::Query),
            ]
        );
    }
}
