#[cfg(test)]
mod tests {
    use std::{fs, path::Path, sync::Arc, sync::Mutex};
    use strata_core::{DataSourceConfig, Database, Driver};
    use strata_sqlite::SqliteDriver;
    use strata_tests::{execute_tests, init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn sqlite() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/tests.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH).expect(
                format!("Failed to remove existing test database file {}", DB_PATH).as_str(),
            );
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        let database = Database::default()
            .with_data_source(
                DataSourceConfig::new("default", format!("sqlite://{}", DB_PATH)).dialect("sqlite"),
                Arc::new(SqliteDriver::new()),
            )
            .expect("Could not register the sqlite data source");
        let connection = database
            .default_data_source()
            .and_then(|v| v.connection())
            .expect("Could not open the database");
        drop(connection);
        assert!(
            Path::new(DB_PATH).exists(),
            "Database file should be created after connection"
        );
        execute_tests(&database);
    }

    #[test]
    fn errors_are_reported() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let config = DataSourceConfig::new("memory", "sqlite://memory");
        let mut connection = SqliteDriver::new()
            .connect(&config)
            .expect("Could not open an in memory database");
        silent_logs! {
            let error = connection
                .execute_statements(&["SELECT * FROM missing_table".into()])
                .unwrap_err();
            assert!(format!("{:#}", error).contains("no such table"));
            let error = connection
                .execute_statements(&["SELECT 1; SELECT 2".into()])
                .unwrap_err();
            assert!(format!("{:#}", error).contains("more than one statement"));
        }
        connection.close().expect("Could not close the connection");
        assert!(connection.is_closed());
        assert!(connection.close().is_ok());
    }
}
