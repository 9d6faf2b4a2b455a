mod members;
mod simple;
#[cfg(not(feature = "disable-transactions"))]
mod transaction1;
mod users;

use log::LevelFilter;
use members::members;
use simple::simple;
use std::env;
use strata::Database;
#[cfg(not(feature = "disable-transactions"))]
use transaction1::transaction1;
use users::users;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the whole suite against the default data source of `database`.
pub fn execute_tests(database: &Database) {
    simple(database);
    users(database);
    members(database);
    #[cfg(not(feature = "disable-transactions"))]
    transaction1(database);
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
