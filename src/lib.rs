//! Relational persistence session engine.
//!
//! Entities are plain structs deriving [`Entity`], sessions render their SQL
//! through the dialect of the data source and run it on a blocking driver.
//!
//! ```rust,ignore
//! use strata::{Database, DataSourceConfig, Entity};
//!
//! #[derive(Entity, Default)]
//! struct User {
//!     #[strata(id, auto_increment)]
//!     id: Option<i64>,
//!     name: String,
//!     email: Option<String>,
//! }
//!
//! let database = Database::default()
//!     .with_data_source(DataSourceConfig::new("default", "sqlite://app.db"), driver)?;
//! database.session(|session| {
//!     let mut user = User { name: "a".into(), ..Default::default() };
//!     session.insert(&mut user, None)?;
//!     Ok(user.id)
//! })?;
//! ```
pub use strata_core::*;
pub use strata_macros::*;
