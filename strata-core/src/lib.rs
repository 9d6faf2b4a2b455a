mod as_value;
mod condition;
mod config;
mod connection;
mod data_source;
mod dialect;
mod entity;
mod entity_meta;
mod error;
mod event;
mod fields;
mod holder;
mod operator;
mod page;
mod params;
mod registry;
mod row;
mod session;
mod sharding;
mod sql;
mod transaction;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use condition::*;
pub use config::*;
pub use connection::*;
pub use data_source::*;
pub use dialect::*;
pub use entity::*;
pub use entity_meta::*;
pub use error::*;
pub use event::*;
pub use fields::*;
pub use holder::*;
pub use operator::*;
pub use page::*;
pub use params::*;
pub use registry::*;
pub use row::*;
pub use session::*;
pub use sharding::*;
pub use sql::*;
pub use transaction::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
