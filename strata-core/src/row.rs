use crate::{AsValue, Result, Value};
use std::sync::Arc;

pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

/// A row returned by the database together with its column labels.
#[derive(Default, Clone, Debug)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }

    pub fn names(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the column named `name`, labels compare case insensitively.
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Typed value at `index`.
    pub fn get<T: AsValue>(&self, index: usize) -> Result<T> {
        T::try_from_value(self.values.get(index).cloned().unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Outcome of a statement that modifies data.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Rows describing the keys the database generated, empty when it did not
    /// report any.
    pub generated_keys: Vec<RowLabeled>,
}

impl PartialEq for RowLabeled {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels && self.values == other.values
    }
}
