use crate::{ColumnMeta, Dialect, IdentifierQuote, Value};

#[derive(Clone, Debug)]
pub struct SqliteDialect {
    quote: IdentifierQuote,
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SqliteDialect {
    pub fn new(quote: Option<IdentifierQuote>) -> Self {
        Self {
            quote: quote.unwrap_or_else(|| IdentifierQuote::new("\"", "\"")),
        }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn identifier_quote(&self) -> &IdentifierQuote {
        &self.quote
    }

    fn column_type(&self, column: &ColumnMeta) -> String {
        match &column.value {
            Value::Boolean(..)
            | Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => "INTEGER",
            Value::Float32(..) | Value::Float64(..) => "REAL",
            Value::Blob(..) => "BLOB",
            _ => "TEXT",
        }
        .into()
    }

    fn write_autoincrement(&self, out: &mut String, column: &ColumnMeta) {
        // Only an INTEGER PRIMARY KEY column can be an alias of the rowid
        if column.primary_key {
            out.push_str(" AUTOINCREMENT");
        }
    }
}
