use crate::{ColumnMeta, Dialect, IdentifierQuote, Value};

#[derive(Clone, Debug)]
pub struct MySqlDialect {
    quote: IdentifierQuote,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new(None)
    }
}

impl MySqlDialect {
    pub fn new(quote: Option<IdentifierQuote>) -> Self {
        Self {
            quote: quote.unwrap_or_else(|| IdentifierQuote::new("`", "`")),
        }
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn identifier_quote(&self) -> &IdentifierQuote {
        &self.quote
    }

    fn column_type(&self, column: &ColumnMeta) -> String {
        match &column.value {
            Value::Boolean(..) => "BOOLEAN",
            Value::Int8(..) => "TINYINT",
            Value::Int16(..) => "SMALLINT",
            Value::Int32(..) => "INTEGER",
            Value::Int64(..) => "BIGINT",
            Value::UInt8(..) => "TINYINT UNSIGNED",
            Value::UInt16(..) => "SMALLINT UNSIGNED",
            Value::UInt32(..) => "INTEGER UNSIGNED",
            Value::UInt64(..) => "BIGINT UNSIGNED",
            Value::Float32(..) => "FLOAT",
            Value::Float64(..) => "DOUBLE",
            Value::Decimal(..) => "DECIMAL(38,10)",
            Value::Null | Value::Varchar(..) => "VARCHAR(255)",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME(6)",
            Value::Timestamp(..) => "DATETIME(6)",
            Value::TimestampWithTimezone(..) => "TIMESTAMP(6)",
            Value::Uuid(..) => "CHAR(36)",
        }
        .into()
    }

    fn write_autoincrement(&self, out: &mut String, _column: &ColumnMeta) {
        out.push_str(" AUTO_INCREMENT");
    }
}
