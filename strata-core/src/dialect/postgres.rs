use crate::{ColumnMeta, Dialect, IdentifierQuote, Result, Value, dialect::page_offset};

#[derive(Clone, Debug)]
pub struct PostgresDialect {
    quote: IdentifierQuote,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PostgresDialect {
    pub fn new(quote: Option<IdentifierQuote>) -> Self {
        Self {
            quote: quote.unwrap_or_else(|| IdentifierQuote::new("\"", "\"")),
        }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn identifier_quote(&self) -> &IdentifierQuote {
        &self.quote
    }

    fn build_paged_query_sql(&self, sql: &str, page: u32, page_size: u32) -> String {
        let offset = page_offset(page, page_size);
        if page_size == 0 {
            format!("{sql} offset {offset}")
        } else {
            format!("{sql} limit {page_size} offset {offset}")
        }
    }

    fn sequence_next_val_sql(&self, sequence: &str) -> Result<String> {
        Ok(format!("nextval('{}')", sequence.replace('\'', "''")))
    }

    fn column_type(&self, column: &ColumnMeta) -> String {
        match &column.value {
            Value::Int8(..) | Value::Int16(..) | Value::Int32(..) | Value::UInt8(..)
                if column.auto_increment && column.sequence.is_none() =>
            {
                "SERIAL"
            }
            Value::Int64(..) | Value::UInt16(..) | Value::UInt32(..) | Value::UInt64(..)
                if column.auto_increment && column.sequence.is_none() =>
            {
                "BIGSERIAL"
            }
            Value::Boolean(..) => "BOOLEAN",
            Value::Int8(..) | Value::Int16(..) | Value::UInt8(..) => "SMALLINT",
            Value::Int32(..) | Value::UInt16(..) => "INTEGER",
            Value::Int64(..) | Value::UInt32(..) => "BIGINT",
            Value::UInt64(..) => "NUMERIC(20)",
            Value::Float32(..) => "REAL",
            Value::Float64(..) => "DOUBLE PRECISION",
            Value::Decimal(..) => "NUMERIC",
            Value::Null | Value::Varchar(..) => "VARCHAR(255)",
            Value::Blob(..) => "BYTEA",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMPTZ",
            Value::Uuid(..) => "UUID",
        }
        .into()
    }

    fn write_autoincrement(&self, out: &mut String, column: &ColumnMeta) {
        if let Some(sequence) = &column.sequence {
            out.push_str(" DEFAULT nextval('");
            out.push_str(&sequence.replace('\'', "''"));
            out.push_str("')");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::tests::users;
    use indoc::indoc;

    #[test]
    fn sequence_insert() {
        let dialect = PostgresDialect::default();
        let mut table = users();
        table.columns[0] = table.columns[0].clone().sequence("users_seq");
        assert_eq!(
            dialect
                .build_insert_sql(&table, "", None, &["id".into(), "name".into()])
                .unwrap(),
            r#"INSERT INTO "users" ("id", "name") VALUES (nextval('users_seq'), ?)"#
        );
    }

    #[test]
    fn create_table() {
        assert_eq!(
            PostgresDialect::default()
                .build_create_sql(&users(), "", None)
                .unwrap(),
            indoc! {r#"
                CREATE TABLE IF NOT EXISTS "users" (
                    "id" BIGSERIAL PRIMARY KEY,
                    "name" VARCHAR(255) NOT NULL,
                    "email" VARCHAR(255),
                    "age" INTEGER NOT NULL DEFAULT 18
                )"#
            }
        );
    }
}
