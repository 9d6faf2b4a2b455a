mod generic;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

pub use generic::*;
pub use mysql::*;
pub use oracle::*;
pub use postgres::*;
pub use sqlite::*;

use crate::{
    ColumnMeta, DataSourceConfig, PersistenceError, Result, RowLabeled, TableMeta, Value,
    separated_by,
};
use std::{
    collections::BTreeMap,
    fmt::{self, Write},
    sync::Arc,
};

/// Characters surrounding identifiers.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct IdentifierQuote {
    pub begin: String,
    pub end: String,
}

impl IdentifierQuote {
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into().trim().to_owned(),
            end: end.into().trim().to_owned(),
        }
    }

    /// `"` quotes both sides, `[]` quotes with distinct begin and end.
    pub fn parse(value: &str) -> Self {
        let mut chars = value.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(b), Some(e)) => Self::new(b, e),
            (Some(b), None) => Self::new(b, b),
            _ => Self::default(),
        }
    }

    /// Wrap `name`, doubling any end quote found inside it.
    pub fn wrap(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        out.push_str(&self.begin);
        if self.end.is_empty() {
            out.push_str(name);
        } else {
            out.push_str(&name.replace(&self.end, &self.end.repeat(2)));
        }
        out.push_str(&self.end);
        out
    }
}

/// SQL generation for one database family.
///
/// Implementations are stateless apart from the identifier quote and are
/// shared by every session of a data source. Every `build_*` method is a pure
/// function of its arguments: the same input always produces the same text.
pub trait Dialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn identifier_quote(&self) -> &IdentifierQuote;

    fn wrap_identifier(&self, name: &str) -> String {
        self.identifier_quote().wrap(name)
    }

    /// Physical table name: prefix plus the logical name, or the shard name when
    /// both a sharding rule and a sharding parameter exist.
    fn build_table_name(&self, prefix: &str, table: &TableMeta, shard: Option<&Value>) -> String {
        let name = match (&table.sharding_rule, shard) {
            (Some(rule), Some(param)) => rule.shard_name(&table.name, param),
            _ => table.name.clone(),
        };
        self.wrap_identifier(&format!("{}{}", prefix.trim(), name))
    }

    /// `SELECT a, b FROM t`, every column when `columns` is empty.
    fn build_select_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
        columns: &[String],
    ) -> Result<String> {
        let columns = table_columns(table, columns)?;
        Ok(format!(
            "SELECT {} FROM {}",
            self.columns_list(&columns, "", ", "),
            self.build_table_name(prefix, table, shard)
        ))
    }

    /// `SELECT a, b FROM t WHERE pk = ? and pk2 = ?`.
    fn build_select_by_pk_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
        pk_columns: &[String],
        columns: &[String],
    ) -> Result<String> {
        let select = self.build_select_sql(table, prefix, shard, columns)?;
        let keys = key_columns(table, pk_columns)?;
        Ok(format!(
            "{} WHERE {}",
            select,
            self.columns_list(&keys, " = ?", " and ")
        ))
    }

    /// `INSERT INTO t (a, b) VALUES (?, ?)`, autoincrement columns backed by a
    /// sequence take the next sequence value instead of a placeholder.
    fn build_insert_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
        columns: &[String],
    ) -> Result<String> {
        let columns = table_columns(table, columns)?;
        let mut values = Vec::with_capacity(columns.len());
        for column in columns.iter().filter_map(|v| table.column(v)) {
            match (&column.sequence, column.auto_increment) {
                (Some(sequence), true) => values.push(self.sequence_next_val_sql(sequence)?),
                _ => values.push("?".to_owned()),
            }
        }
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.build_table_name(prefix, table, shard),
            self.columns_list(&columns, "", ", "),
            values.join(", ")
        ))
    }

    /// `UPDATE t SET a = ?, b = ? WHERE pk = ?`, primary keys never appear in the SET list.
    fn build_update_by_pk_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
        pk_columns: &[String],
        columns: &[String],
    ) -> Result<String> {
        let columns = table_columns(table, columns)?
            .into_iter()
            .filter(|v| !table.is_primary_key(v))
            .collect::<Vec<_>>();
        if columns.is_empty() {
            return Err(PersistenceError::mapping(format!(
                "Table `{}` has no column left to update",
                table.name
            )));
        }
        let keys = key_columns(table, pk_columns)?;
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            self.build_table_name(prefix, table, shard),
            self.columns_list(&columns, " = ?", ", "),
            self.columns_list(&keys, " = ?", " and ")
        ))
    }

    /// `DELETE FROM t WHERE pk = ? and pk2 = ?`.
    fn build_delete_by_pk_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
        pk_columns: &[String],
    ) -> Result<String> {
        let keys = key_columns(table, pk_columns)?;
        Ok(format!(
            "DELETE FROM {} WHERE {}",
            self.build_table_name(prefix, table, shard),
            self.columns_list(&keys, " = ?", " and ")
        ))
    }

    /// Restrict `sql` to the 1-based `page`. A zero `page_size` keeps only the offset.
    fn build_paged_query_sql(&self, sql: &str, page: u32, page_size: u32) -> String {
        let offset = page_offset(page, page_size);
        if page_size == 0 {
            format!("{sql} limit {offset}")
        } else {
            format!("{sql} limit {offset}, {page_size}")
        }
    }

    fn sequence_next_val_sql(&self, sequence: &str) -> Result<String> {
        Err(PersistenceError::mapping(format!(
            "The {} dialect does not support sequences (`{}`)",
            self.name(),
            sequence
        )))
    }

    /// Whether drivers can report generated keys without being told the key columns.
    fn supports_return_generated_keys(&self) -> bool {
        true
    }

    /// One map per generated key row, in statement order. Values are looked up
    /// by label first, by position otherwise.
    fn generated_key(
        &self,
        rows: &[RowLabeled],
        columns: &[String],
    ) -> Vec<BTreeMap<String, Value>> {
        rows.iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .filter_map(|(i, column)| {
                        row.get_column(column)
                            .or_else(|| row.values.get(i))
                            .filter(|v| !v.is_null())
                            .map(|v| (column.clone(), v.clone()))
                    })
                    .collect()
            })
            .collect()
    }

    /// SQL type of `column` used in CREATE TABLE.
    fn column_type(&self, column: &ColumnMeta) -> String {
        match &column.value {
            Value::Boolean(..) => "BOOLEAN",
            Value::Int8(..) => "TINYINT",
            Value::Int16(..) => "SMALLINT",
            Value::Int32(..) => "INTEGER",
            Value::Int64(..) => "BIGINT",
            Value::UInt8(..) => "SMALLINT",
            Value::UInt16(..) => "INTEGER",
            Value::UInt32(..) => "BIGINT",
            Value::UInt64(..) => "NUMERIC(20)",
            Value::Float32(..) => "FLOAT",
            Value::Float64(..) => "DOUBLE",
            Value::Decimal(..) => "DECIMAL",
            Value::Null | Value::Varchar(..) => "VARCHAR(255)",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMP WITH TIME ZONE",
            Value::Uuid(..) => "UUID",
        }
        .into()
    }

    /// Column attribute marking `column` as generated by the database.
    fn write_autoincrement(&self, out: &mut String, _column: &ColumnMeta) {
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }

    fn write_create_column(&self, out: &mut String, table: &TableMeta, column: &ColumnMeta) {
        out.push_str("    ");
        out.push_str(&self.wrap_identifier(&column.name));
        out.push(' ');
        out.push_str(&self.column_type(column));
        let single_key = column.primary_key && !table.is_multiple_primary_key();
        if !column.nullable && !single_key {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            out.push_str(" DEFAULT ");
            write_literal(out, &column.value, default);
        }
        if single_key {
            out.push_str(" PRIMARY KEY");
        }
        if column.auto_increment {
            self.write_autoincrement(out, column);
        }
    }

    fn build_create_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
    ) -> Result<String> {
        if table.view {
            return Err(PersistenceError::mapping(format!(
                "`{}` is a view, it cannot be created as a table",
                table.name
            )));
        }
        let mut out = String::with_capacity(128 + table.columns.len() * 48);
        let _ = write!(
            out,
            "CREATE TABLE IF NOT EXISTS {} (\n",
            self.build_table_name(prefix, table, shard)
        );
        separated_by(
            &mut out,
            &table.columns,
            |out, v| self.write_create_column(out, table, v),
            ",\n",
        );
        if table.is_multiple_primary_key() {
            let _ = write!(
                out,
                ",\n    PRIMARY KEY ({})",
                self.columns_list(&table.primary_keys, "", ", ")
            );
        }
        out.push_str("\n)");
        Ok(out)
    }

    fn build_drop_sql(
        &self,
        table: &TableMeta,
        prefix: &str,
        shard: Option<&Value>,
    ) -> Result<String> {
        Ok(format!(
            "DROP TABLE IF EXISTS {}",
            self.build_table_name(prefix, table, shard)
        ))
    }

    /// Quoted columns each followed by `suffix`, joined with `separator`.
    fn columns_list(&self, columns: &[String], suffix: &str, separator: &str) -> String {
        let mut out = String::new();
        separated_by(
            &mut out,
            columns,
            |out, v| {
                out.push_str(&self.wrap_identifier(v));
                out.push_str(suffix);
            },
            separator,
        );
        out
    }
}

/// Rows skipped before the 1-based `page`.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    (page.max(1) as u64 - 1) * page_size as u64
}

/// `columns` validated against the table, or every table column when empty.
fn table_columns(table: &TableMeta, columns: &[String]) -> Result<Vec<String>> {
    if columns.is_empty() {
        return Ok(table.column_names().map(ToOwned::to_owned).collect());
    }
    if let Some(column) = columns.iter().find(|v| !table.contains_column(v)) {
        return Err(PersistenceError::mapping(format!(
            "'{column}' isn't table field."
        )));
    }
    Ok(columns.to_vec())
}

/// `pk_columns` validated against the primary key, or the whole key when empty.
fn key_columns(table: &TableMeta, pk_columns: &[String]) -> Result<Vec<String>> {
    if pk_columns.is_empty() {
        if table.primary_keys.is_empty() {
            return Err(PersistenceError::mapping(format!(
                "Table `{}` does not have a primary key",
                table.name
            )));
        }
        return Ok(table.primary_keys.clone());
    }
    if let Some(column) = pk_columns.iter().find(|v| !table.is_primary_key(v)) {
        return Err(PersistenceError::mapping(format!(
            "'{column}' isn't primary key field."
        )));
    }
    Ok(pk_columns.to_vec())
}

fn write_literal(out: &mut String, template: &Value, literal: &str) {
    match template {
        Value::Boolean(..)
        | Value::Int8(..)
        | Value::Int16(..)
        | Value::Int32(..)
        | Value::Int64(..)
        | Value::UInt8(..)
        | Value::UInt16(..)
        | Value::UInt32(..)
        | Value::UInt64(..)
        | Value::Float32(..)
        | Value::Float64(..)
        | Value::Decimal(..) => out.push_str(literal),
        _ => {
            out.push('\'');
            out.push_str(&literal.replace('\'', "''"));
            out.push('\'');
        }
    }
}

/// Dialect named `name` (case insensitive), also accepting URL schemes.
pub fn dialect_by_name(name: &str, quote: Option<&str>) -> Result<Arc<dyn Dialect>> {
    let quote = quote.map(IdentifierQuote::parse);
    let dialect: Arc<dyn Dialect> = match name.trim().to_ascii_lowercase().as_str() {
        "generic" | "ansi" => Arc::new(GenericDialect::new(quote)),
        "mysql" | "mariadb" => Arc::new(MySqlDialect::new(quote)),
        "sqlite" | "sqlite3" => Arc::new(SqliteDialect::new(quote)),
        "postgres" | "postgresql" => Arc::new(PostgresDialect::new(quote)),
        "oracle" => Arc::new(OracleDialect::new(quote)),
        other => {
            return Err(PersistenceError::configuration(format!(
                "Unknown database dialect `{other}`"
            )));
        }
    };
    Ok(dialect)
}

/// Resolve the dialect of a data source: the explicit name first, the URL scheme otherwise.
pub fn resolve_dialect(config: &DataSourceConfig) -> Result<Arc<dyn Dialect>> {
    let quote = config.identifier_quote.as_deref();
    if let Some(name) = config.dialect.as_deref().filter(|v| !v.trim().is_empty()) {
        return dialect_by_name(name, quote);
    }
    let scheme = config.scheme()?;
    dialect_by_name(&scheme, quote).map_err(|e| {
        e.context(format!(
            "While resolving the dialect of data source `{}`",
            config.name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, ModuloShardingRule};
    use indoc::indoc;

    pub(crate) fn users() -> TableMeta {
        TableMeta {
            name: "users".into(),
            entity: "User",
            columns: vec![
                ColumnMeta::new("id", "id", Value::Int64(None))
                    .primary_key(true)
                    .auto_increment(true),
                ColumnMeta::new("name", "name", Value::Varchar(None)),
                ColumnMeta::new("email", "email", Value::Varchar(None)).nullable(true),
                ColumnMeta::new("age", "age", Value::Int32(None)).default_literal("18"),
            ],
            primary_keys: vec!["id".into()],
            ..Default::default()
        }
    }

    pub(crate) fn members() -> TableMeta {
        TableMeta {
            name: "members".into(),
            entity: "Member",
            columns: vec![
                ColumnMeta::new("group_id", "group_id", Value::Int32(None)).primary_key(true),
                ColumnMeta::new("user_id", "user_id", Value::Int64(None)).primary_key(true),
                ColumnMeta::new("role", "role", Value::Varchar(None)).default_literal("guest"),
            ],
            primary_keys: vec!["group_id".into(), "user_id".into()],
            ..Default::default()
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn statements() {
        let dialect = GenericDialect::default();
        let table = users();
        assert_eq!(
            dialect.build_select_sql(&table, "", None, &[]).unwrap(),
            "SELECT id, name, email, age FROM users"
        );
        assert_eq!(
            dialect
                .build_select_by_pk_sql(&table, "t_", None, &[], &cols(&["name"]))
                .unwrap(),
            "SELECT name FROM t_users WHERE id = ?"
        );
        assert_eq!(
            dialect
                .build_insert_sql(&table, "", None, &cols(&["name", "email"]))
                .unwrap(),
            "INSERT INTO users (name, email) VALUES (?, ?)"
        );
        assert_eq!(
            dialect
                .build_update_by_pk_sql(&table, "", None, &[], &cols(&["id", "email", "age"]))
                .unwrap(),
            "UPDATE users SET email = ?, age = ? WHERE id = ?"
        );
        let members = members();
        assert_eq!(
            dialect.build_delete_by_pk_sql(&members, "", None, &[]).unwrap(),
            "DELETE FROM members WHERE group_id = ? and user_id = ?"
        );
    }

    #[test]
    fn deterministic() {
        let dialect = MySqlDialect::default();
        let table = members();
        let first = dialect
            .build_update_by_pk_sql(&table, "", None, &[], &[])
            .unwrap();
        let second = dialect
            .build_update_by_pk_sql(&table, "", None, &[], &[])
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "UPDATE `members` SET `role` = ? WHERE `group_id` = ? and `user_id` = ?"
        );
    }

    #[test]
    fn invalid_columns() {
        let dialect = GenericDialect::default();
        let table = users();
        let error = dialect
            .build_select_sql(&table, "", None, &cols(&["nickname"]))
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Mapping);
        assert_eq!(error.to_string(), "Mapping error: 'nickname' isn't table field.");
        let error = dialect
            .build_delete_by_pk_sql(&table, "", None, &cols(&["name"]))
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Mapping);
        assert_eq!(error.to_string(), "Mapping error: 'name' isn't primary key field.");
    }

    #[test]
    fn sharded_table_name() {
        let dialect = SqliteDialect::default();
        let mut table = users();
        let shard = Value::Int64(Some(7));
        assert_eq!(dialect.build_table_name("p_", &table, Some(&shard)), "\"p_users\"");
        table.sharding_rule = Some(Arc::new(ModuloShardingRule::new(4)));
        assert_eq!(dialect.build_table_name("p_", &table, Some(&shard)), "\"p_users_3\"");
        assert_eq!(dialect.build_table_name("p_", &table, None), "\"p_users\"");
    }

    #[test]
    fn paged_queries() {
        let sql = "SELECT id FROM users";
        assert_eq!(
            GenericDialect::default().build_paged_query_sql(sql, 1, 10),
            "SELECT id FROM users limit 0, 10"
        );
        assert_eq!(
            MySqlDialect::default().build_paged_query_sql(sql, 3, 10),
            "SELECT id FROM users limit 20, 10"
        );
        assert_eq!(
            SqliteDialect::default().build_paged_query_sql(sql, 2, 0),
            "SELECT id FROM users limit 0"
        );
        assert_eq!(
            PostgresDialect::default().build_paged_query_sql(sql, 2, 10),
            "SELECT id FROM users limit 10 offset 10"
        );
        assert_eq!(
            OracleDialect::default().build_paged_query_sql(sql, 2, 10),
            "SELECT * FROM ( SELECT row_.*, rownum rownum_ FROM ( SELECT id FROM users ) row_ ) WHERE rownum_ > 10 AND rownum_ <= 20"
        );
    }

    #[test]
    fn generated_keys() {
        let dialect = GenericDialect::default();
        let rows = [
            RowLabeled::new(["ID".to_string()].into(), [Value::Int64(Some(4))].into()),
            RowLabeled::new(
                ["GENERATED_KEY".to_string()].into(),
                [Value::Int64(Some(5))].into(),
            ),
            RowLabeled::new(["id".to_string()].into(), [Value::Null].into()),
        ];
        let keys = dialect.generated_key(&rows, &cols(&["id"]));
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0]["id"], Value::Int64(Some(4)));
        assert_eq!(keys[1]["id"], Value::Int64(Some(5)));
        assert!(keys[2].is_empty());
    }

    #[test]
    fn create_table() {
        let dialect = GenericDialect::default();
        assert_eq!(
            dialect.build_create_sql(&members(), "", None).unwrap(),
            indoc! {"
                CREATE TABLE IF NOT EXISTS members (
                    group_id INTEGER NOT NULL,
                    user_id BIGINT NOT NULL,
                    role VARCHAR(255) NOT NULL DEFAULT 'guest',
                    PRIMARY KEY (group_id, user_id)
                )"
            }
        );
        assert_eq!(
            dialect.build_drop_sql(&users(), "", None).unwrap(),
            "DROP TABLE IF EXISTS users"
        );
    }

    #[test]
    fn quotes() {
        assert_eq!(IdentifierQuote::parse("`").wrap("a`b"), "`a``b`");
        assert_eq!(IdentifierQuote::parse("[]").wrap("name"), "[name]");
        assert_eq!(IdentifierQuote::parse("").wrap("name"), "name");
        let dialect = dialect_by_name("MySQL", Some("\"")).unwrap();
        assert_eq!(dialect.wrap_identifier("id"), "\"id\"");
        assert_eq!(dialect.name(), "mysql");
    }

    #[test]
    fn resolution() {
        let config = DataSourceConfig::new("default", "postgres://localhost/app");
        assert_eq!(resolve_dialect(&config).unwrap().name(), "postgresql");
        let config = DataSourceConfig::new("default", "sqlite://memory").dialect("oracle");
        assert_eq!(resolve_dialect(&config).unwrap().name(), "oracle");
        let config = DataSourceConfig::new("default", "mssql://localhost");
        let error = resolve_dialect(&config).unwrap_err();
        assert_eq!(ErrorKind::of(&error), ErrorKind::Configuration);
    }
}
