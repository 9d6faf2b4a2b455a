use crate::{
    Dialect, IdentifierQuote, PersistenceError, Result, TableMeta, Value, dialect::page_offset,
};

/// Oracle: rownum based paging, sequences, no generated keys without column names.
#[derive(Default, Clone, Debug)]
pub struct OracleDialect {
    quote: IdentifierQuote,
}

impl OracleDialect {
    pub fn new(quote: Option<IdentifierQuote>) -> Self {
        Self {
            quote: quote.unwrap_or_default(),
        }
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn identifier_quote(&self) -> &IdentifierQuote {
        &self.quote
    }

    fn build_paged_query_sql(&self, sql: &str, page: u32, page_size: u32) -> String {
        let offset = page_offset(page, page_size);
        if page_size == 0 {
            format!("SELECT * FROM ( {sql} ) WHERE rownum <= {offset}")
        } else {
            format!(
                "SELECT * FROM ( SELECT row_.*, rownum rownum_ FROM ( {sql} ) row_ ) WHERE rownum_ > {} AND rownum_ <= {}",
                offset,
                offset + page_size as u64
            )
        }
    }

    fn sequence_next_val_sql(&self, sequence: &str) -> Result<String> {
        Ok(format!("{sequence}.nextval"))
    }

    fn supports_return_generated_keys(&self) -> bool {
        false
    }

    fn build_create_sql(
        &self,
        table: &TableMeta,
        _prefix: &str,
        _shard: Option<&Value>,
    ) -> Result<String> {
        Err(PersistenceError::mapping(format!(
            "The oracle dialect cannot generate the DDL of `{}`",
            table.name
        )))
    }

    fn build_drop_sql(
        &self,
        table: &TableMeta,
        _prefix: &str,
        _shard: Option<&Value>,
    ) -> Result<String> {
        Err(PersistenceError::mapping(format!(
            "The oracle dialect cannot generate the DDL of `{}`",
            table.name
        )))
    }
}
