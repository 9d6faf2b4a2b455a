use crate::{Params, Value};

/// Predicate builder producing SQL text and its ordered parameters.
///
/// ```rust
/// use strata_core::Cond;
/// let cond = Cond::create().eq("name").param("a").and().gt("age").param(18);
/// assert_eq!(cond.sql(), "name = ? AND age > ?");
/// assert_eq!(cond.params().len(), 2);
/// ```
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Cond {
    sql: String,
    params: Params,
}

impl Cond {
    pub fn create() -> Self {
        Default::default()
    }

    fn push(mut self, fragment: &str) -> Self {
        if !self.sql.is_empty() && !self.sql.ends_with(' ') && !self.sql.ends_with('(') {
            self.sql.push(' ');
        }
        self.sql.push_str(fragment);
        self
    }

    fn compare(self, column: &str, op: &str) -> Self {
        self.push(&format!("{column} {op} ?"))
    }

    pub fn eq(self, column: &str) -> Self {
        self.compare(column, "=")
    }

    pub fn not_eq(self, column: &str) -> Self {
        self.compare(column, "<>")
    }

    pub fn gt(self, column: &str) -> Self {
        self.compare(column, ">")
    }

    pub fn gt_eq(self, column: &str) -> Self {
        self.compare(column, ">=")
    }

    pub fn lt(self, column: &str) -> Self {
        self.compare(column, "<")
    }

    pub fn lt_eq(self, column: &str) -> Self {
        self.compare(column, "<=")
    }

    pub fn like(self, column: &str) -> Self {
        self.compare(column, "LIKE")
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(&format!("{column} IS NULL"))
    }

    pub fn is_not_null(self, column: &str) -> Self {
        self.push(&format!("{column} IS NOT NULL"))
    }

    /// `column IN (?, ?, ...)` binding every value.
    pub fn in_values(mut self, column: &str, values: impl IntoIterator<Item = Value>) -> Self {
        let mut placeholders = Vec::new();
        for value in values {
            placeholders.push("?");
            self.params.add(value);
        }
        self.push(&format!("{column} IN ({})", placeholders.join(", ")))
    }

    pub fn and(self) -> Self {
        self.push("AND")
    }

    pub fn or(self) -> Self {
        self.push("OR")
    }

    pub fn not(self) -> Self {
        self.push("NOT")
    }

    /// Append a nested condition between parentheses, its parameters follow.
    pub fn bracket(mut self, cond: Cond) -> Self {
        self.params.add_params(&cond.params);
        self.push(&format!("({})", cond.sql))
    }

    /// Verbatim SQL fragment.
    pub fn expr(self, sql: &str) -> Self {
        self.push(sql)
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.add(value);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.sql.trim().is_empty()
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct OrderBy {
    items: Vec<String>,
}

impl OrderBy {
    pub fn create() -> Self {
        Default::default()
    }

    pub fn asc(mut self, column: &str) -> Self {
        self.items.push(format!("{column} ASC"));
        self
    }

    pub fn desc(mut self, column: &str) -> Self {
        self.items.push(format!("{column} DESC"));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `ORDER BY a ASC, b DESC`, empty when nothing was added.
    pub fn to_sql(&self) -> String {
        if self.items.is_empty() {
            return String::new();
        }
        format!("ORDER BY {}", self.items.join(", "))
    }
}

/// Predicate, its parameters and an optional ordering, consumed by one session call.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Where {
    cond: Cond,
    order_by: OrderBy,
}

impl Where {
    pub fn create(cond: Cond) -> Self {
        Self {
            cond,
            order_by: OrderBy::create(),
        }
    }

    /// No predicate, only ordering or parameters appended later.
    pub fn empty() -> Self {
        Default::default()
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.cond = self.cond.param(value);
        self
    }

    pub fn cond(&self) -> &Cond {
        &self.cond
    }

    pub fn params(&self) -> &Params {
        self.cond.params()
    }

    /// ` WHERE ...` without the ordering, used by counts.
    pub fn condition_sql(&self) -> String {
        if self.cond.is_empty() {
            return String::new();
        }
        format!(" WHERE {}", self.cond.sql())
    }

    /// ` WHERE ... ORDER BY ...` with a leading space, or an empty string.
    pub fn to_sql(&self) -> String {
        let mut out = self.condition_sql();
        if !self.order_by.is_empty() {
            out.push(' ');
            out.push_str(&self.order_by.to_sql());
        }
        out
    }
}

impl From<Cond> for Where {
    fn from(value: Cond) -> Self {
        Where::create(value)
    }
}
