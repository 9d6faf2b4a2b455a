use crate::{AsValue, Error, PersistenceError, Result, ShardingRule, Value};
use rust_decimal::Decimal;
use std::{
    any,
    collections::HashSet,
    fmt::{self, Debug},
    sync::Arc,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

pub type Getter<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;
pub type Setter<E> = Arc<dyn Fn(&mut E, Value) -> Result<()> + Send + Sync>;

/// Column level mapping information, independent of the entity type.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct ColumnMeta {
    /// Column name in the database.
    pub name: String,
    /// Rust field backing the column.
    pub field: &'static str,
    /// Declared type, a NULL of the matching variant.
    pub value: Value,
    pub nullable: bool,
    pub readonly: bool,
    /// Literal replacing NULL values when writing.
    pub default: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub sequence: Option<String>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, field: &'static str, value: Value) -> Self {
        Self {
            name: name.into(),
            field,
            value,
            ..Default::default()
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn default_literal(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        if primary_key {
            self.nullable = false;
        }
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into()).filter(|v: &String| !v.is_empty());
        self
    }

    /// The default literal converted into the declared type.
    pub fn default_value(&self) -> Result<Option<Value>> {
        let Some(literal) = &self.default else {
            return Ok(None);
        };
        parse_like(&self.value, literal)
            .map(Some)
            .map_err(|e| {
                e.context(format!(
                    "Invalid default value `{}` for column `{}`",
                    literal, self.name
                ))
            })
    }
}

/// Parse `literal` into the same variant as `template`.
pub fn parse_like(template: &Value, literal: &str) -> Result<Value> {
    Ok(match template {
        Value::Null | Value::Varchar(..) => Value::Varchar(Some(literal.to_owned())),
        Value::Boolean(..) => bool::parse(literal)?.as_value(),
        Value::Int8(..) => i8::parse(literal)?.as_value(),
        Value::Int16(..) => i16::parse(literal)?.as_value(),
        Value::Int32(..) => i32::parse(literal)?.as_value(),
        Value::Int64(..) => i64::parse(literal)?.as_value(),
        Value::UInt8(..) => u8::parse(literal)?.as_value(),
        Value::UInt16(..) => u16::parse(literal)?.as_value(),
        Value::UInt32(..) => u32::parse(literal)?.as_value(),
        Value::UInt64(..) => u64::parse(literal)?.as_value(),
        Value::Float32(..) => f32::parse(literal)?.as_value(),
        Value::Float64(..) => f64::parse(literal)?.as_value(),
        Value::Decimal(..) => <Decimal as AsValue>::parse(literal)?.as_value(),
        Value::Blob(..) => Value::Blob(Some(literal.as_bytes().into())),
        Value::Date(..) => <Date as AsValue>::parse(literal)?.as_value(),
        Value::Time(..) => <Time as AsValue>::parse(literal)?.as_value(),
        Value::Timestamp(..) => <PrimitiveDateTime as AsValue>::parse(literal)?.as_value(),
        Value::TimestampWithTimezone(..) => {
            <OffsetDateTime as AsValue>::parse(literal)?.as_value()
        }
        Value::Uuid(..) => <Uuid as AsValue>::parse(literal)?.as_value(),
    })
}

/// A column of entity `E` together with its accessors.
pub struct PropertyMeta<E> {
    pub column: ColumnMeta,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> Clone for PropertyMeta<E> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<E> Debug for PropertyMeta<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMeta")
            .field("column", &self.column)
            .field("get", &"..")
            .field("set", &"..")
            .finish()
    }
}

impl<E: 'static> PropertyMeta<E> {
    pub fn new(
        column: ColumnMeta,
        get: impl Fn(&E) -> Value + Send + Sync + 'static,
        set: impl Fn(&mut E, Value) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            column,
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    pub fn name(&self) -> &str {
        &self.column.name
    }

    pub fn get(&self, entity: &E) -> Value {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        (self.set)(entity, value).map_err(|e| {
            e.context(format!(
                "Cannot assign column `{}` to field `{}::{}`",
                self.column.name,
                any::type_name::<E>(),
                self.column.field
            ))
        })
    }

    /// Lift a property of a nested value (the composite key) into its owner.
    pub fn project<O: 'static>(
        self,
        outer: fn(&O) -> &E,
        outer_mut: fn(&mut O) -> &mut E,
    ) -> PropertyMeta<O> {
        let get = self.get;
        let set = self.set;
        PropertyMeta {
            column: self.column,
            get: Arc::new(move |o: &O| get(outer(o))),
            set: Arc::new(move |o: &mut O, v: Value| set(outer_mut(o), v)),
        }
    }
}

/// The table level part of the mapping, shared by every dialect.
#[derive(Clone, Default)]
pub struct TableMeta {
    pub name: String,
    pub entity: &'static str,
    pub columns: Vec<ColumnMeta>,
    /// Primary key columns in declaration order.
    pub primary_keys: Vec<String>,
    pub view: bool,
    pub sharding_rule: Option<Arc<dyn ShardingRule>>,
}

impl Debug for TableMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMeta")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("columns", &self.columns)
            .field("primary_keys", &self.primary_keys)
            .field("view", &self.view)
            .field("sharding_rule", &self.sharding_rule.is_some())
            .finish()
    }
}

impl TableMeta {
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|v| v == name)
    }

    pub fn is_multiple_primary_key(&self) -> bool {
        self.primary_keys.len() > 1
    }

    pub fn autoincrement_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.auto_increment)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn has_autoincrement(&self) -> bool {
        self.columns.iter().any(|c| c.auto_increment)
    }

    pub fn is_autoincrement(&self, name: &str) -> bool {
        self.column(name).is_some_and(|c| c.auto_increment)
    }
}

/// Mapping descriptor of entity `E`: table information plus the accessor table.
pub struct EntityMeta<E> {
    table: TableMeta,
    properties: Vec<PropertyMeta<E>>,
}

impl<E> Debug for EntityMeta<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMeta")
            .field("table", &self.table)
            .finish()
    }
}

impl<E: 'static> EntityMeta<E> {
    pub fn builder(table_name: impl Into<String>) -> EntityMetaBuilder<E> {
        EntityMetaBuilder {
            name: table_name.into(),
            view: false,
            sharding_rule: None,
            properties: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableMeta {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn is_view(&self) -> bool {
        self.table.view
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyMeta<E>] {
        &self.properties
    }

    pub fn property(&self, column: &str) -> Option<&PropertyMeta<E>> {
        self.properties.iter().find(|p| p.column.name == column)
    }

    /// Primary key properties in key declaration order.
    pub fn primary_key_properties(&self) -> impl Iterator<Item = &PropertyMeta<E>> {
        self.table
            .primary_keys
            .iter()
            .filter_map(|k| self.property(k))
    }

    /// Fails with a configuration error when the entity is read only.
    pub fn check_mutable(&self) -> Result<()> {
        if self.table.view {
            return Err(PersistenceError::configuration(format!(
                "Entity `{}` is mapped to the view `{}` and does not support this operation",
                self.table.entity, self.table.name
            )));
        }
        Ok(())
    }
}

pub struct EntityMetaBuilder<E> {
    name: String,
    view: bool,
    sharding_rule: Option<Arc<dyn ShardingRule>>,
    properties: Vec<PropertyMeta<E>>,
}

impl<E: 'static> EntityMetaBuilder<E> {
    pub fn view(mut self, view: bool) -> Self {
        self.view = view;
        self
    }

    pub fn sharding_rule(mut self, rule: impl ShardingRule + 'static) -> Self {
        self.sharding_rule = Some(Arc::new(rule));
        self
    }

    pub fn property(mut self, property: PropertyMeta<E>) -> Self {
        self.properties.push(property);
        self
    }

    pub fn properties(mut self, properties: impl IntoIterator<Item = PropertyMeta<E>>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn build(self) -> Result<EntityMeta<E>> {
        let entity = any::type_name::<E>();
        let error = |message: String| -> Error { PersistenceError::configuration(message) };
        if self.name.trim().is_empty() {
            return Err(error(format!("Entity `{entity}` does not declare a table name")));
        }
        if self.properties.is_empty() {
            return Err(error(format!("Entity `{entity}` does not map any column")));
        }
        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.column.name.as_str()) {
                return Err(error(format!(
                    "Entity `{entity}` maps the column `{}` more than once",
                    property.column.name
                )));
            }
        }
        let autoincrement = self
            .properties
            .iter()
            .filter(|p| p.column.auto_increment)
            .collect::<Vec<_>>();
        if autoincrement.len() > 1 {
            let sequences = autoincrement
                .iter()
                .filter_map(|p| p.column.sequence.as_deref())
                .collect::<HashSet<_>>();
            return Err(error(format!(
                "Entity `{entity}` declares {} autoincrement columns{}, at most one is supported",
                autoincrement.len(),
                if sequences.len() > 1 {
                    " with distinct sequences"
                } else {
                    ""
                }
            )));
        }
        let primary_keys = self
            .properties
            .iter()
            .filter(|p| p.column.primary_key)
            .map(|p| p.column.name.clone())
            .collect::<Vec<_>>();
        if primary_keys.is_empty() && !self.view {
            return Err(error(format!(
                "Entity `{entity}` does not declare a primary key"
            )));
        }
        Ok(EntityMeta {
            table: TableMeta {
                name: self.name,
                entity,
                columns: self.properties.iter().map(|p| p.column.clone()).collect(),
                primary_keys,
                view: self.view,
                sharding_rule: self.sharding_rule,
            },
            properties: self.properties,
        })
    }
}
