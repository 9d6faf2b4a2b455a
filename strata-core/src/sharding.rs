use crate::{Shardable, Value};

/// Maps a logical table name and a sharding parameter to a physical table name.
pub trait ShardingRule: Send + Sync {
    fn shard_name(&self, origin: &str, param: &Value) -> String;
}

/// `{table}_{param mod shards}`, for integer parameters.
#[derive(Debug, Clone, Copy)]
pub struct ModuloShardingRule {
    pub shards: u32,
}

impl ModuloShardingRule {
    pub const fn new(shards: u32) -> Self {
        Self { shards }
    }
}

impl ShardingRule for ModuloShardingRule {
    fn shard_name(&self, origin: &str, param: &Value) -> String {
        match param.as_i64() {
            Some(v) if self.shards > 0 => {
                format!("{}_{}", origin, v.rem_euclid(self.shards as i64))
            }
            _ => {
                log::warn!(
                    "Sharding parameter {} cannot select a shard of `{}`, using the table itself",
                    param,
                    origin
                );
                origin.to_owned()
            }
        }
    }
}

/// `{table}_{param}`, the parameter is used verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixShardingRule;

impl ShardingRule for SuffixShardingRule {
    fn shard_name(&self, origin: &str, param: &Value) -> String {
        match param {
            Value::Varchar(Some(v)) => format!("{origin}_{v}"),
            v if v.is_null() => origin.to_owned(),
            v => format!("{origin}_{v}"),
        }
    }
}

/// One element of a [`ShardingList`]: the entity and the parameter addressing
/// its physical table.
#[derive(Debug, Clone)]
pub struct ShardingElement<E> {
    pub shard: Value,
    pub element: E,
}

impl<E> Shardable for ShardingElement<E> {
    fn sharding_param(&self) -> Value {
        self.shard.clone()
    }
}

/// Entities that may each live in a different shard.
#[derive(Debug, Clone)]
pub struct ShardingList<E> {
    elements: Vec<ShardingElement<E>>,
}

impl<E> Default for ShardingList<E> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<E> ShardingList<E> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add(mut self, shard: impl Into<Value>, element: E) -> Self {
        self.push(shard, element);
        self
    }

    pub fn push(&mut self, shard: impl Into<Value>, element: E) {
        self.elements.push(ShardingElement {
            shard: shard.into(),
            element,
        });
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardingElement<E>> {
        self.elements.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShardingElement<E>> {
        self.elements.iter_mut()
    }

    pub fn into_elements(self) -> Vec<E> {
        self.elements.into_iter().map(|v| v.element).collect()
    }
}

impl<E: Shardable> FromIterator<E> for ShardingList<E> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let mut result = ShardingList::new();
        for element in iter {
            result.push(element.sharding_param(), element);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo() {
        let rule = ModuloShardingRule::new(4);
        assert_eq!(rule.shard_name("orders", &Value::Int64(Some(10))), "orders_2");
        assert_eq!(rule.shard_name("orders", &Value::Int32(Some(-1))), "orders_3");
        assert_eq!(rule.shard_name("orders", &Value::Varchar(Some("a".into()))), "orders");
    }

    #[test]
    fn suffix() {
        let rule = SuffixShardingRule;
        assert_eq!(rule.shard_name("log", &Value::Varchar(Some("2024".into()))), "log_2024");
        assert_eq!(rule.shard_name("log", &Value::UInt16(Some(7))), "log_7");
        assert_eq!(rule.shard_name("log", &Value::Null), "log");
    }
}
