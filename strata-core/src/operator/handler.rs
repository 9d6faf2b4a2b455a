use crate::{AsValue, EntityMeta, Result, RowLabeled, Value};
use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

/// Converts one result row into an item.
pub trait RowHandler<T> {
    fn handle(&self, row: &RowLabeled) -> Result<T>;
}

impl<T, F> RowHandler<T> for F
where
    F: Fn(&RowLabeled) -> Result<T>,
{
    fn handle(&self, row: &RowLabeled) -> Result<T> {
        self(row)
    }
}

/// Builds entities from rows, columns missing from the row keep their default.
pub struct EntityHandler<E> {
    meta: Arc<EntityMeta<E>>,
}

impl<E> EntityHandler<E> {
    pub fn new(meta: Arc<EntityMeta<E>>) -> Self {
        Self { meta }
    }
}

impl<E: Default + 'static> RowHandler<E> for EntityHandler<E> {
    fn handle(&self, row: &RowLabeled) -> Result<E> {
        let mut entity = E::default();
        for property in self.meta.properties() {
            if let Some(value) = row.get_column(property.name()) {
                property.set(&mut entity, value.clone())?;
            }
        }
        Ok(entity)
    }
}

/// The row values, in select order.
#[derive(Default, Clone, Copy, Debug)]
pub struct ValuesHandler;

impl RowHandler<Vec<Value>> for ValuesHandler {
    fn handle(&self, row: &RowLabeled) -> Result<Vec<Value>> {
        Ok(row.values().to_vec())
    }
}

/// The row as a map from label to value.
#[derive(Default, Clone, Copy, Debug)]
pub struct MapHandler;

impl RowHandler<BTreeMap<String, Value>> for MapHandler {
    fn handle(&self, row: &RowLabeled) -> Result<BTreeMap<String, Value>> {
        Ok(row
            .iter()
            .map(|(k, v)| (k.to_owned(), v.clone()))
            .collect())
    }
}

/// The first column converted into `T`, used for scalar queries like counts.
pub struct ScalarHandler<T>(PhantomData<fn() -> T>);

impl<T> Default for ScalarHandler<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: AsValue> RowHandler<T> for ScalarHandler<T> {
    fn handle(&self, row: &RowLabeled) -> Result<T> {
        row.get(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RowLabeled {
        RowLabeled::new(
            ["id".to_string(), "name".to_string()].into(),
            [Value::Int64(Some(3)), Value::Varchar(Some("a".into()))].into(),
        )
    }

    #[test]
    fn handlers() {
        assert_eq!(ValuesHandler.handle(&row()).unwrap().len(), 2);
        let map = MapHandler.handle(&row()).unwrap();
        assert_eq!(map["name"], Value::Varchar(Some("a".into())));
        assert_eq!(ScalarHandler::<u64>::default().handle(&row()).unwrap(), 3);
        let closure = |row: &RowLabeled| -> Result<String> { row.get(1) };
        assert_eq!(closure.handle(&row()).unwrap(), "a");
    }
}
