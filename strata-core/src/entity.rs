use crate::{AsValue, EntityMeta, PropertyMeta, Result, Value};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A persisted type.
///
/// Implementations are normally produced by `#[derive(Entity)]`, which builds the
/// accessor table returned by [`Entity::describe`]. The descriptor is built once
/// per [`crate::EntityMetaRegistry`] and reused for every statement.
pub trait Entity: Default + Send + Sync + 'static {
    /// Identity of the entity: a single column value or a composite key type
    /// implementing [`EntityKey`].
    type Id: EntityId;

    /// Build the mapping descriptor. Called by the registry on first use.
    fn describe() -> Result<EntityMeta<Self>>;

    fn id(&self) -> &Self::Id;
}

/// Decomposes an identity into the values bound against the primary key
/// columns, in key declaration order.
pub trait EntityId {
    fn id_values(&self) -> Vec<Value>;

    fn is_composite() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Composite primary key: a dedicated type whose fields map to the key columns.
pub trait EntityKey: EntityId + Default + Send + Sync + 'static {
    fn key_properties() -> Vec<PropertyMeta<Self>>;
}

/// Supplies the parameter a [`crate::ShardingRule`] uses to pick the physical table.
pub trait Shardable {
    fn sharding_param(&self) -> Value;
}

impl Shardable for Value {
    fn sharding_param(&self) -> Value {
        self.clone()
    }
}

macro_rules! impl_entity_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl EntityId for $ty {
                fn id_values(&self) -> Vec<Value> {
                    vec![self.clone().as_value()]
                }
            }
        )+
    };
}

impl_entity_id!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    String,
    Decimal,
    Uuid,
    Date,
    Time,
    PrimitiveDateTime,
    OffsetDateTime,
);

impl<T: EntityId> EntityId for Option<T>
where
    T: AsValue,
{
    fn id_values(&self) -> Vec<Value> {
        match self {
            Some(v) => v.id_values(),
            None => vec![T::as_empty_value()],
        }
    }
}

impl EntityId for Value {
    fn id_values(&self) -> Vec<Value> {
        vec![self.clone()]
    }
}

impl EntityId for Vec<Value> {
    fn id_values(&self) -> Vec<Value> {
        self.clone()
    }
}
