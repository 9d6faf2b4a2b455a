use crate::{Context, Entity, EntityMeta, Error, PersistenceError, Result};
use std::{
    any::{self, Any, TypeId},
    collections::HashMap,
    sync::{Arc, LazyLock, RwLock},
};

type Published = Arc<dyn Any + Send + Sync>;

/// Cache of entity descriptors.
///
/// Descriptors are built lazily on first use and never change afterwards. Two
/// threads resolving the same entity concurrently may both build it, only the
/// first one is published and both receive that instance.
#[derive(Default)]
pub struct EntityMetaRegistry {
    metas: RwLock<HashMap<TypeId, Published>>,
}

static GLOBAL: LazyLock<Arc<EntityMetaRegistry>> =
    LazyLock::new(|| Arc::new(EntityMetaRegistry::new()));

impl EntityMetaRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Process wide registry, for callers that do not inject their own.
    pub fn global() -> Arc<EntityMetaRegistry> {
        GLOBAL.clone()
    }

    pub fn load<E: Entity>(&self) -> Result<Arc<EntityMeta<E>>> {
        if let Some(meta) = self.lookup::<E>()? {
            return Ok(meta);
        }
        let built: Published = Arc::new(
            E::describe()
                .with_context(|| format!("While describing entity `{}`", any::type_name::<E>()))?,
        );
        let published = {
            let mut metas = self
                .metas
                .write()
                .map_err(|e| Error::msg(e.to_string()))?;
            metas.entry(TypeId::of::<E>()).or_insert(built).clone()
        };
        log::debug!("Entity `{}` registered", any::type_name::<E>());
        Self::downcast::<E>(published)
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.metas
            .read()
            .is_ok_and(|v| v.contains_key(&TypeId::of::<E>()))
    }

    pub fn len(&self) -> usize {
        self.metas.read().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<E: Entity>(&self) -> Result<Option<Arc<EntityMeta<E>>>> {
        let metas = self.metas.read().map_err(|e| Error::msg(e.to_string()))?;
        metas
            .get(&TypeId::of::<E>())
            .cloned()
            .map(Self::downcast::<E>)
            .transpose()
    }

    fn downcast<E: Entity>(published: Published) -> Result<Arc<EntityMeta<E>>> {
        published.downcast::<EntityMeta<E>>().map_err(|_| {
            PersistenceError::configuration(format!(
                "The descriptor registered for `{}` has an unexpected type",
                any::type_name::<E>()
            ))
        })
    }
}
