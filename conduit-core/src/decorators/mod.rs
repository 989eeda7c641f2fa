//! Decorators
//!
//! A decorator wraps one collection (or one data source) and exposes the same
//! contract, rewriting the schema, the incoming queries or the results on
//! the way through. Layers stack linearly; [`DecoratorsStack`] assembles the
//! standard order.

pub mod operators_emulate;
pub mod rename_collection;
pub mod rename_field;
pub mod stack;

pub use operators_emulate::{OperatorReplacer, OperatorsEmulateCollection};
pub use rename_collection::{RenameCollectionCollection, RenameCollectionDataSource};
pub use rename_field::RenameFieldCollection;
pub use stack::{CollectionCustomizer, DecoratorsStack};

use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::error::{ConfigurationError, Result};
use crate::schema::DataSourceSchema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Applies the same collection decorator to every collection of a data source.
///
/// Decorated collections keep a weak handle on this data source so they can
/// reach their decorated siblings.
pub struct DataSourceDecorator<C> {
    child: Arc<dyn DataSource>,
    collections: BTreeMap<String, Arc<C>>,
}

impl<C: Collection + 'static> DataSourceDecorator<C> {
    pub fn new<F>(child: Arc<dyn DataSource>, decorate: F) -> Arc<Self>
    where
        F: Fn(Arc<dyn Collection>, Weak<Self>) -> C,
    {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let collections = child
                .collections()
                .into_iter()
                .map(|collection| {
                    let name = collection.name().to_string();
                    (name, Arc::new(decorate(collection, this.clone())))
                })
                .collect();
            Self { child, collections }
        })
    }

    pub fn child(&self) -> &Arc<dyn DataSource> {
        &self.child
    }

    /// Decorated collection, with its concrete type
    pub fn decorated(&self, name: &str) -> Result<Arc<C>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }
}

#[async_trait]
impl<C: Collection + 'static> DataSource for DataSourceDecorator<C> {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.collections.values().map(|c| c.clone() as Arc<dyn Collection>).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        Ok(self.decorated(name)?)
    }

    fn schema(&self) -> DataSourceSchema {
        self.child.schema()
    }

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart> {
        self.child.render_chart(caller, name).await
    }
}

// Registration tables are only written while composing, a poisoned lock still holds usable data.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
