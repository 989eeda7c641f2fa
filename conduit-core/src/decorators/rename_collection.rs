//! Rename collections of a data source
//!
//! Renamed collections answer to their new name only. Relations of every
//! collection are rewritten so that `foreignCollection` and
//! `throughCollection` use the public names.

use super::{read, write};
use crate::collection::{upgrade, ActionFormField, ActionResult, Caller, Chart, Collection, DataSource};
use crate::error::{ConfigurationError, Result};
use crate::query::{AggregateResult, Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, DataSourceSchema, FieldSchema};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, Weak};

pub struct RenameCollectionDataSource {
    child: Arc<dyn DataSource>,
    this: Weak<Self>,
    state: RwLock<CollectionRenames>,
}

#[derive(Default)]
struct CollectionRenames {
    /// child name -> public name
    from_child: BTreeMap<String, String>,
    /// public name -> child name
    to_child: BTreeMap<String, String>,
    /// by public name
    collections: BTreeMap<String, Arc<RenameCollectionCollection>>,
}

impl RenameCollectionDataSource {
    pub fn new(child: Arc<dyn DataSource>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let collections = child
                .collections()
                .into_iter()
                .map(|collection| {
                    let name = collection.name().to_string();
                    let wrapper = RenameCollectionCollection::new(name.clone(), collection, this.clone());
                    (name, Arc::new(wrapper))
                })
                .collect();
            Self {
                child,
                this: this.clone(),
                state: RwLock::new(CollectionRenames { collections, ..Default::default() }),
            }
        })
    }

    pub fn rename_collection(&self, current: &str, new: &str) -> Result<()> {
        if current == new {
            return Ok(());
        }

        let mut state = write(&self.state);
        if state.collections.contains_key(new) {
            return Err(ConfigurationError::InvalidRename {
                from: current.to_string(),
                to: new.to_string(),
                reason: "a collection with this name already exists".to_string(),
            }
            .into());
        }
        let Some(previous) = state.collections.remove(current) else {
            return Err(ConfigurationError::CollectionNotFound(current.to_string()).into());
        };

        let child_name = state.to_child.remove(current).unwrap_or_else(|| current.to_string());
        if child_name == new {
            state.from_child.remove(&child_name);
        } else {
            state.from_child.insert(child_name.clone(), new.to_string());
            state.to_child.insert(new.to_string(), child_name);
        }

        let wrapper = RenameCollectionCollection::new(new.to_string(), previous.child.clone(), self.this.clone());
        state.collections.insert(new.to_string(), Arc::new(wrapper));
        log::debug!("Renamed collection '{}' to '{}'", current, new);
        Ok(())
    }

    /// Apply several renames, each keyed by the current public name
    pub fn rename_collections(&self, renames: impl IntoIterator<Item = (String, String)>) -> Result<()> {
        for (current, new) in renames {
            self.rename_collection(&current, &new)?;
        }
        Ok(())
    }

    fn public_name(&self, child_name: &str) -> String {
        read(&self.state).from_child.get(child_name).cloned().unwrap_or_else(|| child_name.to_string())
    }
}

#[async_trait]
impl DataSource for RenameCollectionDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        read(&self.state).collections.values().map(|c| c.clone() as Arc<dyn Collection>).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        read(&self.state)
            .collections
            .get(name)
            .map(|c| c.clone() as Arc<dyn Collection>)
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }

    fn schema(&self) -> DataSourceSchema {
        self.child.schema()
    }

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart> {
        self.child.render_chart(caller, name).await
    }
}

/// Collection seen under its public name
pub struct RenameCollectionCollection {
    name: String,
    child: Arc<dyn Collection>,
    data_source: Weak<RenameCollectionDataSource>,
}

impl RenameCollectionCollection {
    fn new(name: String, child: Arc<dyn Collection>, data_source: Weak<RenameCollectionDataSource>) -> Self {
        Self { name, child, data_source }
    }
}

#[async_trait]
impl Collection for RenameCollectionCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> CollectionSchema {
        let mut schema = self.child.schema();
        let Some(data_source) = self.data_source.upgrade() else {
            return schema;
        };

        for field in schema.fields.values_mut() {
            if let FieldSchema::Relation(relation) = field {
                relation.foreign_collection = data_source.public_name(&relation.foreign_collection);
                relation.through_collection =
                    relation.through_collection.as_deref().map(|through| data_source.public_name(through));
            }
        }
        schema
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(upgrade(&self.data_source)?)
    }

    async fn list(&self, caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        self.child.list(caller, filter, projection).await
    }

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        self.child.create(caller, records).await
    }

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        self.child.update(caller, filter, patch).await
    }

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()> {
        self.child.delete(caller, filter).await
    }

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        self.child.aggregate(caller, filter, aggregation, limit).await
    }

    async fn execute(&self, caller: &Caller, action: &str, form_values: RecordData, filter: &Filter) -> Result<ActionResult> {
        self.child.execute(caller, action, form_values, filter).await
    }

    async fn get_form(
        &self,
        caller: &Caller,
        action: &str,
        form_values: Option<RecordData>,
        filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        self.child.get_form(caller, action, form_values, filter).await
    }
}
