//! In-memory collection

use super::MemoryDataSource;
use crate::collection::{upgrade, Caller, Collection, DataSource};
use crate::error::{Result, ValidationError};
use crate::query::{AggregateResult, Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::{self, CompositeId, RecordData};
use crate::schema::{CollectionSchema, ColumnType, RelationType};
use crate::validation;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

/// Schema-driven in-memory collection.
///
/// Records keep their insertion order. Relation paths are resolved by
/// joining against sibling collections of the same [`MemoryDataSource`].
pub struct MemoryCollection {
    name: String,
    schema: CollectionSchema,
    records: RwLock<Vec<RecordData>>,
    data_source: Weak<MemoryDataSource>,
}

impl MemoryCollection {
    pub(super) fn new(name: String, schema: CollectionSchema, data_source: Weak<MemoryDataSource>) -> Self {
        Self { name, schema, records: RwLock::new(Vec::new()), data_source }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    async fn snapshot(&self) -> Vec<RecordData> {
        self.records.read().await.clone()
    }

    /// Attach the foreign record of every to-one relation the projection goes through
    fn hydrate<'a>(&'a self, records: &'a mut [RecordData], projection: &'a Projection) -> BoxFuture<'a, Result<()>> {
        async move {
            for (prefix, sub) in projection.relations() {
                let Some(relation) = self.schema.relation(&prefix) else {
                    continue;
                };
                let keys = match relation.kind {
                    RelationType::ManyToOne => (&relation.foreign_key, &relation.foreign_key_target),
                    RelationType::OneToOne => (&relation.origin_key_target, &relation.origin_key),
                    RelationType::OneToMany | RelationType::ManyToMany => continue,
                };
                let (Some(local_key), Some(foreign_key)) = keys else {
                    continue;
                };

                let foreign = upgrade(&self.data_source)?.collection(&relation.foreign_collection)?;
                let mut foreign_records = foreign.snapshot().await;
                foreign.hydrate(&mut foreign_records, &sub).await?;

                for record in records.iter_mut() {
                    let local = record.get(local_key).cloned().unwrap_or(Value::Null);
                    let found = if local.is_null() {
                        None
                    } else {
                        foreign_records
                            .iter()
                            .find(|f| f.get(foreign_key).is_some_and(|v| record::values_equal(v, &local)))
                    };
                    record.insert(prefix.clone(), found.cloned().map(Value::Object).unwrap_or(Value::Null));
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Hydrated records matching the filter
    ///
    /// A declared segment selects every record: segment queries belong to
    /// the host that declared them. An undeclared one is refused.
    async fn select(&self, filter: &Filter, extra: &Projection) -> Result<Vec<RecordData>> {
        if let Some(segment) = filter.segment.as_ref().filter(|s| !self.schema.segments.contains(s)) {
            return Err(ValidationError::UnknownSegment { segment: segment.clone(), collection: self.name.clone() }.into());
        }

        let mut needed = extra.clone();
        if let Some(tree) = &filter.condition_tree {
            needed = needed.union(&tree.projection());
        }

        let mut records = self.snapshot().await;
        self.hydrate(&mut records, &needed).await?;

        if let Some(search) = filter.search.as_deref().filter(|_| self.schema.searchable) {
            let needle = search.to_lowercase();
            records.retain(|record| self.matches_search(record, &needle));
        }
        Ok(match &filter.condition_tree {
            Some(tree) => tree.filter_records(records),
            None => records,
        })
    }

    fn matches_search(&self, record: &RecordData, needle: &str) -> bool {
        self.schema
            .columns()
            .filter(|(_, column)| matches!(column.column_type, ColumnType::String | ColumnType::Enum))
            .filter_map(|(name, _)| record.get(name).and_then(Value::as_str))
            .any(|value| value.to_lowercase().contains(needle))
    }

    async fn matching_ids(&self, filter: &Filter) -> Result<Vec<CompositeId>> {
        self.select(filter, &Projection::default())
            .await?
            .iter()
            .map(|r| record::primary_key(&self.schema, r))
            .collect()
    }
}

impl MemoryCollection {
    /// Fill column defaults and validate
    fn prepare(&self, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        records
            .into_iter()
            .map(|mut record| {
                for (name, column) in self.schema.columns() {
                    if let (false, Some(default)) = (record.contains_key(name), &column.default_value) {
                        record.insert(name.clone(), default.clone());
                    }
                }
                validation::validate_record(&record, self)?;
                Ok(record)
            })
            .collect()
    }

    /// Store whole records, replacing the ones with the same primary key in
    /// place. Read-only columns are written too.
    ///
    /// The batch is applied under one write lock, so readers never observe a
    /// replaced record as missing.
    pub async fn replace_records(&self, records: Vec<RecordData>) -> Result<()> {
        let prepared = self.prepare(records)?;
        let ids = prepared
            .iter()
            .map(|record| record::primary_key(&self.schema, record))
            .collect::<Result<Vec<_>>>()?;

        let mut store = self.records.write().await;
        for (record, id) in prepared.into_iter().zip(ids) {
            let position = store
                .iter()
                .position(|r| record::primary_key(&self.schema, r).is_ok_and(|existing| same_id(&existing, &id)));
            match position {
                Some(index) => store[index] = record,
                None => store.push(record),
            }
        }
        Ok(())
    }
}

fn same_id(a: &CompositeId, b: &CompositeId) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| record::values_equal(x, y))
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> CollectionSchema {
        self.schema.clone()
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(upgrade(&self.data_source)?)
    }

    async fn list(&self, _caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        validation::validate_paginated_filter(filter, self)?;
        validation::validate_projection(projection, self)?;

        let needed = projection.clone().union(&filter.sort.projection());
        let mut records = self.select(filter, &needed).await?;
        filter.sort.apply(&mut records);
        let records = match filter.page {
            Some(page) => page.apply(records),
            None => records,
        };

        Ok(records.iter().map(|record| projection.apply(record)).collect())
    }

    async fn create(&self, _caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        let mut prepared = self.prepare(records)?;

        let primary_keys = self.schema.primary_keys();
        let auto_increment = match primary_keys.as_slice() {
            [pk] => self.schema.column(pk).filter(|c| c.column_type == ColumnType::Number).map(|_| pk.clone()),
            _ => None,
        };

        let mut store = self.records.write().await;
        let mut ids: Vec<CompositeId> =
            store.iter().filter_map(|r| record::primary_key(&self.schema, r).ok()).collect();
        let mut next_id = ids.iter().filter_map(|id| id.first().and_then(Value::as_i64)).max().unwrap_or(0) + 1;

        for record in prepared.iter_mut() {
            if let Some(pk) = &auto_increment {
                if record.get(pk).map_or(true, Value::is_null) {
                    record.insert(pk.clone(), Value::from(next_id));
                    next_id += 1;
                }
            }
            let id = record::primary_key(&self.schema, record)?;
            if ids.iter().any(|existing| same_id(existing, &id)) {
                return Err(ValidationError::DuplicatePrimaryKey(Value::Array(id).to_string()).into());
            }
            ids.push(id);
        }

        store.extend(prepared.iter().cloned());
        log::debug!("Inserted {} record(s) into memory collection '{}'", prepared.len(), self.name);
        Ok(prepared)
    }

    async fn update(&self, _caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        validation::validate_filter(filter, self)?;
        validation::validate_record(&patch, self)?;
        if let Some(field) = patch.keys().find(|f| self.schema.column(f).is_some_and(|c| c.is_read_only)) {
            return Err(ValidationError::ReadOnlyField { field: field.clone(), collection: self.name.clone() }.into());
        }

        let ids = self.matching_ids(filter).await?;
        let mut store = self.records.write().await;
        for record in store.iter_mut() {
            let Ok(id) = record::primary_key(&self.schema, record) else {
                continue;
            };
            if ids.iter().any(|matching| same_id(matching, &id)) {
                for (key, value) in &patch {
                    record.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, _caller: &Caller, filter: &Filter) -> Result<()> {
        validation::validate_filter(filter, self)?;

        let ids = self.matching_ids(filter).await?;
        let mut store = self.records.write().await;
        let before = store.len();
        store.retain(|record| match record::primary_key(&self.schema, record) {
            Ok(id) => !ids.iter().any(|matching| same_id(matching, &id)),
            Err(_) => true,
        });
        log::debug!("Deleted {} record(s) from memory collection '{}'", before - store.len(), self.name);
        Ok(())
    }

    async fn aggregate(
        &self,
        _caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        validation::validate_filter(filter, self)?;
        validation::validate_aggregation(aggregation, self)?;

        let records = self.select(filter, &aggregation.projection()).await?;
        Ok(aggregation.apply(&records, limit))
    }
}
