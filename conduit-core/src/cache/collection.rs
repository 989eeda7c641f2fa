use super::CachedDataSource;
use crate::collection::{upgrade, ActionFormField, ActionResult, Caller, Collection, DataSource};
use crate::error::Result;
use crate::query::{AggregateResult, Aggregation, ConditionTreeFactory, Filter, PaginatedFilter, Projection};
use crate::record::{self, CompositeId, RecordData};
use crate::schema::CollectionSchema;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::{Arc, Weak};

/// Collection reading from the mirror and writing through the origin
pub struct CachedCollection {
    mirror: Arc<dyn Collection>,
    data_source: Weak<CachedDataSource>,
}

impl CachedCollection {
    pub(super) fn new(mirror: Arc<dyn Collection>, data_source: Weak<CachedDataSource>) -> Self {
        Self { mirror, data_source }
    }

    fn owner(&self) -> Result<Arc<CachedDataSource>> {
        upgrade(&self.data_source)
    }

    /// Ids of the mirrored records matching `filter`
    async fn target_ids(&self, caller: &Caller, filter: &Filter) -> Result<Vec<CompositeId>> {
        let schema = self.mirror.schema();
        let rows = self
            .mirror
            .list(caller, &PaginatedFilter::from(filter.clone()), &Projection::primary_keys_of(&schema))
            .await?;
        rows.iter().map(|row| record::primary_key(&schema, row)).collect()
    }
}

#[async_trait]
impl Collection for CachedCollection {
    fn name(&self) -> &str {
        self.mirror.name()
    }

    fn schema(&self) -> CollectionSchema {
        self.mirror.schema()
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(self.owner()?)
    }

    async fn list(&self, caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        self.owner()?.ensure_synced(self.name()).await?;
        self.mirror.list(caller, filter, projection).await
    }

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        let owner = self.owner()?;
        owner.ensure_synced(self.name()).await?;

        let origin = owner.origin();
        let created = try_join_all(records.into_iter().map(|record| origin.create_record(self.name(), record))).await?;
        log::debug!("Created {} record(s) in '{}' at the origin", created.len(), self.name());

        // The created records come back through the feed, even without sync on read
        owner.sync().await?;
        let schema = self.schema();
        let filter = PaginatedFilter::from_tree(ConditionTreeFactory::match_records(&schema, &created)?);
        self.mirror.list(caller, &filter, &Projection::columns_of(&schema)).await
    }

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        let owner = self.owner()?;
        owner.ensure_synced(self.name()).await?;

        let ids = self.target_ids(caller, filter).await?;
        let origin = owner.origin();
        try_join_all(ids.into_iter().map(|id| origin.update_record(self.name(), id, patch.clone()))).await?;
        Ok(())
    }

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()> {
        let owner = self.owner()?;
        owner.ensure_synced(self.name()).await?;

        let ids = self.target_ids(caller, filter).await?;
        let origin = owner.origin();
        try_join_all(ids.into_iter().map(|id| origin.delete_record(self.name(), id))).await?;
        Ok(())
    }

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        self.owner()?.ensure_synced(self.name()).await?;
        self.mirror.aggregate(caller, filter, aggregation, limit).await
    }

    async fn execute(&self, caller: &Caller, action: &str, form_values: RecordData, filter: &Filter) -> Result<ActionResult> {
        self.mirror.execute(caller, action, form_values, filter).await
    }

    async fn get_form(
        &self,
        caller: &Caller,
        action: &str,
        form_values: Option<RecordData>,
        filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        self.mirror.get_form(caller, action, form_values, filter).await
    }
}
