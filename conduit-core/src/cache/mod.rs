//! Cached data source
//!
//! A [`CachedDataSource`] serves reads from a local mirror data source and
//! keeps it current by pulling a change feed from a [`CacheOrigin`]. Writes
//! are forwarded to the origin and observed back through the feed.
//!
//! `sync()` is single-flight: callers that queue behind a running sync
//! return as soon as it completes, so the cursor only advances once per
//! fetched change set and only after the changes reached the mirror.

mod collection;
mod types;

pub use collection::CachedCollection;
pub use types::{CacheOrigin, ChangeSet, RecordChange, RecordDeletion};

use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::config::CacheConfig;
use crate::error::{ConfigurationError, Error, Result};
use crate::memory::MemoryDataSource;
use crate::query::{ConditionTreeFactory, Filter};
use crate::record::{CompositeId, RecordData};
use crate::schema::{CollectionSchema, DataSourceSchema};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct SyncState {
    cursor: Option<String>,
}

pub struct CachedDataSource {
    mirror: Arc<MemoryDataSource>,
    origin: Arc<dyn CacheOrigin>,
    config: CacheConfig,
    collections: BTreeMap<String, Arc<CachedCollection>>,
    state: Mutex<SyncState>,
    /// Completed syncs, used to detect that a queued caller was served
    generation: AtomicU64,
    synced: AtomicBool,
}

impl CachedDataSource {
    /// Cache over `mirror`.
    ///
    /// When the config sets a sync interval and a tokio runtime is running,
    /// the background sync loop starts right away.
    pub fn new(mirror: Arc<MemoryDataSource>, origin: Arc<dyn CacheOrigin>, config: CacheConfig) -> Arc<Self> {
        let source = Arc::new_cyclic(|this: &Weak<Self>| {
            let collections = mirror
                .collections()
                .into_iter()
                .map(|child| {
                    let name = child.name().to_string();
                    (name, Arc::new(CachedCollection::new(child, this.clone())))
                })
                .collect();

            Self {
                mirror,
                origin,
                config,
                collections,
                state: Mutex::new(SyncState::default()),
                generation: AtomicU64::new(0),
                synced: AtomicBool::new(false),
            }
        });

        if let Some(period) = source.config.sync_interval() {
            if tokio::runtime::Handle::try_current().is_ok() {
                source.spawn_sync_loop(period);
            } else {
                log::warn!("No tokio runtime, background sync every {:?} not started", period);
            }
        }
        source
    }

    /// Cache whose mirror is a fresh in-memory store
    pub fn with_memory_mirror(
        schemas: BTreeMap<String, CollectionSchema>,
        origin: Arc<dyn CacheOrigin>,
        config: CacheConfig,
    ) -> Arc<Self> {
        Self::new(MemoryDataSource::new(schemas), origin, config)
    }

    pub fn origin(&self) -> &Arc<dyn CacheOrigin> {
        &self.origin
    }

    /// True once a sync has completed
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    /// Cursor of the last applied change set
    pub async fn cursor(&self) -> Option<String> {
        self.state.lock().await.cursor.clone()
    }

    /// Pull the changes since the stored cursor into the mirror
    pub async fn sync(&self) -> Result<()> {
        let observed = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            return Ok(());
        }

        let change_set = self.origin.list_changes(state.cursor.as_deref()).await?;
        let (changes, deletions) = (change_set.changes.len(), change_set.deletions.len());

        let mut upserts: BTreeMap<String, Vec<RecordData>> = BTreeMap::new();
        for change in change_set.changes {
            upserts.entry(change.collection).or_default().push(change.record);
        }
        for (collection, records) in upserts {
            self.mirror.collection(&collection)?.replace_records(records).await?;
        }
        for deletion in change_set.deletions {
            self.remove(&deletion.collection, deletion.id).await?;
        }

        if changes + deletions > 0 {
            log::info!(
                "🔄 Synced {} change(s) and {} deletion(s), cursor {:?} -> {}",
                changes,
                deletions,
                state.cursor,
                change_set.cursor
            );
        } else {
            log::debug!("Sync found no changes at cursor {}", change_set.cursor);
        }

        state.cursor = Some(change_set.cursor);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.synced.store(true, Ordering::Release);
        Ok(())
    }

    /// Sync every `period` until the data source is dropped
    pub fn spawn_sync_loop(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let this = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(source) = this.upgrade() else {
                    log::debug!("Cached data source dropped, stopping sync loop");
                    break;
                };
                if let Err(err) = source.sync().await {
                    log::warn!("Background sync failed: {}", err);
                }
            }
        })
    }

    /// Sync before serving `collection`, or refuse when the mirror was never filled
    pub(crate) async fn ensure_synced(&self, collection: &str) -> Result<()> {
        if self.config.sync_on_read {
            return self.sync().await;
        }
        if !self.is_synced() {
            return Err(Error::NotSynced { collection: collection.to_string() });
        }
        Ok(())
    }

    async fn remove(&self, collection: &str, id: CompositeId) -> Result<()> {
        let mirror = self.mirror.get_collection(collection)?;
        let schema = mirror.schema();
        let filter = Filter::from_tree(ConditionTreeFactory::match_ids(&schema, &[id])?);
        mirror.delete(&Caller::default(), &filter).await
    }
}

#[async_trait]
impl DataSource for CachedDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.collections.values().map(|c| c.clone() as Arc<dyn Collection>).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        self.collections
            .get(name)
            .map(|c| c.clone() as Arc<dyn Collection>)
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }

    fn schema(&self) -> DataSourceSchema {
        self.mirror.schema()
    }

    async fn render_chart(&self, caller: &Caller, name: &str) -> Result<Chart> {
        self.mirror.render_chart(caller, name).await
    }
}
