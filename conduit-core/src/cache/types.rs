//! Change feed types and the origin contract

use crate::error::Result;
use crate::record::{CompositeId, RecordData};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A record created or modified at the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordChange {
    pub collection: String,
    pub record: RecordData,
}

/// A record removed at the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDeletion {
    pub collection: String,
    pub id: CompositeId,
}

/// Everything that happened at the origin since a cursor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Position to resume from on the next call
    pub cursor: String,
    #[serde(default)]
    pub changes: Vec<RecordChange>,
    #[serde(default)]
    pub deletions: Vec<RecordDeletion>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.deletions.is_empty()
    }
}

/// The remote system a cached data source mirrors.
///
/// Reads are served from the mirror; writes go through here and come back
/// through `list_changes`.
#[async_trait]
pub trait CacheOrigin: Send + Sync {
    /// Changes since `cursor`, or the full state when `cursor` is `None`
    async fn list_changes(&self, cursor: Option<&str>) -> Result<ChangeSet>;

    /// Create a record, returning it as stored (with its generated id)
    async fn create_record(&self, collection: &str, record: RecordData) -> Result<RecordData>;

    async fn update_record(&self, collection: &str, id: CompositeId, patch: RecordData) -> Result<()>;

    async fn delete_record(&self, collection: &str, id: CompositeId) -> Result<()>;
}
