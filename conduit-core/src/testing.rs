//! Shared fixtures for unit tests
//!
//! A small library: `books` point at their author in `persons`.

use crate::cache::{CacheOrigin, ChangeSet, RecordChange, RecordDeletion};
use crate::collection::{Caller, Collection};
use crate::error::Result;
use crate::memory::MemoryDataSource;
use crate::query::Operator::{self, *};
use crate::record::{CompositeId, RecordData};
use crate::schema::{CollectionSchema, ColumnSchema, ColumnType, RelationSchema};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn record(value: Value) -> RecordData {
    value.as_object().cloned().unwrap_or_default()
}

pub fn column(column_type: ColumnType, operators: impl IntoIterator<Item = Operator>) -> ColumnSchema {
    ColumnSchema::new(column_type).with_operators(operators)
}

pub fn pk(column_type: ColumnType) -> ColumnSchema {
    column(column_type, [Equal, In]).primary_key()
}

/// `year` deliberately lacks `greater_than_or_equal`
pub fn books_schema() -> CollectionSchema {
    CollectionSchema::new()
        .with_field("id", pk(ColumnType::Number))
        .with_field("title", column(ColumnType::String, [Equal, NotEqual, Present, Contains, In]))
        .with_field("year", column(ColumnType::Number, [Equal, GreaterThan, LessThan, In]))
        .with_field(
            "genre",
            column(ColumnType::Enum, [Equal, In]).with_enum_values(["sf", "fantasy"]),
        )
        .with_field("published", column(ColumnType::Date, [LessThan, GreaterThan]))
        .with_field("created", column(ColumnType::Date, []).read_only())
        .with_field("location", column(ColumnType::Point, [Equal]))
        .with_field("author_id", column(ColumnType::Number, [Equal, In]))
        .with_field("author", RelationSchema::many_to_one("persons", "author_id", "id"))
}

/// `age` deliberately lacks `greater_than_or_equal`
pub fn persons_schema() -> CollectionSchema {
    CollectionSchema::new()
        .with_field("id", pk(ColumnType::Number))
        .with_field("name", column(ColumnType::String, [Equal, In, Contains]))
        .with_field("age", column(ColumnType::Number, [Equal, GreaterThan, LessThan, In]).with_default(json!(0)))
}

/// Library schemas, no records
pub fn library_schema_only() -> Arc<MemoryDataSource> {
    MemoryDataSource::new(BTreeMap::from([
        ("books".to_string(), books_schema()),
        ("persons".to_string(), persons_schema()),
    ]))
}

/// Library with three authors and four books
pub async fn library() -> Arc<MemoryDataSource> {
    let library = library_schema_only();
    let caller = Caller::default();

    let persons = [
        json!({"id": 1, "name": "Isaac Asimov", "age": 72}),
        json!({"id": 2, "name": "Frank Herbert", "age": 65}),
        json!({"id": 3, "name": "Ursula K. Le Guin", "age": 88}),
    ];
    let books = [
        json!({"id": 1, "title": "Foundation", "year": 1951, "genre": "sf", "author_id": 1}),
        json!({"id": 2, "title": "Dune", "year": 1965, "genre": "sf", "author_id": 2}),
        json!({"id": 3, "title": "A Wizard of Earthsea", "year": 1968, "genre": "fantasy", "author_id": 3}),
        json!({"id": 4, "title": "I, Robot", "year": 1950, "genre": "sf", "author_id": 1}),
    ];

    for (name, rows) in [("persons", &persons[..]), ("books", &books[..])] {
        let collection = library.collection(name).unwrap();
        collection.create(&caller, rows.iter().cloned().map(record).collect()).await.unwrap();
    }
    library
}

#[derive(Default)]
struct OriginState {
    stored: BTreeMap<String, Vec<RecordData>>,
    pending: ChangeSet,
    cursors_seen: Vec<Option<String>>,
    version: u64,
    next_id: i64,
}

/// Origin keeping records in memory and replaying every write as a change
#[derive(Default)]
pub struct FakeOrigin {
    state: Mutex<OriginState>,
    list_calls: AtomicUsize,
    delay: Duration,
}

impl FakeOrigin {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Origin whose `list_changes` takes `delay` to answer
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay, ..Self::default() })
    }

    pub fn push_change(&self, collection: &str, record: RecordData) {
        let mut state = self.state.lock().unwrap();
        let rows = state.stored.entry(collection.to_string()).or_default();
        rows.retain(|r| r.get("id") != record.get("id"));
        rows.push(record.clone());
        state.pending.changes.push(RecordChange { collection: collection.to_string(), record });
    }

    pub fn push_deletion(&self, collection: &str, id: CompositeId) {
        let mut state = self.state.lock().unwrap();
        if let Some(rows) = state.stored.get_mut(collection) {
            rows.retain(|r| r.get("id") != id.first());
        }
        state.pending.deletions.push(RecordDeletion { collection: collection.to_string(), id });
    }

    pub fn stored(&self, collection: &str) -> Vec<RecordData> {
        self.state.lock().unwrap().stored.get(collection).cloned().unwrap_or_default()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn cursors_seen(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().cursors_seen.clone()
    }
}

#[async_trait]
impl CacheOrigin for FakeOrigin {
    async fn list_changes(&self, cursor: Option<&str>) -> Result<ChangeSet> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.cursors_seen.push(cursor.map(str::to_string));
        state.version += 1;
        let mut changes = std::mem::take(&mut state.pending);
        changes.cursor = format!("c{}", state.version);
        Ok(changes)
    }

    async fn create_record(&self, collection: &str, mut record: RecordData) -> Result<RecordData> {
        {
            let mut state = self.state.lock().unwrap();
            let max = state
                .stored
                .get(collection)
                .into_iter()
                .flatten()
                .filter_map(|r| r.get("id").and_then(Value::as_i64))
                .max()
                .unwrap_or(0);
            state.next_id = state.next_id.max(max) + 1;
            record.insert("id".to_string(), json!(state.next_id));
        }
        self.push_change(collection, record.clone());
        Ok(record)
    }

    async fn update_record(&self, collection: &str, id: CompositeId, patch: RecordData) -> Result<()> {
        let current = self.stored(collection).into_iter().find(|r| r.get("id") == id.first());
        if let Some(mut record) = current {
            record.extend(patch);
            self.push_change(collection, record);
        }
        Ok(())
    }

    async fn delete_record(&self, collection: &str, id: CompositeId) -> Result<()> {
        self.push_deletion(collection, id);
        Ok(())
    }
}
