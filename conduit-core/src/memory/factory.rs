//! `memory` data-source factory

use super::MemoryDataSource;
use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::datasource::DataSourceFactory;
use crate::error::Result;
use crate::record::RecordData;
use crate::schema::{CollectionSchema, FieldSchema};
use crate::validation::rules;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a [`MemoryDataSource`] from a connection definition:
///
/// ```json
/// {"type": "memory", "collections": {"books": {"fields": {...}, "records": [...]}}, "charts": {...}}
/// ```
///
/// Columns declaring no `filterOperators` get every operator their column
/// type allows.
pub struct MemoryDataSourceFactory;

#[derive(Deserialize)]
struct MemoryDefinition {
    #[serde(default)]
    collections: BTreeMap<String, MemoryCollectionDefinition>,
    #[serde(default)]
    charts: BTreeMap<String, Chart>,
}

#[derive(Deserialize)]
struct MemoryCollectionDefinition {
    #[serde(flatten)]
    schema: CollectionSchema,
    #[serde(default)]
    records: Vec<RecordData>,
}

#[async_trait]
impl DataSourceFactory for MemoryDataSourceFactory {
    fn kind(&self) -> &str {
        "memory"
    }

    async fn create(&self, definition: &Value) -> Result<Arc<dyn DataSource>> {
        let definition: MemoryDefinition = serde_json::from_value(definition.clone())?;

        let mut schemas = BTreeMap::new();
        let mut seeds = Vec::new();
        for (name, mut collection) in definition.collections {
            for field in collection.schema.fields.values_mut() {
                if let FieldSchema::Column(column) = field {
                    if column.filter_operators.is_empty() {
                        column.filter_operators = rules::operators_for_column_type(column.column_type).into_iter().collect();
                    }
                }
            }
            seeds.push((name.clone(), collection.records));
            schemas.insert(name, collection.schema);
        }

        let data_source = MemoryDataSource::with_charts(schemas, definition.charts);
        for (name, records) in seeds {
            if records.is_empty() {
                continue;
            }
            let count = records.len();
            data_source.collection(&name)?.create(&Caller::default(), records).await?;
            log::debug!("Seeded memory collection '{}' with {} record(s)", name, count);
        }

        log::info!("📦 Memory data source ready ({} collection(s))", data_source.collections().len());
        Ok(data_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ConditionTree, Operator, PaginatedFilter, Projection};
    use serde_json::json;

    #[tokio::test]
    async fn builds_seeded_collections() {
        let definition = json!({
            "type": "memory",
            "collections": {
                "post": {
                    "fields": {
                        "id": {"type": "Column", "columnType": "Number", "isPrimaryKey": true},
                        "title": {"type": "Column", "columnType": "String", "filterOperators": ["equal"]}
                    },
                    "records": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}]
                }
            }
        });

        let data_source = MemoryDataSourceFactory.create(&definition).await.unwrap();
        let post = data_source.get_collection("post").unwrap();
        let schema = post.schema();

        assert!(schema.column("id").unwrap().filter_operators.contains(&Operator::In));
        assert_eq!(schema.column("title").unwrap().filter_operators.len(), 1);

        let filter = PaginatedFilter::from_tree(ConditionTree::leaf("title", Operator::Equal, json!("B")));
        let rows = post.list(&Caller::default(), &filter, &Projection::new(["id"])).await.unwrap();
        assert_eq!(rows, vec![json!({"id": 2}).as_object().cloned().unwrap()]);
    }

    #[tokio::test]
    async fn rejects_malformed_definitions() {
        let definition = json!({"type": "memory", "collections": {"post": {"fields": 3}}});
        assert!(MemoryDataSourceFactory.create(&definition).await.is_err());
    }
}
