//! Native in-memory store
//!
//! A [`MemoryDataSource`] implements the whole collection contract over
//! plain vectors of records. It backs the cache mirror, the standalone
//! server's `memory` factory and most tests.

mod collection;
mod factory;

pub use collection::MemoryCollection;
pub use factory::MemoryDataSourceFactory;

use crate::collection::{Caller, Chart, Collection, DataSource};
use crate::error::{ConfigurationError, Result};
use crate::schema::{CollectionSchema, DataSourceSchema};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

pub struct MemoryDataSource {
    collections: BTreeMap<String, Arc<MemoryCollection>>,
    charts: BTreeMap<String, Chart>,
}

impl MemoryDataSource {
    pub fn new(schemas: BTreeMap<String, CollectionSchema>) -> Arc<Self> {
        Self::with_charts(schemas, BTreeMap::new())
    }

    /// Data source rendering each named chart as the stored value
    pub fn with_charts(schemas: BTreeMap<String, CollectionSchema>, charts: BTreeMap<String, Chart>) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let collections = schemas
                .into_iter()
                .map(|(name, schema)| {
                    let collection = MemoryCollection::new(name.clone(), schema, this.clone());
                    (name, Arc::new(collection))
                })
                .collect();
            Self { collections, charts }
        })
    }

    /// Concrete collection, for callers that need more than the contract
    pub fn collection(&self, name: &str) -> Result<Arc<MemoryCollection>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::CollectionNotFound(name.to_string()).into())
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    fn collections(&self) -> Vec<Arc<dyn Collection>> {
        self.collections.values().map(|c| c.clone() as Arc<dyn Collection>).collect()
    }

    fn get_collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        Ok(self.collection(name)?)
    }

    fn schema(&self) -> DataSourceSchema {
        DataSourceSchema { charts: self.charts.keys().cloned().collect() }
    }

    async fn render_chart(&self, _caller: &Caller, name: &str) -> Result<Chart> {
        self.charts
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownChart(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationError};
    use crate::query::{
        Aggregation, AggregationOperation, ConditionTree, Filter, Operator, Page, PaginatedFilter, Projection, Sort,
    };
    use crate::testing::{self, record};
    use serde_json::json;

    fn titles(records: &[crate::RecordData]) -> Vec<String> {
        records.iter().filter_map(|r| r["title"].as_str().map(str::to_string)).collect()
    }

    #[tokio::test]
    async fn list_filters_sorts_pages_and_projects() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();

        let filter = PaginatedFilter::from_tree(ConditionTree::leaf("genre", Operator::Equal, json!("sf")))
            .with_sort(Sort::descending("year"))
            .with_page(Some(Page::new(1, 2)));
        let rows = books.list(&Caller::default(), &filter, &Projection::new(["id", "title"])).await.unwrap();

        assert_eq!(rows, vec![record(json!({"id": 1, "title": "Foundation"})), record(json!({"id": 4, "title": "I, Robot"}))]);
    }

    #[tokio::test]
    async fn relation_paths_are_hydrated() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();

        let filter = PaginatedFilter::from_tree(ConditionTree::leaf("author:name", Operator::Equal, json!("Isaac Asimov")))
            .with_sort(Sort::ascending("id"));
        let rows = books.list(&Caller::default(), &filter, &Projection::new(["title", "author:name"])).await.unwrap();

        assert_eq!(titles(&rows), ["Foundation", "I, Robot"]);
        assert_eq!(rows[0]["author"], json!({"name": "Isaac Asimov"}));
    }

    #[tokio::test]
    async fn invalid_filters_fail_before_reading() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();

        let filter = PaginatedFilter::from_tree(ConditionTree::leaf("isbn", Operator::Equal, json!("x")));
        let err = books.list(&Caller::default(), &filter, &Projection::new(["id"])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::FieldNotFound { .. })));
    }

    #[tokio::test]
    async fn create_assigns_ids_and_defaults() {
        let library = testing::library().await;
        let persons = library.collection("persons").unwrap();

        let created = persons
            .create(&Caller::default(), vec![record(json!({"name": "Octavia Butler"}))])
            .await
            .unwrap();
        assert_eq!(created[0]["id"], json!(4));
        assert_eq!(created[0]["age"], json!(0));
        assert_eq!(persons.len().await, 4);

        let err = persons
            .create(&Caller::default(), vec![record(json!({"id": 1, "name": "Impostor"}))])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::DuplicatePrimaryKey(_))));
        assert_eq!(persons.len().await, 4);
    }

    #[tokio::test]
    async fn update_and_delete_touch_matching_records_only() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();
        let caller = Caller::default();

        let fantasy = Filter::from_tree(ConditionTree::leaf("genre", Operator::Equal, json!("fantasy")));
        books.update(&caller, &fantasy, record(json!({"year": 1969}))).await.unwrap();
        let rows = books.list(&caller, &fantasy.clone().into(), &Projection::new(["year"])).await.unwrap();
        assert_eq!(rows, vec![record(json!({"year": 1969}))]);

        let by_asimov = Filter::from_tree(ConditionTree::leaf("author:name", Operator::Equal, json!("Isaac Asimov")));
        books.delete(&caller, &by_asimov).await.unwrap();
        let rows = books
            .list(&caller, &PaginatedFilter::new().with_sort(Sort::ascending("id")), &Projection::new(["id"]))
            .await
            .unwrap();
        assert_eq!(rows, vec![record(json!({"id": 2})), record(json!({"id": 3}))]);
    }

    #[tokio::test]
    async fn read_only_columns_reject_patches() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();

        let err = books
            .update(&Caller::default(), &Filter::new(), record(json!({"created": "2020-01-01T00:00:00Z"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::ReadOnlyField { .. })));
    }

    #[tokio::test]
    async fn aggregate_groups_by_relation() {
        let library = testing::library().await;
        let books = library.get_collection("books").unwrap();

        let aggregation = Aggregation::count().group_by("author:name", None);
        let rows = books.aggregate(&Caller::default(), &Filter::new(), &aggregation, Some(1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, json!(2));
        assert_eq!(rows[0].group["author:name"], json!("Isaac Asimov"));

        let avg = Aggregation::new(AggregationOperation::Max, "year");
        let rows = books.aggregate(&Caller::default(), &Filter::new(), &avg, None).await.unwrap();
        assert_eq!(rows[0].value, json!(1968));
    }

    #[tokio::test]
    async fn replace_records_swaps_in_place() {
        let library = testing::library().await;
        let persons = library.collection("persons").unwrap();

        persons
            .replace_records(vec![
                record(json!({"id": 2, "name": "Frank Herbert", "age": 66})),
                record(json!({"id": 9, "name": "Ursula K. Le Guin"})),
            ])
            .await
            .unwrap();

        let rows = persons.list(&Caller::default(), &PaginatedFilter::new(), &Projection::new(["id", "age"])).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], record(json!({"id": 2, "age": 66})));
        assert_eq!(rows[3], record(json!({"id": 9, "age": 0})));

        let err = persons.replace_records(vec![record(json!({"name": "No id"}))]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingPrimaryKey(_))));
    }

    #[tokio::test]
    async fn only_declared_segments_are_accepted() {
        let schema = CollectionSchema { segments: vec!["classics".to_string()], ..testing::books_schema() };
        let source = MemoryDataSource::new(BTreeMap::from([("books".to_string(), schema)]));
        let books = source.get_collection("books").unwrap();

        let classics = PaginatedFilter::from(Filter::new().with_segment(Some("classics".to_string())));
        assert!(books.list(&Caller::default(), &classics, &Projection::new(["id"])).await.unwrap().is_empty());

        let unknown = PaginatedFilter::from(Filter::new().with_segment(Some("bestsellers".to_string())));
        let err = books.list(&Caller::default(), &unknown, &Projection::new(["id"])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::UnknownSegment { ref segment, .. }) if segment == "bestsellers"));
    }

    #[tokio::test]
    async fn charts_render_stored_values() {
        let library = MemoryDataSource::with_charts(BTreeMap::new(), BTreeMap::from([("sales".to_string(), json!({"value": 3}))]));

        assert!(library.schema().charts.contains("sales"));
        assert_eq!(library.render_chart(&Caller::default(), "sales").await.unwrap(), json!({"value": 3}));
        assert!(library.render_chart(&Caller::default(), "other").await.is_err());
    }
}
