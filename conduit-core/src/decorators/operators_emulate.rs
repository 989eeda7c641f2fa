//! Operator emulation
//!
//! Lets a collection advertise filter operators its backend cannot run.
//! A leaf using such an operator is either rewritten into an equivalent tree
//! by a registered replacer, or emulated by brute force: the collection is
//! listed on its primary keys, the leaf is evaluated in memory, and the leaf
//! is replaced by a condition matching exactly the surviving ids.
//!
//! Brute force reads the whole collection on every query that needs it.

use super::{read, write, DataSourceDecorator};
use crate::collection::{upgrade, ActionFormField, ActionResult, Caller, Collection, DataSource};
use crate::error::{ConfigurationError, Result, ValidationError};
use crate::query::{
    AggregateResult, Aggregation, ConditionTree, ConditionTreeFactory, ConditionTreeLeaf, Filter, Operator,
    PaginatedFilter, Projection,
};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, FieldSchema};
use crate::validation;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock, Weak};

/// Rewrites the value of an emulated leaf into an equivalent condition tree.
///
/// Returning `None` falls back to brute force.
pub type OperatorReplacer =
    Arc<dyn Fn(Value, Arc<dyn DataSource>) -> BoxFuture<'static, Result<Option<ConditionTree>>> + Send + Sync>;

/// Box an async closure into an [`OperatorReplacer`]
pub fn replacer<F, Fut>(f: F) -> OperatorReplacer
where
    F: Fn(Value, Arc<dyn DataSource>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<ConditionTree>>> + Send + 'static,
{
    Arc::new(move |value, data_source| f(value, data_source).boxed())
}

pub type OperatorsEmulateDataSource = DataSourceDecorator<OperatorsEmulateCollection>;

pub struct OperatorsEmulateCollection {
    child: Arc<dyn Collection>,
    data_source: Weak<OperatorsEmulateDataSource>,
    /// field -> operator -> replacer, `None` meaning brute force
    fields: RwLock<BTreeMap<String, BTreeMap<Operator, Option<OperatorReplacer>>>>,
}

impl OperatorsEmulateCollection {
    pub fn new(child: Arc<dyn Collection>, data_source: Weak<OperatorsEmulateDataSource>) -> Self {
        Self { child, data_source, fields: RwLock::new(BTreeMap::new()) }
    }

    /// Answer `operator` on `field` by brute force
    pub fn emulate_operator(&self, field: &str, operator: Operator) -> Result<()> {
        self.register(field, operator, None)
    }

    /// Answer `operator` on `field` by rewriting leaves with `replacer`
    pub fn implement_operator(&self, field: &str, operator: Operator, replacer: OperatorReplacer) -> Result<()> {
        self.register(field, operator, Some(replacer))
    }

    fn register(&self, field: &str, operator: Operator, replacer: Option<OperatorReplacer>) -> Result<()> {
        let schema = self.child.schema();
        let primary_keys = schema.primary_keys();
        let pks_usable = !primary_keys.is_empty()
            && primary_keys.iter().all(|pk| {
                schema.column(pk).is_some_and(|column| {
                    column.filter_operators.contains(&Operator::Equal) && column.filter_operators.contains(&Operator::In)
                })
            });
        if !pks_usable {
            return Err(self.invalid_override("the primary key columns must support 'equal' and 'in' operators"));
        }

        match schema.fields.get(field) {
            Some(FieldSchema::Column(_)) => {}
            Some(FieldSchema::Relation(_)) => return Err(self.invalid_override("Cannot replace operator for relation")),
            None => {
                return Err(ValidationError::FieldNotFound {
                    field: field.to_string(),
                    collection: self.name().to_string(),
                }
                .into())
            }
        }

        write(&self.fields).entry(field.to_string()).or_default().insert(operator, replacer);
        log::debug!("Emulating '{}' on '{}.{}'", operator, self.name(), field);
        Ok(())
    }

    fn invalid_override(&self, reason: &str) -> crate::Error {
        ConfigurationError::InvalidOperatorOverride { collection: self.name().to_string(), reason: reason.to_string() }
            .into()
    }

    fn sibling(&self, name: &str) -> Result<Arc<OperatorsEmulateCollection>> {
        upgrade(&self.data_source)?.decorated(name)
    }

    /// Replace a leaf by a tree the child collection can run.
    ///
    /// `chain` lists the replacements already in progress, outermost first.
    pub fn replace_leaf<'a>(
        &'a self,
        caller: &'a Caller,
        leaf: ConditionTreeLeaf,
        chain: Vec<String>,
    ) -> BoxFuture<'a, Result<ConditionTree>> {
        async move {
            if let Some((prefix, _)) = leaf.field.split_once(':') {
                let prefix = prefix.to_string();
                let Some(relation) = self.child.schema().relation(&prefix).cloned() else {
                    return Ok(leaf.into());
                };
                let foreign = self.sibling(&relation.foreign_collection)?;
                let tree = foreign.replace_leaf(caller, leaf.unnest()?, chain).await?;
                return Ok(tree.nest(&prefix));
            }

            let registered = read(&self.fields).get(&leaf.field).and_then(|ops| ops.get(&leaf.operator)).cloned();
            match registered {
                Some(replacer) => self.compute_equivalent(caller, leaf, replacer, chain).await,
                None => Ok(leaf.into()),
            }
        }
        .boxed()
    }

    async fn compute_equivalent(
        &self,
        caller: &Caller,
        leaf: ConditionTreeLeaf,
        replacer: Option<OperatorReplacer>,
        mut chain: Vec<String>,
    ) -> Result<ConditionTree> {
        let id = format!("{}.{}[{}]", self.name(), leaf.field, leaf.operator);
        let cycle = chain.contains(&id);
        chain.push(id);
        if cycle {
            return Err(ConfigurationError::RewriteCycle { chain }.into());
        }

        let equivalent = match &replacer {
            Some(replacer) => replacer(leaf.value.clone(), self.data_source()?).await?,
            None => None,
        };

        match equivalent {
            Some(tree) => {
                let handler = |leaf| self.replace_leaf(caller, leaf, chain.clone());
                let tree = tree.replace_leafs_async(&handler).await?;
                validation::validate_condition_tree(&tree, self)?;
                Ok(tree)
            }
            None => self.brute_force(caller, leaf).await,
        }
    }

    async fn brute_force(&self, caller: &Caller, leaf: ConditionTreeLeaf) -> Result<ConditionTree> {
        let schema = self.child.schema();
        let projection = Projection::primary_keys_of(&schema).union(&leaf.projection());
        let records = self.child.list(caller, &PaginatedFilter::default(), &projection).await?;
        let total = records.len();

        let matching: Vec<RecordData> = records.into_iter().filter(|record| leaf.apply(record)).collect();
        log::debug!(
            "Brute-forced '{}.{}[{}]': {} of {} record(s) match",
            self.name(),
            leaf.field,
            leaf.operator,
            matching.len(),
            total
        );
        ConditionTreeFactory::match_records(&schema, &matching)
    }

    async fn refine_filter(&self, caller: &Caller, filter: &Filter) -> Result<Filter> {
        let Some(tree) = filter.condition_tree.clone() else {
            return Ok(filter.clone());
        };
        validation::validate_condition_tree(&tree, self)?;

        let handler = |leaf| self.replace_leaf(caller, leaf, Vec::new());
        let tree = tree.replace_leafs_async(&handler).await?;
        Ok(filter.clone().with_condition_tree(Some(tree)))
    }
}

#[async_trait]
impl Collection for OperatorsEmulateCollection {
    fn name(&self) -> &str {
        self.child.name()
    }

    /// Child schema, with the emulated operators added to their fields
    fn schema(&self) -> CollectionSchema {
        let mut schema = self.child.schema();
        for (field, operators) in read(&self.fields).iter() {
            if let Some(FieldSchema::Column(column)) = schema.fields.get_mut(field) {
                column.filter_operators.extend(operators.keys().copied());
            }
        }
        schema
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(upgrade(&self.data_source)?)
    }

    async fn list(&self, caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        let filter = PaginatedFilter { filter: self.refine_filter(caller, filter).await?, ..filter.clone() };
        self.child.list(caller, &filter, projection).await
    }

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        self.child.create(caller, records).await
    }

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        let filter = self.refine_filter(caller, filter).await?;
        self.child.update(caller, &filter, patch).await
    }

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()> {
        let filter = self.refine_filter(caller, filter).await?;
        self.child.delete(caller, &filter).await
    }

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        let filter = self.refine_filter(caller, filter).await?;
        self.child.aggregate(caller, &filter, aggregation, limit).await
    }

    async fn execute(&self, caller: &Caller, action: &str, form_values: RecordData, filter: &Filter) -> Result<ActionResult> {
        let filter = self.refine_filter(caller, filter).await?;
        self.child.execute(caller, action, form_values, &filter).await
    }

    async fn get_form(
        &self,
        caller: &Caller,
        action: &str,
        form_values: Option<RecordData>,
        filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        let filter = match filter {
            Some(filter) => Some(self.refine_filter(caller, filter).await?),
            None => None,
        };
        self.child.get_form(caller, action, form_values, filter.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::MemoryDataSource;
    use crate::query::Sort;
    use crate::schema::ColumnType;
    use crate::testing;
    use serde_json::json;

    async fn emulated_library() -> Arc<OperatorsEmulateDataSource> {
        DataSourceDecorator::new(testing::library().await, OperatorsEmulateCollection::new)
    }

    async fn ids(collection: &dyn Collection, tree: ConditionTree) -> Result<Vec<Value>> {
        let filter = PaginatedFilter::from_tree(tree).with_sort(Sort::ascending("id"));
        let rows = collection.list(&Caller::default(), &filter, &Projection::new(["id"])).await?;
        Ok(rows.into_iter().map(|row| row["id"].clone()).collect())
    }

    #[tokio::test]
    async fn brute_force_answers_unsupported_operators() {
        let library = emulated_library().await;
        let persons = library.decorated("persons").unwrap();
        persons.emulate_operator("age", Operator::GreaterThanOrEqual).unwrap();

        assert!(persons.schema().column("age").unwrap().filter_operators.contains(&Operator::GreaterThanOrEqual));
        let found = ids(persons.as_ref(), ConditionTree::leaf("age", Operator::GreaterThanOrEqual, json!(72))).await.unwrap();
        assert_eq!(found, [json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn replacers_rewrite_leaves() {
        let library = emulated_library().await;
        let books = library.decorated("books").unwrap();
        books
            .implement_operator(
                "title",
                Operator::NotContains,
                replacer(|value, _| async move {
                    Ok(Some(ConditionTree::not(ConditionTree::leaf("title", Operator::Contains, value))))
                }),
            )
            .unwrap();

        let found = ids(books.as_ref(), ConditionTree::leaf("title", Operator::NotContains, json!("o"))).await.unwrap();
        assert_eq!(found, [json!(2)]);
    }

    #[tokio::test]
    async fn replacements_can_chain_into_brute_force() {
        let library = emulated_library().await;
        let books = library.decorated("books").unwrap();
        books.emulate_operator("title", Operator::Like).unwrap();
        books
            .implement_operator(
                "title",
                Operator::StartsWith,
                replacer(|value, _| async move {
                    let pattern = format!("{}%", value.as_str().unwrap_or_default());
                    Ok(Some(ConditionTree::leaf("title", Operator::Like, json!(pattern))))
                }),
            )
            .unwrap();

        let found = ids(books.as_ref(), ConditionTree::leaf("title", Operator::StartsWith, json!("I,"))).await.unwrap();
        assert_eq!(found, [json!(4)]);
    }

    #[tokio::test]
    async fn replacement_cycles_are_reported_with_their_chain() {
        let library = emulated_library().await;
        let books = library.decorated("books").unwrap();
        let rewrite_to = |operator: Operator| {
            replacer(move |value, _| async move { Ok(Some(ConditionTree::leaf("title", operator, value))) })
        };
        books.implement_operator("title", Operator::Like, rewrite_to(Operator::StartsWith)).unwrap();
        books.implement_operator("title", Operator::StartsWith, rewrite_to(Operator::Like)).unwrap();

        let err = ids(books.as_ref(), ConditionTree::leaf("title", Operator::Like, json!("F%"))).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator replacement cycle: books.title[like] -> books.title[starts_with] -> books.title[like]"
        );
    }

    #[tokio::test]
    async fn relation_leaves_use_the_foreign_emulation() {
        let library = emulated_library().await;
        library.decorated("persons").unwrap().emulate_operator("age", Operator::GreaterThanOrEqual).unwrap();
        let books = library.decorated("books").unwrap();

        let found =
            ids(books.as_ref(), ConditionTree::leaf("author:age", Operator::GreaterThanOrEqual, json!(80))).await.unwrap();
        assert_eq!(found, [json!(3)]);
    }

    #[tokio::test]
    async fn updates_and_deletes_are_refined_too() {
        let library = emulated_library().await;
        let persons = library.decorated("persons").unwrap();
        persons.emulate_operator("age", Operator::LessThanOrEqual).unwrap();

        let young = Filter::from_tree(ConditionTree::leaf("age", Operator::LessThanOrEqual, json!(65)));
        persons.delete(&Caller::default(), &young).await.unwrap();

        let found = ids(persons.as_ref(), ConditionTree::leaf("age", Operator::GreaterThan, json!(0))).await.unwrap();
        assert_eq!(found, [json!(1), json!(3)]);
    }

    #[test]
    fn registration_checks_the_target() {
        let library = DataSourceDecorator::new(testing::library_schema_only(), OperatorsEmulateCollection::new);
        let books = library.decorated("books").unwrap();

        let err = books.emulate_operator("author", Operator::Equal).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot override operators on collection 'books': Cannot replace operator for relation"
        );
        assert!(matches!(
            books.emulate_operator("isbn", Operator::Equal),
            Err(Error::Validation(ValidationError::FieldNotFound { .. }))
        ));
    }

    #[test]
    fn registration_requires_usable_primary_keys() {
        let schema = CollectionSchema::new()
            .with_field("id", testing::column(ColumnType::Number, [Operator::Equal]).primary_key())
            .with_field("name", testing::column(ColumnType::String, [Operator::Equal]));
        let data_source = MemoryDataSource::new(BTreeMap::from([("tags".to_string(), schema)]));
        let library = DataSourceDecorator::new(data_source, OperatorsEmulateCollection::new);

        let err = library.decorated("tags").unwrap().emulate_operator("name", Operator::Contains).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot override operators on collection 'tags': the primary key columns must support 'equal' and 'in' operators"
        );
    }
}
