//! Rename fields of a collection
//!
//! Every name crossing the boundary is translated: schema keys, condition
//! tree leaves, sort clauses, projections, aggregations, written records and
//! returned records. Relation paths are translated hop by hop through the
//! decorated sibling collections.

use super::{read, write, DataSourceDecorator};
use crate::collection::{upgrade, ActionFormField, ActionResult, Caller, Collection, DataSource};
use crate::error::{ConfigurationError, Result, ValidationError};
use crate::query::{AggregateResult, Aggregation, Filter, PaginatedFilter, Projection};
use crate::record::RecordData;
use crate::schema::{CollectionSchema, FieldSchema, RelationSchema, RelationType};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, Weak};

pub type RenameFieldDataSource = DataSourceDecorator<RenameFieldCollection>;

pub struct RenameFieldCollection {
    child: Arc<dyn Collection>,
    data_source: Weak<RenameFieldDataSource>,
    renames: RwLock<FieldRenames>,
}

#[derive(Default)]
struct FieldRenames {
    /// child name -> public name
    from_child: BTreeMap<String, String>,
    /// public name -> child name
    to_child: BTreeMap<String, String>,
}

impl RenameFieldCollection {
    pub fn new(child: Arc<dyn Collection>, data_source: Weak<RenameFieldDataSource>) -> Self {
        Self { child, data_source, renames: RwLock::new(FieldRenames::default()) }
    }

    /// Expose the field `current` under the name `new`
    pub fn rename_field(&self, current: &str, new: &str) -> Result<()> {
        if current == new {
            return Ok(());
        }

        let schema = self.schema();
        if !schema.fields.contains_key(current) {
            return Err(ValidationError::FieldNotFound {
                field: current.to_string(),
                collection: self.name().to_string(),
            }
            .into());
        }
        if schema.fields.contains_key(new) {
            return Err(ConfigurationError::InvalidRename {
                from: current.to_string(),
                to: new.to_string(),
                reason: "a field with this name already exists".to_string(),
            }
            .into());
        }

        let mut renames = write(&self.renames);
        let child_name = renames.to_child.remove(current).unwrap_or_else(|| current.to_string());
        if child_name == new {
            renames.from_child.remove(&child_name);
        } else {
            renames.from_child.insert(child_name.clone(), new.to_string());
            renames.to_child.insert(new.to_string(), child_name);
        }
        log::debug!("Renamed field '{}.{}' to '{}'", self.name(), current, new);
        Ok(())
    }

    /// Child name of a public field. A name renamed away is no longer public.
    fn field_to_child(&self, field: &str) -> Result<String> {
        let renames = read(&self.renames);
        if let Some(child_name) = renames.to_child.get(field) {
            return Ok(child_name.clone());
        }
        if renames.from_child.contains_key(field) {
            return Err(ValidationError::FieldNotFound {
                field: field.to_string(),
                collection: self.name().to_string(),
            }
            .into());
        }
        Ok(field.to_string())
    }

    fn field_from_child(&self, field: &str) -> String {
        read(&self.renames).from_child.get(field).cloned().unwrap_or_else(|| field.to_string())
    }

    fn sibling(&self, name: &str) -> Result<Arc<RenameFieldCollection>> {
        upgrade(&self.data_source)?.decorated(name)
    }

    /// Translate a public field path into the child's names
    pub fn path_to_child(&self, path: &str) -> Result<String> {
        match path.split_once(':') {
            None => self.field_to_child(path),
            Some((prefix, rest)) => {
                let prefix = self.field_to_child(prefix)?;
                let rest = match self.child.schema().relation(&prefix) {
                    Some(relation) => self.sibling(&relation.foreign_collection)?.path_to_child(rest)?,
                    None => rest.to_string(),
                };
                Ok(format!("{}:{}", prefix, rest))
            }
        }
    }

    /// Translate a child field path into the public names
    pub fn path_from_child(&self, path: &str) -> Result<String> {
        match path.split_once(':') {
            None => Ok(self.field_from_child(path)),
            Some((prefix, rest)) => {
                let rest = match self.child.schema().relation(prefix) {
                    Some(relation) => self.sibling(&relation.foreign_collection)?.path_from_child(rest)?,
                    None => rest.to_string(),
                };
                Ok(format!("{}:{}", self.field_from_child(prefix), rest))
            }
        }
    }

    fn translator<'a>(&self, paths: impl IntoIterator<Item = &'a String>) -> Result<HashMap<String, String>> {
        paths.into_iter().map(|path| Ok((path.clone(), self.path_to_child(path)?))).collect()
    }

    fn filter_to_child(&self, filter: &Filter) -> Result<Filter> {
        let Some(tree) = &filter.condition_tree else {
            return Ok(filter.clone());
        };
        let names = self.translator(tree.projection().fields())?;
        let tree = tree.clone().replace_fields(|field| names.get(field).cloned().unwrap_or_else(|| field.to_string()));
        Ok(filter.clone().with_condition_tree(Some(tree)))
    }

    fn paginated_filter_to_child(&self, filter: &PaginatedFilter) -> Result<PaginatedFilter> {
        let names = self.translator(filter.sort.projection().fields())?;
        let sort = filter.sort.clone().replace_fields(|field| names.get(field).cloned().unwrap_or_else(|| field.to_string()));
        Ok(PaginatedFilter { filter: self.filter_to_child(filter)?, sort, page: filter.page })
    }

    fn projection_to_child(&self, projection: &Projection) -> Result<Projection> {
        let names = self.translator(projection.fields())?;
        Ok(projection.replace(|field| names.get(field).cloned().unwrap_or_else(|| field.to_string())))
    }

    fn record_to_child(&self, record: RecordData) -> Result<RecordData> {
        record.into_iter().map(|(field, value)| Ok((self.field_to_child(&field)?, value))).collect()
    }

    fn record_from_child(&self, record: RecordData) -> Result<RecordData> {
        let schema = self.child.schema();
        record
            .into_iter()
            .map(|(field, value)| {
                let value = match (schema.relation(&field), value) {
                    (Some(relation), Value::Object(nested)) => {
                        Value::Object(self.sibling(&relation.foreign_collection)?.record_from_child(nested)?)
                    }
                    (_, value) => value,
                };
                Ok((self.field_from_child(&field), value))
            })
            .collect()
    }

    /// Rewrite the relation keys that name renamed fields, here or in siblings
    fn rename_relation_keys(&self, relation: &mut RelationSchema) {
        let local = |key: &mut Option<String>| {
            if let Some(key) = key {
                let renamed = self.field_from_child(key);
                *key = renamed;
            }
        };
        let on = |collection: &str, key: &mut Option<String>| {
            if let (Some(key), Ok(sibling)) = (key.as_mut(), self.sibling(collection)) {
                let renamed = sibling.field_from_child(key);
                *key = renamed;
            }
        };

        let foreign = relation.foreign_collection.clone();
        match relation.kind {
            RelationType::ManyToOne => {
                local(&mut relation.foreign_key);
                on(&foreign, &mut relation.foreign_key_target);
            }
            RelationType::OneToOne | RelationType::OneToMany => {
                local(&mut relation.origin_key_target);
                on(&foreign, &mut relation.origin_key);
            }
            RelationType::ManyToMany => {
                local(&mut relation.origin_key_target);
                on(&foreign, &mut relation.foreign_key_target);
                if let Some(through) = relation.through_collection.clone() {
                    on(&through, &mut relation.origin_key);
                    on(&through, &mut relation.foreign_key);
                }
            }
        }
    }
}

#[async_trait]
impl Collection for RenameFieldCollection {
    fn name(&self) -> &str {
        self.child.name()
    }

    fn schema(&self) -> CollectionSchema {
        let CollectionSchema { actions, fields, searchable, segments } = self.child.schema();
        let fields = fields
            .into_iter()
            .map(|(name, field)| {
                let field = match field {
                    FieldSchema::Relation(mut relation) => {
                        self.rename_relation_keys(&mut relation);
                        FieldSchema::Relation(relation)
                    }
                    column => column,
                };
                (self.field_from_child(&name), field)
            })
            .collect();
        CollectionSchema { actions, fields, searchable, segments }
    }

    fn data_source(&self) -> Result<Arc<dyn DataSource>> {
        Ok(upgrade(&self.data_source)?)
    }

    async fn list(&self, caller: &Caller, filter: &PaginatedFilter, projection: &Projection) -> Result<Vec<RecordData>> {
        let filter = self.paginated_filter_to_child(filter)?;
        let projection = self.projection_to_child(projection)?;
        let records = self.child.list(caller, &filter, &projection).await?;
        records.into_iter().map(|record| self.record_from_child(record)).collect()
    }

    async fn create(&self, caller: &Caller, records: Vec<RecordData>) -> Result<Vec<RecordData>> {
        let records = records.into_iter().map(|record| self.record_to_child(record)).collect::<Result<Vec<_>>>()?;
        let created = self.child.create(caller, records).await?;
        created.into_iter().map(|record| self.record_from_child(record)).collect()
    }

    async fn update(&self, caller: &Caller, filter: &Filter, patch: RecordData) -> Result<()> {
        let filter = self.filter_to_child(filter)?;
        self.child.update(caller, &filter, self.record_to_child(patch)?).await
    }

    async fn delete(&self, caller: &Caller, filter: &Filter) -> Result<()> {
        let filter = self.filter_to_child(filter)?;
        self.child.delete(caller, &filter).await
    }

    async fn aggregate(
        &self,
        caller: &Caller,
        filter: &Filter,
        aggregation: &Aggregation,
        limit: Option<usize>,
    ) -> Result<Vec<AggregateResult>> {
        let filter = self.filter_to_child(filter)?;
        let names = self.translator(aggregation.projection().fields())?;
        let aggregation =
            aggregation.clone().replace_fields(|field| names.get(field).cloned().unwrap_or_else(|| field.to_string()));

        let rows = self.child.aggregate(caller, &filter, &aggregation, limit).await?;
        rows.into_iter()
            .map(|row| {
                let group = row
                    .group
                    .into_iter()
                    .map(|(field, value)| Ok((self.path_from_child(&field)?, value)))
                    .collect::<Result<RecordData>>()?;
                Ok(AggregateResult { value: row.value, group })
            })
            .collect()
    }

    async fn execute(&self, caller: &Caller, action: &str, form_values: RecordData, filter: &Filter) -> Result<ActionResult> {
        let filter = self.filter_to_child(filter)?;
        self.child.execute(caller, action, form_values, &filter).await
    }

    async fn get_form(
        &self,
        caller: &Caller,
        action: &str,
        form_values: Option<RecordData>,
        filter: Option<&Filter>,
    ) -> Result<Vec<ActionFormField>> {
        let filter = filter.map(|filter| self.filter_to_child(filter)).transpose()?;
        self.child.get_form(caller, action, form_values, filter.as_ref()).await
    }
}
