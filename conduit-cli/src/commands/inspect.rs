use std::path::Path;

use anyhow::{Context, Result};
use conduit_core::config::ConduitConfig;
use conduit_core::rpc::RpcDataSource;
use conduit_core::schema::FieldSchema;
use conduit_core::DataSource;

use super::serve::read_definition;

/// Connect to a running server and print the collections it advertises
pub async fn run(config: &Path, url: Option<String>, definition: &Path) -> Result<()> {
    let url = server_url(config, url)?;
    let definition = read_definition(definition)?;
    let source = RpcDataSource::connect(url.as_str(), definition)
        .await
        .with_context(|| format!("Handshake with {} failed", url))?;

    for collection in source.collections() {
        println!("{}", collection.name());
        for (name, field) in &collection.schema().fields {
            match field {
                FieldSchema::Column(column) => {
                    let operators: Vec<String> = column.filter_operators.iter().map(|op| op.to_string()).collect();
                    println!("  {:<24} {:<10} [{}]", name, column.column_type.to_string(), operators.join(", "));
                }
                FieldSchema::Relation(relation) => {
                    println!("  {:<24} {:?} -> {}", name, relation.kind, relation.foreign_collection);
                }
            }
        }
    }

    let charts = source.schema().charts;
    if !charts.is_empty() {
        println!("charts: {}", charts.into_iter().collect::<Vec<_>>().join(", "));
    }
    Ok(())
}

/// The `--url` flag, or `rpc.url` from the configuration
fn server_url(config: &Path, url: Option<String>) -> Result<String> {
    match url {
        Some(url) => Ok(url),
        None => Ok(ConduitConfig::load_from(config)?.rpc.url),
    }
}
