//! `bqr access <dataset>` – list a dataset's access entries.

use anyhow::{Context, Result};
use bqr_core::client::{Client, DatasetApi, DatasetRef};

pub async fn run_access(client: &Client, dataset: &str) -> Result<()> {
    let dataset_ref = DatasetRef::parse(dataset, client.project())?;
    let ds = client
        .get_dataset(&dataset_ref)
        .await
        .with_context(|| format!("fetching {}", dataset_ref))?;

    if ds.access.is_empty() {
        println!("No access entries on dataset '{dataset_ref}'.");
        return Ok(());
    }
    println!("{:<12} {:<14} ENTITY", "ROLE", "TYPE");
    for entry in &ds.access {
        println!(
            "{:<12} {:<14} {}",
            entry.role.as_deref().unwrap_or("-"),
            entry.entity_type().unwrap_or("-"),
            entry.entity_id().unwrap_or("-"),
        );
    }
    Ok(())
}
