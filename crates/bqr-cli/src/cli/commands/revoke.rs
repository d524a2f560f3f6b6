//! `bqr revoke <dataset> <entity>` – remove an entity's access entries from a dataset.

use anyhow::{Context, Result};
use bqr_core::access::revoke_dataset_access;
use bqr_core::client::{Client, DatasetRef};

pub async fn run_revoke(client: &Client, dataset: &str, entity_id: &str) -> Result<()> {
    let dataset_ref = DatasetRef::parse(dataset, client.project())?;
    let revocation = revoke_dataset_access(client, &dataset_ref, entity_id)
        .await
        .with_context(|| format!("revoking access to {}", dataset_ref))?;

    if revocation.removed == 0 {
        println!("No access entry for '{entity_id}' on dataset '{dataset_ref}'.");
    }
    println!(
        "Revoked dataset access for '{}' to dataset '{}'.",
        entity_id, revocation.dataset.dataset_reference
    );
    Ok(())
}
