//! Dataset access management: revoke an entity's access to a dataset.

use crate::client::{Dataset, DatasetApi, DatasetField, DatasetRef};
use crate::retry::CallError;

/// Result of a revocation: the dataset as returned by the update.
#[derive(Debug, Clone)]
pub struct Revocation {
    pub dataset: Dataset,
    /// Number of access entries that matched the entity and were dropped.
    pub removed: usize,
}

/// Removes every access entry granted to `entity_id` (an email, domain,
/// special group or IAM member) and writes back only the `access` field.
///
/// The update is sent even when no entry matched.
pub async fn revoke_dataset_access<A: DatasetApi>(
    api: &A,
    dataset: &DatasetRef,
    entity_id: &str,
) -> Result<Revocation, CallError> {
    let mut current = api.get_dataset(dataset).await?;

    let before = current.access.len();
    current
        .access
        .retain(|entry| entry.entity_id() != Some(entity_id));
    let removed = before - current.access.len();
    if removed == 0 {
        tracing::info!(dataset = %dataset, entity_id, "no access entry matched");
    }

    let updated = api
        .update_dataset(&current, &[DatasetField::Access])
        .await?;
    tracing::info!(dataset = %updated.dataset_reference, entity_id, removed, "revoked dataset access");
    Ok(Revocation {
        dataset: updated,
        removed,
    })
}
