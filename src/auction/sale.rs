// Sale finalization: the only correctness-critical write in the system.

use thiserror::Error;
use tracing::info;

use crate::store::{DrawRegistry, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum SaleError {
    /// The record was already sold, or the write did not stick because a
    /// concurrent finalize won the race. First write wins; the caller
    /// should refresh and draw again.
    #[error("sale for this player did not take effect; the record is already sold")]
    Conflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Record a winning bid for player `id` and retire the identifier from the
/// draw pool.
///
/// Ordering is load-bearing: the registry commit happens only after the
/// store write is confirmed by a re-read, so a failed or lost store write
/// never leaves the identifier permanently excluded with no sale recorded.
pub async fn finalize_sale(
    id: usize,
    team: &str,
    amount: &str,
    store: &dyn RecordStore,
    registry: &dyn DrawRegistry,
) -> Result<(), SaleError> {
    let before = store.get(id).await?;
    if before.is_sold() {
        return Err(SaleError::Conflict);
    }

    store.record_sale(id, team, amount).await?;

    // The store is the source of truth. Re-read and verify our write is the
    // one that landed before excluding the identifier for good.
    let after = store.get(id).await?;
    if after.sold_to.as_deref() != Some(team) || after.sold_for.as_deref() != Some(amount) {
        return Err(SaleError::Conflict);
    }

    registry.add(id).await?;
    info!(id, team, amount, "sale finalized");
    Ok(())
}
