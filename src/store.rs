// Contracts for the two external collaborators: the row store holding
// player records and the registry of already-drawn identifiers. The core
// only ever talks to these traits; handlers receive concrete handles by
// injection so tests can substitute fakes.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::player::{PlayerProfile, PlayerRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record at index {id}")]
    NotFound { id: usize },

    /// Transport or availability failure of the backing service. The core
    /// never retries these; they surface to the caller as a 500.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Ordered, index-addressable row store of player records. Rows are only
/// ever appended; `count()` must reflect concurrent registrations, so it is
/// re-read at the start of every draw.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn count(&self) -> Result<usize, StoreError>;

    async fn get(&self, id: usize) -> Result<PlayerRecord, StoreError>;

    async fn get_all(&self) -> Result<Vec<PlayerRecord>, StoreError>;

    /// Append a registration row, returning its 0-based ordinal identifier.
    async fn append(&self, profile: &PlayerProfile) -> Result<usize, StoreError>;

    /// Write both sale fields in one atomic update. Last physical write
    /// wins at this level; first-write-wins is enforced above by the sale
    /// finalizer's read-verify cycle.
    async fn record_sale(&self, id: usize, team: &str, amount: &str) -> Result<(), StoreError>;
}

/// Insert-only set of identifiers that must never be drawn again. Grows
/// monotonically within a season.
#[async_trait]
pub trait DrawRegistry: Send + Sync {
    async fn size(&self) -> Result<usize, StoreError>;

    async fn contains(&self, id: usize) -> Result<bool, StoreError>;

    /// Set-semantics add: inserting an identifier twice is a no-op.
    async fn add(&self, id: usize) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<HashSet<usize>, StoreError>;
}
