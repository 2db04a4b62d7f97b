// Random non-repeating player selection for the live auction.

use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::player::PlayerRecord;
use crate::store::{DrawRegistry, RecordStore, StoreError};

/// Outcome of a single draw.
#[derive(Debug)]
pub enum Draw {
    /// A player not yet drawn and not yet sold. The identifier is NOT
    /// committed to the registry here: only a confirmed sale commits, so a
    /// nomination that gets abandoned stays re-drawable. The cost is that
    /// two simultaneous draws can show the same player; the auctioneer
    /// serializes actual sales.
    Candidate(PlayerRecord),
    /// Every identifier below the current player count has been drawn or
    /// sold. Terminal for the season; not an error.
    Exhausted,
}

#[derive(Debug, Error)]
pub enum DrawError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The registry kept reporting free identifiers whose records were
    /// sold, past the point where committing them should have drained the
    /// pool. Only reachable when `add` is not reflected by `list_all`.
    #[error("draw made no progress after {attempts} reconciling attempts")]
    NoProgress { attempts: usize },
}

/// Pick an unsold, never-drawn player uniformly at random, or report
/// `Exhausted` when none remain.
///
/// `player_count` is the registry-independent upper bound on identifiers,
/// read from the store at the start of the request (registrations may land
/// between draws, so callers must not cache it).
///
/// Each iteration re-reads the full registry, so concurrent sale commits
/// are visible to every retry and the exhaustion bound is checked against
/// the latest state. The candidate is sampled uniformly from the unused
/// identifiers directly; a retry therefore only happens when the sampled
/// record turns out to be sold out of band, and committing that identifier
/// shrinks the pool, so the loop finishes within `player_count` iterations
/// against any well-behaved registry.
pub async fn draw_next<R: Rng>(
    player_count: usize,
    registry: &dyn DrawRegistry,
    store: &dyn RecordStore,
    rng: &mut R,
) -> Result<Draw, DrawError> {
    let mut reconciled = 0usize;
    loop {
        let taken = registry.list_all().await?;
        if taken.len() >= player_count {
            return Ok(Draw::Exhausted);
        }

        let free: Vec<usize> = (0..player_count)
            .filter(|id| !taken.contains(id))
            .collect();
        if free.is_empty() {
            return Ok(Draw::Exhausted);
        }

        let id = free[rng.random_range(0..free.len())];
        let record = store.get(id).await?;

        if record.is_sold() {
            // The sale fields were written without a registry commit (data
            // fixed up out of band). Commit now so future draws skip this
            // identifier for free, then retry against the fresh state.
            debug!(id, "reconciling out-of-band sold record into registry");
            registry.add(id).await?;
            reconciled += 1;
            if reconciled > player_count {
                return Err(DrawError::NoProgress {
                    attempts: reconciled,
                });
            }
            continue;
        }

        return Ok(Draw::Candidate(record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::testing::{MemRegistry, MemStore};
    use crate::store::DrawRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    async fn expect_candidate(
        player_count: usize,
        registry: &MemRegistry,
        store: &MemStore,
        rng: &mut StdRng,
    ) -> PlayerRecord {
        match draw_next(player_count, registry, store, rng).await.unwrap() {
            Draw::Candidate(record) => record,
            Draw::Exhausted => panic!("expected a candidate, pool reported exhausted"),
        }
    }

    #[tokio::test]
    async fn zero_players_is_immediately_exhausted() {
        let store = MemStore::with_players(0);
        let registry = MemRegistry::default();

        let outcome = draw_next(0, &registry, &store, &mut rng()).await.unwrap();
        assert!(matches!(outcome, Draw::Exhausted));
    }

    #[tokio::test]
    async fn full_registry_is_immediately_exhausted() {
        let store = MemStore::with_players(1);
        let registry = MemRegistry::with_ids([0]);

        let outcome = draw_next(1, &registry, &store, &mut rng()).await.unwrap();
        assert!(matches!(outcome, Draw::Exhausted));
    }

    #[tokio::test]
    async fn candidate_is_in_range_and_not_in_registry() {
        let store = MemStore::with_players(10);
        let registry = MemRegistry::with_ids([1, 3, 5, 7, 9]);
        let mut rng = rng();

        for _ in 0..50 {
            let record = expect_candidate(10, &registry, &store, &mut rng).await;
            assert!(record.id < 10);
            assert!(!registry.contains(record.id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn shown_draw_is_not_committed() {
        let store = MemStore::with_players(3);
        let registry = MemRegistry::default();

        let _ = expect_candidate(3, &registry, &store, &mut rng()).await;
        assert_eq!(registry.size().await.unwrap(), 0, "lazy commit: a shown draw stays re-drawable");
    }

    #[tokio::test]
    async fn commit_on_sale_yields_a_permutation_then_exhausted() {
        let store = MemStore::with_players(3);
        let registry = MemRegistry::default();
        let mut rng = rng();

        let mut seen = Vec::new();
        for _ in 0..3 {
            let record = expect_candidate(3, &registry, &store, &mut rng).await;
            registry.add(record.id).await.unwrap();
            seen.push(record.id);
        }

        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);

        let fourth = draw_next(3, &registry, &store, &mut rng).await.unwrap();
        assert!(matches!(fourth, Draw::Exhausted));
    }

    #[tokio::test]
    async fn out_of_band_sold_record_is_skipped_and_reconciled() {
        let store = MemStore::with_players(3);
        store.mark_sold_out_of_band(2, "Strikers", "300");
        let registry = MemRegistry::default();
        let mut rng = rng();

        for _ in 0..20 {
            let record = expect_candidate(3, &registry, &store, &mut rng).await;
            assert_ne!(record.id, 2, "sold record must never be shown");
        }

        // Retire the live candidates; the only identifier left is the
        // drifted one, which reconciles into the registry and exhausts
        // the pool.
        registry.add(0).await.unwrap();
        registry.add(1).await.unwrap();
        let outcome = draw_next(3, &registry, &store, &mut rng).await.unwrap();
        assert!(matches!(outcome, Draw::Exhausted));
        assert!(
            registry.contains(2).await.unwrap(),
            "reconciled identifier should be committed for free"
        );
    }

    #[tokio::test]
    async fn all_records_sold_out_of_band_ends_exhausted() {
        let store = MemStore::with_players(4);
        for id in 0..4 {
            store.mark_sold_out_of_band(id, "Strikers", "100");
        }
        let registry = MemRegistry::default();

        let outcome = draw_next(4, &registry, &store, &mut rng()).await.unwrap();
        assert!(matches!(outcome, Draw::Exhausted));
        assert_eq!(registry.size().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn last_remaining_candidate_is_found() {
        let store = MemStore::with_players(5);
        let registry = MemRegistry::with_ids([0, 1, 2, 3]);

        let record = expect_candidate(5, &registry, &store, &mut rng()).await;
        assert_eq!(record.id, 4);
    }

    #[tokio::test]
    async fn stale_registry_entries_below_old_count_stay_excluded() {
        // Entries drawn when the pool was smaller remain excluded after
        // more registrations push the count up.
        let store = MemStore::with_players(6);
        let registry = MemRegistry::with_ids([0, 1]);
        let mut rng = rng();

        for _ in 0..30 {
            let record = expect_candidate(6, &registry, &store, &mut rng).await;
            assert!(record.id >= 2);
        }
    }

    #[tokio::test]
    async fn registry_losing_writes_fails_instead_of_spinning() {
        let store = MemStore::with_players(2);
        for id in 0..2 {
            store.mark_sold_out_of_band(id, "Strikers", "100");
        }
        let mut registry = MemRegistry::default();
        registry.hide_adds = true;

        let err = draw_next(2, &registry, &store, &mut rng()).await.unwrap_err();
        assert!(matches!(err, DrawError::NoProgress { .. }));
    }

    #[tokio::test]
    async fn store_error_propagates() {
        // A registry pointing at identifiers the store doesn't have
        // surfaces the store failure rather than masking it.
        let store = MemStore::with_players(0);
        let registry = MemRegistry::default();

        let err = draw_next(3, &registry, &store, &mut rng()).await.unwrap_err();
        assert!(matches!(err, DrawError::Store(StoreError::NotFound { .. })));
    }
}
