//! The [`Combinatorics`] trait: the pure validity predicate the arbiter
//! consults for every claim.

use crate::id::{ItemId, Tuple};

/// Pure combinatorial rules over item tuples.
///
/// Implementations must be deterministic and side-effect free: the
/// arbiter calls them while holding the grid lock, from one thread, and
/// the dealer calls [`find_claims`](Self::find_claims) repeatedly when
/// redealing.
///
/// # Contract
///
/// - `is_valid` is only ever called with exactly
///   [`claim_size`](Self::claim_size) distinct items.
/// - `find_claims` returns at most `limit` tuples, each of which
///   satisfies `is_valid`. With `limit == 1` it is an existence check.
pub trait Combinatorics: Send + Sync + 'static {
    /// Number of items forming one claim (the markers-per-claim).
    fn claim_size(&self) -> usize;

    /// Whether `items` form a valid claim.
    fn is_valid(&self, items: &[ItemId]) -> bool;

    /// Up to `limit` valid tuples drawn from `candidates`.
    fn find_claims(&self, candidates: &[ItemId], limit: usize) -> Vec<Tuple>;

    /// Number of items the rules describe, if bounded. Item IDs at or
    /// above it are never part of a valid claim.
    fn item_limit(&self) -> Option<u32> {
        None
    }

    /// Whether at least one valid tuple exists among `candidates`.
    fn any_claim(&self, candidates: &[ItemId]) -> bool {
        candidates.len() >= self.claim_size() && !self.find_claims(candidates, 1).is_empty()
    }
}
