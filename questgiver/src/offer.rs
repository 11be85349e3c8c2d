//! Offer pool membership.
//!
//! The pool identifies entries by creator key, so reconciling a creator means making it
//! either absent or present exactly once.

use std::fmt;

use log::{debug, info, warn};
use questgiver_data::CreatorKey;

use crate::host::{OfferEntry, OfferPool};

/// What [`configure_offer_entry`] did to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolChange {
    Unchanged,
    Added,
    Removed,
    /// Duplicate entries were pruned back to one.
    Deduplicated,
}

impl fmt::Display for PoolChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PoolChange::Unchanged => "unchanged",
            PoolChange::Added => "added",
            PoolChange::Removed => "removed",
            PoolChange::Deduplicated => "deduplicated",
        };
        write!(f, "{label}")
    }
}

/// Bring the pool in line for one creator.
///
/// The entry must be absent when it should not be generated or its quest has started,
/// and present exactly once otherwise.
pub fn configure_offer_entry(
    pool: &mut dyn OfferPool,
    should_generate: bool,
    entry: &OfferEntry,
    is_started: bool,
) -> PoolChange {
    let creator = &entry.creator;
    let count = pool.count_entries(creator);

    if !should_generate || is_started {
        if count == 0 {
            return PoolChange::Unchanged;
        }
        pool.remove_entries(creator);
        debug!("removed offer '{creator}' from pool (should_generate: {should_generate}, started: {is_started})");
        return PoolChange::Removed;
    }

    match count {
        0 => {
            pool.add_entry(entry.clone());
            debug!("added offer '{creator}' to pool");
            PoolChange::Added
        },
        1 => PoolChange::Unchanged,
        n => {
            warn!("offer '{creator}' was in the pool {n} times, pruning to one");
            pool.remove_entries(creator);
            pool.add_entry(entry.clone());
            PoolChange::Deduplicated
        },
    }
}

/// An offer that is not tied to a stage controller but still wants a pool slot while
/// some condition holds, such as a mission available at the bar.
pub trait OfferWiring {
    fn creator(&self) -> CreatorKey;

    fn is_priority(&self) -> bool {
        false
    }

    /// Whether the offer belongs in the pool right now.
    fn should_be_in_pool(&self) -> bool;

    fn entry(&self) -> OfferEntry {
        OfferEntry {
            creator: self.creator(),
            priority: self.is_priority(),
        }
    }

    /// Reconcile this wiring's pool entry.
    fn reconcile(&self, pool: &mut dyn OfferPool) -> PoolChange {
        let wanted = self.should_be_in_pool();
        let change = configure_offer_entry(pool, wanted, &self.entry(), !wanted);
        if change != PoolChange::Unchanged {
            info!("offer wiring '{}' {change}", self.creator());
        }
        change
    }
}
