//! Periodic offer pool reconciliation.
//!
//! State outside the runtime can change what a quest's eligibility predicate returns
//! (the player levels up, a faction turns hostile) without anything telling the quest.
//! [`ReconcileScript`] catches that drift with a sweep at most once per interval of
//! in-world time, driven cooperatively by the host's frame loop.
//!
//! ### Clock rollback
//! Reloading an earlier save rewinds the clock, making the last sweep appear to be in
//! the future. A negative elapsed time is treated as a rollback: the script sweeps once
//! and re-baselines on the current timestamp, then normal gating resumes.

use std::rc::Rc;

use log::{debug, info, warn};

use crate::host::Services;
use crate::offer::{OfferWiring, PoolChange};
use crate::quest::QuestFacilitator;

/// Why a sweep ran, or didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTiming {
    /// Never swept before.
    First,
    /// At least one interval has passed.
    Due,
    /// The clock went backwards since the last sweep.
    Rollback,
    NotYet,
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub facilitators: usize,
    pub wirings: usize,
    /// Pool entries added, removed or deduplicated.
    pub pool_changes: usize,
}

/// The once-per-interval sweep.
///
/// Lives only as long as the runtime that owns it. A runtime started after a load has
/// no baseline and sweeps on its first advance.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileScript {
    last_sweep: Option<i64>,
    interval_days: f32,
}

impl ReconcileScript {
    pub fn new(interval_days: f32) -> ReconcileScript {
        ReconcileScript {
            last_sweep: None,
            interval_days,
        }
    }

    pub fn last_sweep(&self) -> Option<i64> {
        self.last_sweep
    }

    pub fn timing(&self, services: &Services) -> SweepTiming {
        let Some(last) = self.last_sweep else {
            return SweepTiming::First;
        };
        let elapsed = services.clock.elapsed_days_since(last);
        if elapsed < 0.0 {
            SweepTiming::Rollback
        } else if elapsed >= self.interval_days {
            SweepTiming::Due
        } else {
            SweepTiming::NotYet
        }
    }

    /// Called every frame. Sweeps if the interval has passed, returning what it did.
    pub fn advance(
        &mut self,
        services: &Services,
        facilitators: &[Rc<dyn QuestFacilitator>],
        wirings: &[Rc<dyn OfferWiring>],
    ) -> Option<SweepReport> {
        match self.timing(services) {
            SweepTiming::NotYet => return None,
            SweepTiming::Rollback => warn!(
                "clock moved back past the last reconciliation ({:?} -> {}), re-baselining",
                self.last_sweep,
                services.clock.timestamp()
            ),
            timing @ (SweepTiming::First | SweepTiming::Due) => debug!("reconciliation sweep ({timing:?})"),
        }
        self.last_sweep = Some(services.clock.timestamp());
        Some(sweep(services, facilitators, wirings))
    }
}

/// Reconcile every facilitator and wiring once, refreshing text replacements as well.
pub fn sweep(
    services: &Services,
    facilitators: &[Rc<dyn QuestFacilitator>],
    wirings: &[Rc<dyn OfferWiring>],
) -> SweepReport {
    let mut report = SweepReport {
        facilitators: facilitators.len(),
        wirings: wirings.len(),
        pool_changes: 0,
    };
    for facilitator in facilitators {
        if facilitator.reconcile() != PoolChange::Unchanged {
            report.pool_changes += 1;
        }
        facilitator.update_text_replacements(&mut services.text.borrow_mut());
    }
    for wiring in wirings {
        if wiring.reconcile(&mut *services.offers.borrow_mut()) != PoolChange::Unchanged {
            report.pool_changes += 1;
        }
    }
    if report.pool_changes > 0 {
        info!(
            "reconciliation changed {} pool entr{}",
            report.pool_changes,
            if report.pool_changes == 1 { "y" } else { "ies" }
        );
    }
    report
}
