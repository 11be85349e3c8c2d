//! Stage-driven quest facilitation.
//!
//! A [`StageController`] owns one quest's stage and keeps the intel registry and the
//! offer pool consistent with it. Every write goes through [`StageController::set_stage`],
//! which records the new stage and reconciles both subsystems in the same call.

use std::fmt;
use std::rc::Rc;

use anyhow::Context;
use log::{debug, info, warn};
use questgiver_data::{CreatorKey, IntelClass, OfferSite, Progress};
use uuid::Uuid;

use crate::host::{Intel, OfferEntry, Services};
use crate::offer::{PoolChange, configure_offer_entry};
use crate::stage::Stage;
use crate::store::{PersistentProperty, StoreError};
use crate::text::TextTable;

/// Intel shown while a quest is in progress.
#[derive(Clone)]
pub struct IntelDescriptor {
    pub class: IntelClass,
    factory: Rc<dyn Fn() -> anyhow::Result<Intel>>,
}

impl IntelDescriptor {
    pub fn new(
        class: IntelClass,
        factory: impl Fn() -> anyhow::Result<Intel> + 'static,
    ) -> IntelDescriptor {
        IntelDescriptor {
            class,
            factory: Rc::new(factory),
        }
    }
}

impl fmt::Debug for IntelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntelDescriptor").field("class", &self.class).finish_non_exhaustive()
    }
}

/// How a quest is offered to the player.
#[derive(Clone)]
pub struct OfferDescriptor {
    pub entry: OfferEntry,
    eligible: Rc<dyn Fn() -> bool>,
    accepts_site: Rc<dyn Fn(&OfferSite) -> bool>,
    regenerate: Option<Rc<dyn Fn(&OfferSite) -> anyhow::Result<()>>>,
}

impl OfferDescriptor {
    /// `eligible` decides whether the offer belongs in the pool at all. `accepts_site`
    /// is the per-location check run when the pool is consulted at a site.
    pub fn new(
        creator: CreatorKey,
        eligible: impl Fn() -> bool + 'static,
        accepts_site: impl Fn(&OfferSite) -> bool + 'static,
    ) -> OfferDescriptor {
        OfferDescriptor {
            entry: OfferEntry {
                creator,
                priority: false,
            },
            eligible: Rc::new(eligible),
            accepts_site: Rc::new(accepts_site),
            regenerate: None,
        }
    }

    #[must_use]
    pub fn priority(mut self) -> OfferDescriptor {
        self.entry.priority = true;
        self
    }

    /// Set the quest up as if it were about to start from `site`, before the site check.
    #[must_use]
    pub fn with_regenerate(mut self, regenerate: impl Fn(&OfferSite) -> anyhow::Result<()> + 'static) -> OfferDescriptor {
        self.regenerate = Some(Rc::new(regenerate));
        self
    }

    pub fn is_eligible(&self) -> bool {
        (self.eligible)()
    }
}

impl fmt::Debug for OfferDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfferDescriptor")
            .field("entry", &self.entry)
            .field("regenerates", &self.regenerate.is_some())
            .finish_non_exhaustive()
    }
}

/// A quest the runtime keeps reconciled.
pub trait QuestFacilitator {
    fn name(&self) -> &str;
    fn progress(&self) -> Progress;
    /// Install this quest's `${name}` getters. Must be safe to call repeatedly.
    fn update_text_replacements(&self, text: &mut TextTable);
    /// Re-evaluate offer pool membership.
    fn reconcile(&self) -> PoolChange;
    /// Re-apply the current stage's side effects after a load.
    fn on_game_load(&self);
}

/// Owns a quest's stage and the intel and offer state derived from it.
pub struct StageController<St: Stage> {
    name: String,
    stage: PersistentProperty<St>,
    intel: Option<IntelDescriptor>,
    offer: Option<OfferDescriptor>,
    text_replacements: Option<Rc<dyn Fn(&mut TextTable)>>,
    services: Services,
}

impl<St: Stage> StageController<St> {
    /// A controller whose stage lives under `<prefix><name>_stage`, starting at `initial`.
    pub fn new(name: impl Into<String>, initial: impl Fn() -> St + 'static, services: &Services) -> StageController<St> {
        let name = name.into();
        let key = services.config.persisted_key(&format!("{name}_stage"));
        StageController {
            name,
            stage: PersistentProperty::new(key, initial),
            intel: None,
            offer: None,
            text_replacements: None,
            services: services.clone(),
        }
    }

    #[must_use]
    pub fn with_intel(mut self, intel: IntelDescriptor) -> StageController<St> {
        self.intel = Some(intel);
        self
    }

    #[must_use]
    pub fn with_offer(mut self, offer: OfferDescriptor) -> StageController<St> {
        self.offer = Some(offer);
        self
    }

    #[must_use]
    pub fn with_text_replacements(mut self, install: impl Fn(&mut TextTable) + 'static) -> StageController<St> {
        self.text_replacements = Some(Rc::new(install));
        self
    }

    pub fn stage_key(&self) -> &str {
        self.stage.key()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn offer(&self) -> Option<&OfferDescriptor> {
        self.offer.as_ref()
    }

    /// The stored stage.
    pub fn stage(&self) -> St {
        self.stage.get(&*self.services.store.borrow())
    }

    /// Record `new_stage` and reconcile intel and the offer pool against it.
    ///
    /// Intel and cooldown side effects only run when the stage actually changes variant.
    /// Offer membership is reconciled on every write.
    ///
    /// # Errors
    /// - if the stage cannot be serialized; nothing else is touched in that case
    pub fn set_stage(&self, new_stage: St) -> Result<(), StoreError> {
        let old_stage = self.stage();
        self.stage.set(&mut *self.services.store.borrow_mut(), &new_stage)?;
        let progress = new_stage.progress();

        if !old_stage.same_stage(&new_stage) {
            info!("quest '{}' moved from {old_stage:?} to {new_stage:?}", self.name);
            self.apply_intel(progress);
            if progress == Progress::NotStarted {
                self.withdraw_offer();
            }
        }
        self.reconcile_offer(progress);
        Ok(())
    }

    /// Re-apply the current stage's intel and offer state without a transition.
    pub fn resync(&self) {
        let progress = self.stage().progress();
        debug!("re-syncing quest '{}' at {progress}", self.name);
        self.apply_intel(progress);
        self.reconcile_offer(progress);
    }

    /// The shown intel entry of this quest's class, if any.
    pub fn shown_intel(&self) -> Option<Uuid> {
        let intel = self.intel.as_ref()?;
        self.services.intel.borrow().find_first(&intel.class)
    }

    /// Whether the quest should be offered at `site` right now.
    ///
    /// A not-started quest regenerates itself for `site` first. A failed regeneration
    /// is reported and the quest is not offered.
    pub fn should_offer_at(&self, site: &OfferSite) -> bool {
        let Some(offer) = &self.offer else {
            return false;
        };
        let progress = self.stage().progress();
        if progress == Progress::NotStarted
            && let Some(regenerate) = &offer.regenerate
            && let Err(e) = regenerate(site)
        {
            let e = e.context(format!("regenerating quest '{}' for {}", self.name, site.name));
            self.services.report(&e);
            return false;
        }
        progress != Progress::Completed
            && self.services.config.is_valid_quest_target(site)
            && offer.is_eligible()
            && (offer.accepts_site)(site)
    }

    fn apply_intel(&self, progress: Progress) {
        let Some(descriptor) = &self.intel else {
            return;
        };
        let shown = self.services.intel.borrow().find_first(&descriptor.class);
        match (progress, shown) {
            (Progress::NotStarted, Some(id)) => {
                let mut registry = self.services.intel.borrow_mut();
                registry.end_immediately(id);
                registry.remove(id);
                info!("quest '{}' intel {id} ended and removed", self.name);
            },
            (Progress::InProgress, None) => {
                let created = (descriptor.factory)()
                    .with_context(|| format!("creating {} intel for quest '{}'", descriptor.class, self.name));
                match created {
                    Ok(intel) => {
                        info!("quest '{}' intel '{}' added", self.name, intel.title);
                        self.services.intel.borrow_mut().add(intel);
                    },
                    Err(e) => {
                        warn!("quest '{}' has no intel: {e:#}", self.name);
                        self.services.report(&e);
                    },
                }
            },
            (Progress::Completed, Some(id)) => {
                let mut registry = self.services.intel.borrow_mut();
                if !registry.is_ending(id) && !registry.is_ended(id) {
                    registry.end_after_delay(id, self.services.config.intel_end_delay_days);
                    registry.notify_changed(id);
                    info!("quest '{}' intel {id} scheduled to end", self.name);
                }
            },
            _ => {},
        }
    }

    /// Drop the offer from the pool with its cooldown cleared, so it comes back as soon as
    /// it is eligible again.
    fn withdraw_offer(&self) {
        let Some(offer) = &self.offer else {
            return;
        };
        let mut pool = self.services.offers.borrow_mut();
        if pool.has_entry(&offer.entry.creator) {
            pool.reset_cooldown(&offer.entry.creator);
            pool.remove_entries(&offer.entry.creator);
            debug!("offer '{}' withdrawn with cooldown reset", offer.entry.creator);
        }
    }

    fn reconcile_offer(&self, progress: Progress) -> PoolChange {
        let Some(offer) = &self.offer else {
            return PoolChange::Unchanged;
        };
        let eligible = offer.is_eligible();
        let change = configure_offer_entry(
            &mut *self.services.offers.borrow_mut(),
            eligible,
            &offer.entry,
            progress != Progress::NotStarted,
        );
        if change != PoolChange::Unchanged {
            info!("quest '{}' offer {change}", self.name);
        }
        change
    }
}

impl<St: Stage> QuestFacilitator for StageController<St> {
    fn name(&self) -> &str {
        &self.name
    }

    fn progress(&self) -> Progress {
        self.stage().progress()
    }

    fn update_text_replacements(&self, text: &mut TextTable) {
        if let Some(install) = &self.text_replacements {
            install(text);
        }
    }

    fn reconcile(&self) -> PoolChange {
        self.reconcile_offer(self.progress())
    }

    fn on_game_load(&self) {
        self.resync();
    }
}

impl<St: Stage> fmt::Debug for StageController<St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageController")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("intel", &self.intel)
            .field("offer", &self.offer)
            .finish_non_exhaustive()
    }
}
