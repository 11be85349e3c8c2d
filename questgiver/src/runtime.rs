//! The runtime facade hosts talk to.
//!
//! A host builds one [`Questgiver`] per running game, hands it every quest at load time
//! and calls [`Questgiver::advance`] from its frame loop.

use std::rc::Rc;

use log::{debug, info};

use crate::host::Services;
use crate::lifecycle::{LifecycleEvent, LifecycleListener};
use crate::offer::OfferWiring;
use crate::quest::QuestFacilitator;
use crate::reconciler::{ReconcileScript, SweepReport};

pub struct Questgiver {
    services: Services,
    facilitators: Vec<Rc<dyn QuestFacilitator>>,
    wirings: Vec<Rc<dyn OfferWiring>>,
    listeners: Vec<Rc<dyn LifecycleListener>>,
    script: Option<ReconcileScript>,
}

impl Questgiver {
    pub fn new(services: Services) -> Questgiver {
        Questgiver {
            services,
            facilitators: Vec::new(),
            wirings: Vec::new(),
            listeners: Vec::new(),
            script: None,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn facilitators(&self) -> &[Rc<dyn QuestFacilitator>] {
        &self.facilitators
    }

    /// Register every quest and offer wiring, bring their derived state in line with the
    /// stored stages and start the reconciler.
    ///
    /// Calling this again replaces the previous registrations.
    pub fn load_quests(&mut self, facilitators: Vec<Rc<dyn QuestFacilitator>>, wirings: Vec<Rc<dyn OfferWiring>>) {
        self.facilitators = facilitators;
        self.wirings = wirings;
        self.resync_all();
        info!(
            "loaded {} quest(s) and {} offer wiring(s)",
            self.facilitators.len(),
            self.wirings.len()
        );
        self.start();
    }

    /// Transient registrations do not survive a reload, so every quest re-applies its
    /// stage and every wiring its pool entry.
    fn resync_all(&self) {
        for facilitator in &self.facilitators {
            facilitator.on_game_load();
            facilitator.update_text_replacements(&mut self.services.text.borrow_mut());
            debug!("synced quest '{}' at {}", facilitator.name(), facilitator.progress());
        }
        for wiring in &self.wirings {
            wiring.reconcile(&mut *self.services.offers.borrow_mut());
        }
    }

    pub fn add_listener(&mut self, listener: Rc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Start the reconciler. Returns `false` if it was already running.
    pub fn start(&mut self) -> bool {
        if self.script.is_some() {
            return false;
        }
        self.script = Some(ReconcileScript::new(self.services.config.reconcile_interval_days));
        debug!("reconciler started");
        true
    }

    /// Stop the reconciler.
    pub fn stop(&mut self) {
        if self.script.take().is_some() {
            debug!("reconciler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.script.is_some()
    }

    /// Per-frame hook. Runs a reconciliation sweep when one is due.
    pub fn advance(&mut self) -> Option<SweepReport> {
        let script = self.script.as_mut()?;
        script.advance(&self.services, &self.facilitators, &self.wirings)
    }

    /// Re-sync the registered quests, make sure the reconciler runs and tell listeners.
    pub fn on_game_load(&mut self, is_new_game: bool) {
        self.resync_all();
        self.start();
        self.broadcast(LifecycleEvent::GameLoad { is_new_game });
    }

    pub fn before_game_save(&self) {
        self.broadcast(LifecycleEvent::BeforeGameSave);
    }

    pub fn after_game_save(&self) {
        self.broadcast(LifecycleEvent::AfterGameSave);
    }

    pub fn on_game_save_failed(&self) {
        self.broadcast(LifecycleEvent::GameSaveFailed);
    }

    pub fn on_new_game_after_proc_gen(&self) {
        self.broadcast(LifecycleEvent::NewGameAfterProcGen);
    }

    pub fn on_new_game_after_economy_load(&self) {
        self.broadcast(LifecycleEvent::NewGameAfterEconomyLoad);
    }

    pub fn on_new_game_after_time_pass(&self) {
        self.broadcast(LifecycleEvent::NewGameAfterTimePass);
    }

    fn broadcast(&self, event: LifecycleEvent) {
        debug!("broadcasting {event:?} to {} listener(s)", self.listeners.len());
        for listener in &self.listeners {
            event.dispatch(listener.as_ref());
        }
    }

    /// `name` in the configured key namespace.
    pub fn persisted_key(&self, name: &str) -> String {
        self.services.config.persisted_key(name)
    }
}

impl std::fmt::Debug for Questgiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Questgiver")
            .field("quests", &self.facilitators.iter().map(|q| q.name()).collect::<Vec<_>>())
            .field("wirings", &self.wirings.len())
            .field("listeners", &self.listeners.len())
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuestgiverConfig;
    use crate::host::memory::MemoryHost;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Journal(RefCell<Vec<String>>);

    impl LifecycleListener for Journal {
        fn on_game_load(&self, is_new_game: bool) {
            self.0.borrow_mut().push(format!("load({is_new_game})"));
        }

        fn before_game_save(&self) {
            self.0.borrow_mut().push("before_save".into());
        }
    }

    #[test]
    fn start_is_idempotent_and_stop_removes_the_script() {
        let host = MemoryHost::new();
        let mut runtime = Questgiver::new(host.services(QuestgiverConfig::default()));
        assert!(runtime.start());
        assert!(!runtime.start());
        assert!(runtime.is_running());
        runtime.stop();
        assert!(!runtime.is_running());
        assert!(runtime.advance().is_none());
    }

    #[test]
    fn restarted_reconciler_has_no_baseline() {
        let host = MemoryHost::new();
        let mut runtime = Questgiver::new(host.services(QuestgiverConfig::default()));
        runtime.start();
        assert!(runtime.advance().is_some());
        assert!(runtime.advance().is_none());
        runtime.stop();
        runtime.start();
        assert!(runtime.advance().is_some());
    }

    #[test]
    fn load_with_no_quests_starts_and_sweeps() {
        let host = MemoryHost::new();
        let mut runtime = Questgiver::new(host.services(QuestgiverConfig::default()));
        runtime.load_quests(Vec::new(), Vec::new());
        assert!(runtime.is_running());
        assert_eq!(runtime.advance().map(|r| r.facilitators), Some(0));
    }

    #[test]
    fn lifecycle_events_reach_listeners_with_defaults_for_the_rest() {
        let host = MemoryHost::new();
        let mut runtime = Questgiver::new(host.services(QuestgiverConfig::default()));
        let journal = Rc::new(Journal::default());
        runtime.add_listener(journal.clone());
        runtime.on_game_load(true);
        runtime.before_game_save();
        runtime.after_game_save();
        assert_eq!(*journal.0.borrow(), vec!["load(true)".to_string(), "before_save".to_string()]);
    }

    #[test]
    fn persisted_keys_use_the_configured_prefix() {
        let host = MemoryHost::new();
        let config = QuestgiverConfig {
            mod_prefix: "wisp_".into(),
            ..QuestgiverConfig::default()
        };
        let runtime = Questgiver::new(host.services(config));
        assert_eq!(runtime.persisted_key("riley_stage"), "wisp_riley_stage");
    }
}
