//! In-memory host services.
//!
//! Useful for headless tools, the terminal demo and tests. Every type here is a
//! complete implementation of its trait, not a mock: the offer pool tolerates
//! duplicate entries exactly like a real host pool would, so reconciliation has
//! something to correct.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use log::{debug, info};
use questgiver_data::{CreatorKey, Image, IntelClass, Shortcut, StoredValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Clock, DurableStore, ErrorReporter, Intel, IntelRegistry, OfferEntry, OfferPool, Paragraph, PresentationSurface,
    RenderedOption, Services,
};
use crate::config::QuestgiverConfig;
use crate::store::StoreError;

/// Clock ticks in one in-world day.
pub const TICKS_PER_DAY: i64 = 86_400;

/// Bookkeeping for one intel entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IntelRecord {
    pub intel: Intel,
    pub ending_in_days: Option<f32>,
    pub ended: bool,
    pub updates: u32,
}

/// Intel registry backed by a `Vec`.
#[derive(Debug, Default)]
pub struct MemoryIntelRegistry {
    pub records: Vec<IntelRecord>,
}

impl MemoryIntelRegistry {
    /// Number of entries of `class` that have not ended.
    pub fn visible_count(&self, class: &IntelClass) -> usize {
        self.records
            .iter()
            .filter(|r| &r.intel.class == class && !r.ended)
            .count()
    }

    pub fn record(&self, id: Uuid) -> Option<&IntelRecord> {
        self.records.iter().find(|r| r.intel.id == id)
    }

    fn record_mut(&mut self, id: Uuid) -> Option<&mut IntelRecord> {
        self.records.iter_mut().find(|r| r.intel.id == id)
    }
}

impl IntelRegistry for MemoryIntelRegistry {
    fn find_first(&self, class: &IntelClass) -> Option<Uuid> {
        self.records.iter().find(|r| &r.intel.class == class).map(|r| r.intel.id)
    }

    fn add(&mut self, intel: Intel) {
        debug!("intel added: {} ({})", intel.title, intel.class);
        self.records.push(IntelRecord {
            intel,
            ending_in_days: None,
            ended: false,
            updates: 0,
        });
    }

    fn remove(&mut self, id: Uuid) {
        self.records.retain(|r| r.intel.id != id);
    }

    fn end_immediately(&mut self, id: Uuid) {
        if let Some(record) = self.record_mut(id) {
            record.ended = true;
            record.ending_in_days = None;
        }
    }

    fn end_after_delay(&mut self, id: Uuid, days: f32) {
        if let Some(record) = self.record_mut(id) {
            record.ending_in_days = Some(days);
        }
    }

    fn is_ending(&self, id: Uuid) -> bool {
        self.record(id).is_some_and(|r| r.ending_in_days.is_some())
    }

    fn is_ended(&self, id: Uuid) -> bool {
        self.record(id).is_some_and(|r| r.ended)
    }

    fn notify_changed(&mut self, id: Uuid) {
        if let Some(record) = self.record_mut(id) {
            record.updates += 1;
        }
    }
}

/// Offer pool backed by a `Vec` of entries plus per-creator cooldowns.
#[derive(Debug, Default)]
pub struct MemoryOfferPool {
    pub entries: Vec<OfferEntry>,
    pub cooldowns: HashMap<CreatorKey, f32>,
    pub interacted: HashSet<CreatorKey>,
}

impl MemoryOfferPool {
    pub fn set_cooldown(&mut self, creator: &CreatorKey, days: f32) {
        self.cooldowns.insert(creator.clone(), days);
    }

    pub fn cooldown(&self, creator: &CreatorKey) -> f32 {
        self.cooldowns.get(creator).copied().unwrap_or(0.0)
    }
}

impl OfferPool for MemoryOfferPool {
    fn has_entry(&self, creator: &CreatorKey) -> bool {
        self.entries.iter().any(|e| &e.creator == creator)
    }

    fn count_entries(&self, creator: &CreatorKey) -> usize {
        self.entries.iter().filter(|e| &e.creator == creator).count()
    }

    fn add_entry(&mut self, entry: OfferEntry) {
        self.entries.push(entry);
    }

    fn remove_entries(&mut self, creator: &CreatorKey) {
        self.entries.retain(|e| &e.creator != creator);
    }

    fn reset_cooldown(&mut self, creator: &CreatorKey) {
        self.cooldowns.insert(creator.clone(), 0.0);
    }

    fn mark_interacted(&mut self, creator: &CreatorKey) {
        self.interacted.insert(creator.clone());
    }
}

/// Durable store backed by an ordered map. Serializable so a whole save can be snapshotted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize the store as it would be written into a save.
    ///
    /// # Errors
    /// - if RON serialization fails
    pub fn to_ron(&self) -> Result<String, StoreError> {
        Ok(ron::to_string(self)?)
    }

    /// Restore a store from a snapshot produced by [`MemoryStore::to_ron`].
    ///
    /// # Errors
    /// - if the snapshot is not valid RON for a store
    pub fn from_ron(raw: &str) -> Result<MemoryStore, StoreError> {
        let store: MemoryStore = ron::from_str(raw)?;
        info!("restored durable store with {} keys", store.len());
        Ok(store)
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StoredValue) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start: i64) -> ManualClock {
        ManualClock { now: Cell::new(start) }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn advance_days(&self, days: f32) {
        let ticks = (f64::from(days) * TICKS_PER_DAY as f64).round() as i64;
        self.now.set(self.now.get() + ticks);
    }

    /// Jump to an arbitrary timestamp, including one in the past.
    pub fn set_timestamp(&self, timestamp: i64) {
        self.now.set(timestamp);
    }
}

impl Clock for ManualClock {
    fn timestamp(&self) -> i64 {
        self.now.get()
    }

    #[allow(clippy::cast_precision_loss)]
    fn elapsed_days_since(&self, timestamp: i64) -> f32 {
        let delta = self.now.get().saturating_sub(timestamp);
        (delta as f64 / TICKS_PER_DAY as f64) as f32
    }
}

/// Surface that records everything drawn into it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub options: Vec<RenderedOption>,
    pub shortcuts: Vec<(String, Shortcut)>,
    pub images: Vec<Image>,
    pub paragraphs: Vec<Paragraph>,
    pub dismissed: bool,
}

impl RecordingSurface {
    pub fn option_ids(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.id.as_str()).collect()
    }

    pub fn option_texts(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.text.as_str()).collect()
    }

    pub fn paragraph_texts(&self) -> Vec<&str> {
        self.paragraphs.iter().map(|p| p.text.as_str()).collect()
    }
}

impl PresentationSurface for RecordingSurface {
    fn clear_options(&mut self) {
        self.options.clear();
        self.shortcuts.clear();
    }

    fn add_option(&mut self, option: RenderedOption) {
        self.options.push(option);
    }

    fn set_shortcut(&mut self, option_id: &str, shortcut: Shortcut) {
        self.shortcuts.push((option_id.to_string(), shortcut));
    }

    fn show_image(&mut self, image: &Image) {
        self.images.push(image.clone());
    }

    fn add_para(&mut self, para: Paragraph) {
        self.paragraphs.push(para);
    }

    fn dismiss(&mut self) {
        self.dismissed = true;
    }
}

/// Reporter that keeps every reported message.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: RefCell<Vec<String>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, error: &anyhow::Error) -> bool {
        self.reports.borrow_mut().push(format!("{error:#}"));
        true
    }
}

/// A complete in-memory host, keeping concrete handles so callers can inspect state.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    pub intel: Rc<RefCell<MemoryIntelRegistry>>,
    pub offers: Rc<RefCell<MemoryOfferPool>>,
    pub store: Rc<RefCell<MemoryStore>>,
    pub clock: Rc<ManualClock>,
    pub reporter: Rc<RecordingReporter>,
}

impl MemoryHost {
    pub fn new() -> MemoryHost {
        MemoryHost {
            intel: Rc::new(RefCell::new(MemoryIntelRegistry::default())),
            offers: Rc::new(RefCell::new(MemoryOfferPool::default())),
            store: Rc::new(RefCell::new(MemoryStore::default())),
            clock: Rc::new(ManualClock::new(0)),
            reporter: Rc::new(RecordingReporter::default()),
        }
    }

    /// Simulate a reload: the durable store survives, every transient registration is lost.
    #[must_use]
    pub fn reloaded(&self) -> MemoryHost {
        MemoryHost {
            intel: Rc::new(RefCell::new(MemoryIntelRegistry::default())),
            offers: Rc::new(RefCell::new(MemoryOfferPool::default())),
            store: Rc::new(RefCell::new(self.store.borrow().clone())),
            clock: Rc::new(ManualClock::new(self.clock.timestamp())),
            reporter: Rc::new(RecordingReporter::default()),
        }
    }

    /// Build the service bundle the runtime components expect.
    pub fn services(&self, config: QuestgiverConfig) -> Services {
        let intel: Rc<RefCell<dyn IntelRegistry>> = self.intel.clone();
        let offers: Rc<RefCell<dyn OfferPool>> = self.offers.clone();
        let store: Rc<RefCell<dyn DurableStore>> = self.store.clone();
        let clock: Rc<dyn Clock> = self.clock.clone();
        let reporter: Rc<dyn ErrorReporter> = self.reporter.clone();
        Services::new(intel, offers, store, clock, config).with_reporter(reporter)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reports_fractional_days() {
        let clock = ManualClock::new(0);
        clock.advance_days(1.5);
        assert!((clock.elapsed_days_since(0) - 1.5).abs() < f32::EPSILON);
        assert!(clock.elapsed_days_since(clock.timestamp() + TICKS_PER_DAY) < 0.0);
    }

    #[test]
    fn offer_pool_removes_every_entry_of_a_creator() {
        let mut pool = MemoryOfferPool::default();
        let key = CreatorKey::new("dragons");
        for _ in 0..3 {
            pool.add_entry(OfferEntry {
                creator: key.clone(),
                priority: false,
            });
        }
        assert_eq!(pool.count_entries(&key), 3);
        pool.remove_entries(&key);
        assert!(!pool.has_entry(&key));
    }

    #[test]
    fn intel_registry_tracks_ending_and_ended() {
        let mut registry = MemoryIntelRegistry::default();
        let intel = Intel::new(IntelClass::new("courier"), "Deliver the parcel");
        let id = intel.id;
        registry.add(intel);
        assert!(!registry.is_ending(id));
        registry.end_after_delay(id, 3.0);
        assert!(registry.is_ending(id));
        registry.end_immediately(id);
        assert!(registry.is_ended(id));
        assert_eq!(registry.visible_count(&IntelClass::new("courier")), 0);
    }

    #[test]
    fn store_snapshot_round_trips() -> anyhow::Result<()> {
        let mut store = MemoryStore::default();
        store.set("qg_flag", StoredValue::Bool(true));
        store.set("qg_stage", StoredValue::Record("InProgress".into()));
        let restored = MemoryStore::from_ron(&store.to_ron()?)?;
        assert_eq!(restored, store);
        assert!(restored.flag("qg_flag"));
        Ok(())
    }

    #[test]
    fn reloaded_host_keeps_only_the_store() {
        let host = MemoryHost::new();
        host.store.borrow_mut().set("k", StoredValue::Int(4));
        host.offers.borrow_mut().add_entry(OfferEntry {
            creator: CreatorKey::new("c"),
            priority: false,
        });
        let reloaded = host.reloaded();
        assert_eq!(reloaded.store.borrow().get("k"), Some(StoredValue::Int(4)));
        assert!(reloaded.offers.borrow().entries.is_empty());
    }
}
