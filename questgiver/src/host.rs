//! Host-facing seams.
//!
//! The runtime never reaches for process-wide singletons. Everything it needs from the
//! game (presentation, intel, the offer pool, save-scoped storage and the clock) comes in
//! through the traits below, bundled into [`Services`] and handed to each component when
//! it is constructed.

pub mod memory;

use std::cell::RefCell;
use std::rc::Rc;

use log::error;
use questgiver_data::{CreatorKey, Image, IntelClass, Shortcut, StoredValue, TextColor};
use uuid::Uuid;

use crate::config::QuestgiverConfig;
use crate::text::TextTable;

/// An option as it should appear on the presentation surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOption {
    pub id: String,
    pub text: String,
    pub color: Option<TextColor>,
    pub tooltip: Option<String>,
}

/// A paragraph of dialog text with its highlighted fragments already extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub highlights: Vec<String>,
    pub color: Option<TextColor>,
}

/// The dialog panel a session draws into.
pub trait PresentationSurface {
    fn clear_options(&mut self);
    fn add_option(&mut self, option: RenderedOption);
    fn set_shortcut(&mut self, option_id: &str, shortcut: Shortcut);
    fn show_image(&mut self, image: &Image);
    fn add_para(&mut self, para: Paragraph);
    fn dismiss(&mut self);
}

/// An intel entry visible to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct Intel {
    pub id: Uuid,
    pub class: IntelClass,
    pub title: String,
    pub important: bool,
}

impl Intel {
    pub fn new(class: IntelClass, title: impl Into<String>) -> Intel {
        Intel {
            id: Uuid::new_v4(),
            class,
            title: title.into(),
            important: false,
        }
    }
}

/// The host's intel manager.
pub trait IntelRegistry {
    fn find_first(&self, class: &IntelClass) -> Option<Uuid>;
    fn add(&mut self, intel: Intel);
    fn remove(&mut self, id: Uuid);
    fn end_immediately(&mut self, id: Uuid);
    fn end_after_delay(&mut self, id: Uuid, days: f32);
    fn is_ending(&self, id: Uuid) -> bool;
    fn is_ended(&self, id: Uuid) -> bool;
    /// Tell the player (and any intel listeners) that the entry changed.
    fn notify_changed(&mut self, id: Uuid);
}

/// One creator registered in the offer pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferEntry {
    pub creator: CreatorKey,
    pub priority: bool,
}

/// The pool of offers that may be presented at an interaction point.
///
/// Entries are identified by creator key; removal drops every entry of that creator.
pub trait OfferPool {
    fn has_entry(&self, creator: &CreatorKey) -> bool;
    fn count_entries(&self, creator: &CreatorKey) -> usize;
    fn add_entry(&mut self, entry: OfferEntry);
    fn remove_entries(&mut self, creator: &CreatorKey);
    fn reset_cooldown(&mut self, creator: &CreatorKey);
    /// Keep the creator from being re-offered at the current location.
    fn mark_interacted(&mut self, creator: &CreatorKey);
}

/// Save-scoped key/value storage that survives reload.
pub trait DurableStore {
    fn get(&self, key: &str) -> Option<StoredValue>;
    fn set(&mut self, key: &str, value: StoredValue);
    fn remove(&mut self, key: &str);

    /// True only when the key holds `Bool(true)`.
    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(StoredValue::Bool(true)))
    }
}

/// In-world clock.
pub trait Clock {
    /// Monotonic timestamp of the current moment.
    fn timestamp(&self) -> i64;
    /// In-world days between `timestamp` and now. Negative if `timestamp` is in the future.
    fn elapsed_days_since(&self, timestamp: i64) -> f32;
}

/// Sink for domain-generation failures.
pub trait ErrorReporter {
    /// Report the failure. Returns `true` if it was surfaced to the player.
    fn report(&self, error: &anyhow::Error) -> bool;
}

/// Reporter that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: &anyhow::Error) -> bool {
        error!("questgiver encountered an error: {error:#}");
        false
    }
}

/// Handles to every host service, cloned into each component that needs them.
#[derive(Clone)]
pub struct Services {
    pub intel: Rc<RefCell<dyn IntelRegistry>>,
    pub offers: Rc<RefCell<dyn OfferPool>>,
    pub store: Rc<RefCell<dyn DurableStore>>,
    pub clock: Rc<dyn Clock>,
    pub text: Rc<RefCell<TextTable>>,
    pub reporter: Rc<dyn ErrorReporter>,
    pub config: Rc<QuestgiverConfig>,
}

impl Services {
    /// Bundle host services with an empty text table and the log reporter.
    pub fn new(
        intel: Rc<RefCell<dyn IntelRegistry>>,
        offers: Rc<RefCell<dyn OfferPool>>,
        store: Rc<RefCell<dyn DurableStore>>,
        clock: Rc<dyn Clock>,
        config: QuestgiverConfig,
    ) -> Services {
        Services {
            intel,
            offers,
            store,
            clock,
            text: Rc::new(RefCell::new(TextTable::default())),
            reporter: Rc::new(LogReporter),
            config: Rc::new(config),
        }
    }

    /// Replace the error reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Rc<dyn ErrorReporter>) -> Services {
        self.reporter = reporter;
        self
    }

    /// Report a domain-generation failure through the configured reporter.
    pub fn report(&self, error: &anyhow::Error) -> bool {
        self.reporter.report(error)
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
