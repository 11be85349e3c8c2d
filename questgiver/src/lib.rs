#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const QUESTGIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod config;
pub mod dialog;
pub mod host;
pub mod lifecycle;
pub mod offer;
pub mod quest;
pub mod reconciler;
pub mod rehydrate;
pub mod runtime;
pub mod stage;
pub mod store;
pub mod style;
pub mod terminal;
pub mod text;

// Re-exports for convenience
pub use config::{ConfigError, QuestgiverConfig, load_config, try_load_config};
pub use dialog::{Dialog, DialogError, DialogOption, DialogSession, Page, PageNavigator};
pub use host::Services;
pub use lifecycle::LifecycleListener;
pub use offer::{OfferWiring, PoolChange, configure_offer_entry};
pub use quest::{IntelDescriptor, OfferDescriptor, QuestFacilitator, StageController};
pub use reconciler::ReconcileScript;
pub use rehydrate::{Definition, DefinitionData, Rehydrate, RehydrateError, TemplateRegistry, rehydrate_all};
pub use runtime::Questgiver;
pub use stage::Stage;
pub use store::{PersistentProperty, StoreError};
pub use text::TextTable;
