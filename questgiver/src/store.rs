//! Persistent properties.
//!
//! Components never keep their own copy of persisted state. A [`PersistentProperty`]
//! names a key in the save-scoped [`DurableStore`] and reads or writes it on demand,
//! so whatever the store holds after a reload is what the component sees.

use std::fmt;
use std::rc::Rc;

use log::warn;
use questgiver_data::StoredValue;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::host::DurableStore;

/// Failures reading or writing structured records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] ron::Error),
    #[error("failed to decode record: {0}")]
    Decode(#[from] ron::error::SpannedError),
}

/// A typed view of one durable key, with a default used when the key is absent.
pub struct PersistentProperty<T> {
    key: String,
    default: Rc<dyn Fn() -> T>,
}

impl<T> Clone for PersistentProperty<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            default: Rc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for PersistentProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentProperty").field("key", &self.key).finish()
    }
}

impl<T: Serialize + DeserializeOwned> PersistentProperty<T> {
    pub fn new(key: impl Into<String>, default: impl Fn() -> T + 'static) -> PersistentProperty<T> {
        PersistentProperty {
            key: key.into(),
            default: Rc::new(default),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value, or the default if the key is missing or cannot be decoded.
    pub fn get(&self, store: &dyn DurableStore) -> T {
        match self.try_get(store) {
            Ok(Some(value)) => value,
            Ok(None) => (self.default)(),
            Err(e) => {
                warn!("durable key '{}' could not be decoded, using default: {e}", self.key);
                (self.default)()
            },
        }
    }

    /// Current value if present.
    ///
    /// # Errors
    /// - if the stored value does not decode as `T`
    pub fn try_get(&self, store: &dyn DurableStore) -> Result<Option<T>, StoreError> {
        let Some(stored) = store.get(&self.key) else {
            return Ok(None);
        };
        let raw = stored_as_ron(&stored)?;
        Ok(Some(ron::from_str(&raw)?))
    }

    /// Write `value` as a RON record.
    ///
    /// # Errors
    /// - if `value` cannot be serialized
    pub fn set(&self, store: &mut dyn DurableStore, value: &T) -> Result<(), StoreError> {
        let raw = ron::to_string(value)?;
        store.set(&self.key, StoredValue::Record(raw));
        Ok(())
    }

    /// Drop the key so the default applies again.
    pub fn clear(&self, store: &mut dyn DurableStore) {
        store.remove(&self.key);
    }
}

/// Render any stored value as RON so primitives written by the host decode through serde too.
fn stored_as_ron(value: &StoredValue) -> Result<String, StoreError> {
    Ok(match value {
        StoredValue::Bool(b) => b.to_string(),
        StoredValue::Int(i) => i.to_string(),
        StoredValue::Float(x) => ron::to_string(x)?,
        StoredValue::Text(s) => ron::to_string(s)?,
        StoredValue::Id(id) => ron::to_string(id)?,
        StoredValue::Record(raw) => raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Phase {
        Waiting,
        Travelling { destination: String },
    }

    #[test]
    fn missing_key_yields_default() {
        let store = MemoryStore::default();
        let prop = PersistentProperty::new("qg_phase", || Phase::Waiting);
        assert_eq!(prop.get(&store), Phase::Waiting);
    }

    #[test]
    fn set_then_get_returns_written_value() -> anyhow::Result<()> {
        let mut store = MemoryStore::default();
        let prop = PersistentProperty::new("qg_phase", || Phase::Waiting);
        let value = Phase::Travelling {
            destination: "Askonia".into(),
        };
        prop.set(&mut store, &value)?;
        assert_eq!(prop.get(&store), value);
        Ok(())
    }

    #[test]
    fn primitive_values_written_by_host_decode() {
        let mut store = MemoryStore::default();
        store.set("qg_seen", StoredValue::Bool(true));
        store.set("qg_name", StoredValue::Text("Riley".into()));
        assert!(PersistentProperty::new("qg_seen", || false).get(&store));
        assert_eq!(
            PersistentProperty::new("qg_name", String::new).get(&store),
            "Riley".to_string()
        );
    }

    #[test]
    fn undecodable_record_falls_back_to_default() {
        let mut store = MemoryStore::default();
        store.set("qg_phase", StoredValue::Record("NotAPhase(((".into()));
        let prop = PersistentProperty::new("qg_phase", || Phase::Waiting);
        assert!(prop.try_get(&store).is_err());
        assert_eq!(prop.get(&store), Phase::Waiting);
    }

    #[test]
    fn optional_values_default_to_none() -> anyhow::Result<()> {
        let mut store = MemoryStore::default();
        let prop: PersistentProperty<Option<String>> = PersistentProperty::new("qg_planet", || None);
        assert_eq!(prop.get(&store), None);
        prop.set(&mut store, &Some("Gilead".into()))?;
        assert_eq!(prop.get(&store), Some("Gilead".into()));
        prop.clear(&mut store);
        assert_eq!(prop.get(&store), None);
        Ok(())
    }
}
