//! Persistent Intent Store
//!
//! Session-scoped key/value storage that survives page reloads within a
//! tab. Holds the "activation in progress" flag and the onboarding
//! wizard's progress snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ActivationError, Result};

/// Key of the activation-in-progress flag
pub const ACTIVATION_FLAG_KEY: &str = "campus_activation_in_progress";

/// Key of the wizard progress snapshot
pub const WIZARD_SNAPSHOT_KEY: &str = "campus_onboarding_wizard";

/// Raw session storage
pub trait IntentStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Read the activation flag. Storage failures read as "not set".
pub fn read_flag(store: &dyn IntentStore) -> bool {
    match store.get(ACTIVATION_FLAG_KEY) {
        Ok(value) => value.as_deref() == Some("true"),
        Err(e) => {
            tracing::warn!(error = %e, "Activation flag unreadable, treating as unset");
            false
        }
    }
}

/// Persist or clear the activation flag
pub fn write_flag(store: &dyn IntentStore, active: bool) -> Result<()> {
    if active {
        store.set(ACTIVATION_FLAG_KEY, "true")
    } else {
        store.remove(ACTIVATION_FLAG_KEY)
    }
}

/// Onboarding wizard progress, restored after the checkout round-trip
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WizardSnapshot {
    /// Zero-based wizard step
    pub step: u8,

    /// Free-form form state of the wizard
    #[serde(default)]
    pub form: serde_json::Value,

    pub saved_at: DateTime<Utc>,
}

impl WizardSnapshot {
    pub fn new(step: u8, form: serde_json::Value) -> Self {
        Self {
            step,
            form,
            saved_at: Utc::now(),
        }
    }

    pub fn load(store: &dyn IntentStore) -> Result<Option<Self>> {
        store
            .get(WIZARD_SNAPSHOT_KEY)?
            .map(|raw| serde_json::from_str(&raw).map_err(ActivationError::from))
            .transpose()
    }

    pub fn save(&self, store: &dyn IntentStore) -> Result<()> {
        store.set(WIZARD_SNAPSHOT_KEY, &serde_json::to_string(self)?)
    }

    pub fn clear(store: &dyn IntentStore) -> Result<()> {
        store.remove(WIZARD_SNAPSHOT_KEY)
    }
}

/// In-memory intent store (for native hosts and tests)
#[derive(Default)]
pub struct MemoryIntentStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntentStore for MemoryIntentStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|e| ActivationError::Storage(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| ActivationError::Storage(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|e| ActivationError::Storage(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_lifecycle() {
        let store = MemoryIntentStore::new();
        assert!(!read_flag(&store));

        write_flag(&store, true).unwrap();
        assert!(read_flag(&store));

        write_flag(&store, false).unwrap();
        assert!(!read_flag(&store));
        assert_eq!(store.get(ACTIVATION_FLAG_KEY).unwrap(), None);
    }

    #[test]
    fn test_wizard_snapshot_persists() {
        let store = MemoryIntentStore::new();
        assert!(WizardSnapshot::load(&store).unwrap().is_none());

        let snapshot = WizardSnapshot::new(3, serde_json::json!({"cct": "09DPR0001A"}));
        snapshot.save(&store).unwrap();

        let loaded = WizardSnapshot::load(&store).unwrap().unwrap();
        assert_eq!(loaded.step, 3);
        assert_eq!(loaded.form["cct"], "09DPR0001A");

        WizardSnapshot::clear(&store).unwrap();
        assert!(WizardSnapshot::load(&store).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let store = MemoryIntentStore::new();
        store.set(WIZARD_SNAPSHOT_KEY, "{not json").unwrap();
        assert!(matches!(WizardSnapshot::load(&store), Err(ActivationError::Json(_))));
    }
}
