//! Process-wide settings store.

use std::sync::{Arc, PoisonError, RwLock};

use crate::schema::Settings;

/// Shared handle to the process-wide settings.
///
/// Reads and writes never hold the lock across an await point.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Owned copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.read(Settings::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn replace(&self, settings: Settings) {
        self.update(|s| *s = settings);
    }

    pub fn model(&self) -> Option<String> {
        self.read(|s| s.config.model.clone())
    }

    pub fn fallback_models(&self) -> Option<Vec<String>> {
        self.read(|s| s.config.fallback_models.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let store = SettingsStore::default();
        let other = store.clone();
        other.update(|s| s.config.model = Some("o3".into()));
        assert_eq!(store.model().as_deref(), Some("o3"));
    }
}
