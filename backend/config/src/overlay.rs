//! Scoped, restorable model overrides on the process-wide settings.
//!
//! An inline per-request model replaces both `config.model` and
//! `config.fallback_models` while its request runs. Overlapping requests
//! stack: the values captured before the first override are written back
//! when the last one ends, and ending an inner override re-applies the one
//! still running. A request without an override never touches these keys.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::schema::Settings;
use crate::store::SettingsStore;

/// An inline, per-request replacement for the configured model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelOverride {
    pub id: String,
    /// True when the id was matched against a live remote catalog.
    pub verified: bool,
}

/// Values of the keys an overlay rewrites.
#[derive(Debug, Clone, PartialEq)]
struct SettingsSnapshot {
    model: Option<String>,
    fallback_models: Option<Vec<String>>,
}

impl SettingsSnapshot {
    fn capture(settings: &Settings) -> Self {
        Self {
            model: settings.config.model.clone(),
            fallback_models: settings.config.fallback_models.clone(),
        }
    }

    fn write_back(&self, settings: &mut Settings) {
        settings.config.model = self.model.clone();
        settings.config.fallback_models = self.fallback_models.clone();
    }
}

/// Set the override as the only model to try.
pub fn apply_model_override(settings: &mut Settings, model: &ModelOverride) {
    settings.config.model = Some(model.id.clone());
    settings.config.fallback_models = Some(Vec::new());
}

#[derive(Debug, Default)]
struct Layers {
    /// Captured before the first of the currently active overrides.
    base: Option<SettingsSnapshot>,
    /// Active overrides in apply order, with the values each one wrote.
    active: Vec<(u64, SettingsSnapshot)>,
    next_id: u64,
}

/// Applies model overrides to one [`SettingsStore`]. Clones share state, so
/// a store should have a single overlay.
#[derive(Debug, Clone)]
pub struct SettingsOverlay {
    store: SettingsStore,
    layers: Arc<Mutex<Layers>>,
}

impl SettingsOverlay {
    pub fn new(store: SettingsStore) -> Self {
        Self {
            store,
            layers: Arc::new(Mutex::new(Layers::default())),
        }
    }

    /// Apply `model` and return the guard that undoes it.
    pub fn apply(&self, model: &ModelOverride) -> OverlayGuard {
        let mut guard = self.layers.lock().unwrap_or_else(PoisonError::into_inner);
        let layers = &mut *guard;
        let id = layers.next_id;
        layers.next_id += 1;

        let applied = self.store.update(|settings| {
            if layers.active.is_empty() {
                layers.base = Some(SettingsSnapshot::capture(settings));
            }
            apply_model_override(settings, model);
            SettingsSnapshot::capture(settings)
        });
        layers.active.push((id, applied));
        debug!(model = %model.id, verified = model.verified, depth = layers.active.len(), "Model override applied");

        OverlayGuard {
            overlay: self.clone(),
            id,
        }
    }

    fn release(&self, id: u64) {
        let mut guard = self.layers.lock().unwrap_or_else(PoisonError::into_inner);
        let layers = &mut *guard;
        let Some(pos) = layers.active.iter().position(|(active, _)| *active == id) else {
            return;
        };
        let was_top = pos + 1 == layers.active.len();
        layers.active.remove(pos);

        let restore = match layers.active.last() {
            None => layers.base.take(),
            Some((_, top)) if was_top => Some(top.clone()),
            Some(_) => None,
        };
        if let Some(snapshot) = restore {
            self.store.update(|settings| snapshot.write_back(settings));
            debug!(model = ?snapshot.model, "Model override released");
        }
    }
}

/// Undoes one override when dropped, including during unwinding.
#[derive(Debug)]
pub struct OverlayGuard {
    overlay: SettingsOverlay,
    id: u64,
}

impl Drop for OverlayGuard {
    fn drop(&mut self) {
        self.overlay.release(self.id);
    }
}
