//! Lazily started Copilot client, its model catalog cache, and generation
//! sessions.
//!
//! Two locks, never taken in the reverse order:
//! - `init_lock` serialises client start-up behind a lock-free fast path;
//! - `catalog` guards the cached model list and is held across a refresh,
//!   which may itself call [`SessionManager::client`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use prforge_config::defaults::{duration_from_secs, DEFAULT_AI_TIMEOUT_SECS};
use prforge_config::{Settings, SettingsStore};
use prforge_core::{
    AiHandler, Completion, CompletionRequest, GenerationError, ModelCatalogSource, ModelInfo,
    PrForgeError,
};
use prforge_logging::redact_sensitive_data;

use super::client::{BackendClient, ClientConnector, ClientSession};
use super::options::{ClientOptions, SessionConfig};
use crate::providers::wire::prompt_with_image;

const BACKEND: &str = "copilot_sdk";

/// How long a fetched catalog is served before the next call refetches it.
pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

struct CatalogCache {
    entries: Vec<ModelInfo>,
    fetched_at: Instant,
}

pub struct SessionManager {
    settings: SettingsStore,
    connector: Arc<dyn ClientConnector>,
    client: OnceLock<Arc<dyn BackendClient>>,
    init_lock: Mutex<()>,
    catalog: Mutex<Option<CatalogCache>>,
    catalog_ttl: Duration,
}

impl SessionManager {
    pub fn new(settings: SettingsStore, connector: Arc<dyn ClientConnector>) -> Self {
        Self {
            settings,
            connector,
            client: OnceLock::new(),
            init_lock: Mutex::new(()),
            catalog: Mutex::new(None),
            catalog_ttl: DEFAULT_CATALOG_TTL,
        }
    }

    pub fn with_catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    /// The shared client, started on first use.
    ///
    /// Concurrent first callers start exactly one client. A failed start
    /// leaves nothing behind, so a later call retries.
    pub async fn client(&self) -> Result<Arc<dyn BackendClient>> {
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }

        let _init = self.init_lock.lock().await;
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }

        let options = self.settings.read(|s| ClientOptions::from_settings(&s.copilot));
        if let Ok(rendered) = serde_json::to_string(&options) {
            debug!(options = %redact_sensitive_data(&rendered), "Starting Copilot client");
        }

        let client = self
            .connector
            .connect(&options)
            .await
            .map_err(|e| PrForgeError::BackendStartup(format!("{e:#}")))?;
        info!(remote = options.cli_url.is_some(), "Copilot client started");

        Ok(self.client.get_or_init(|| client).clone())
    }

    /// Normalized catalog sorted by id, served from cache within the TTL.
    pub async fn list_models(&self, force_refresh: bool) -> Result<Vec<ModelInfo>> {
        let mut cache = self.catalog.lock().await;
        if !force_refresh {
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.catalog_ttl {
                    return Ok(cached.entries.clone());
                }
            }
        }

        let client = self.client().await?;
        let mut entries: Vec<ModelInfo> = client
            .list_models()
            .await
            .context("Failed to list Copilot models")?
            .into_iter()
            .map(ModelInfo::from)
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = entries.len(), force_refresh, "Refreshed Copilot model catalog");

        *cache = Some(CatalogCache {
            entries: entries.clone(),
            fetched_at: Instant::now(),
        });
        Ok(entries)
    }

    pub async fn fetch_model_ids(&self, force_refresh: bool) -> Result<Vec<String>> {
        self.model_ids(force_refresh).await
    }

    /// One generation call in a fresh session that is destroyed afterwards.
    ///
    /// Session options and the timeout come from the request's settings, so
    /// target-level settings and request arguments apply to this call only.
    pub async fn run_generation(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, GenerationError> {
        if request.model.trim().is_empty() {
            return Err(GenerationError::NoModel);
        }

        let client = self.client().await.map_err(|e| {
            warn!(error = %format!("{e:#}"), "Copilot client unavailable");
            GenerationError::failed(BACKEND, format!("{e:#}"))
        })?;

        let settings = &request.settings;
        let config = SessionConfig::build(
            settings,
            &request.model,
            &request.system,
            request.reasoning_effort.as_deref(),
        );
        let timeout_secs = generation_timeout_secs(settings);
        let prompt = prompt_with_image(&request.user, request.image_url.as_deref());

        let session = client.create_session(&config).await.map_err(|e| {
            warn!(model = %request.model, error = %e, "Copilot session creation failed");
            GenerationError::failed(BACKEND, format!("{e:#}"))
        })?;
        let mut session = SessionGuard::new(session);

        let outcome = tokio::time::timeout(
            duration_from_secs(timeout_secs),
            session.send_and_wait(&prompt),
        )
        .await;
        session.close().await;

        match outcome {
            Ok(Ok(reply)) => Ok(Completion::from_text(reply.unwrap_or_default())),
            Ok(Err(e)) => {
                warn!(model = %request.model, error = %e, "Copilot inference failed");
                Err(GenerationError::failed(BACKEND, format!("{e:#}")))
            }
            Err(_) => {
                warn!(model = %request.model, timeout_secs, "Copilot inference timed out");
                Err(GenerationError::Timeout {
                    backend: BACKEND.to_string(),
                    secs: timeout_secs as u64,
                })
            }
        }
    }
}

/// `copilot.timeout`, then `config.ai_timeout`, then the default.
fn generation_timeout_secs(settings: &Settings) -> f64 {
    settings
        .copilot
        .timeout
        .or(settings.config.ai_timeout)
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(DEFAULT_AI_TIMEOUT_SECS)
}

/// Owns a session until it is closed; a guard dropped without `close`
/// (cancelled caller) destroys the session in the background.
struct SessionGuard {
    session: Option<Box<dyn ClientSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn ClientSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.session.as_mut() {
            Some(session) => session.send_and_wait(prompt).await,
            None => anyhow::bail!("session already destroyed"),
        }
    }

    async fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.destroy().await {
                debug!(error = %e, "Ignoring session destroy failure");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = session.destroy().await;
                });
            }
        }
    }
}

#[async_trait]
impl AiHandler for SessionManager {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn chat_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, GenerationError> {
        self.run_generation(request).await
    }
}

#[async_trait]
impl ModelCatalogSource for SessionManager {
    async fn models(&self, force_refresh: bool) -> Result<Vec<ModelInfo>> {
        self.list_models(force_refresh).await
    }
}
