//! Command dispatch: from a raw request to one tool run.
//!
//! The pipeline per request:
//! target settings layer, tokenize, inline model override, argument
//! validation, language injection and model overlay, command lookup, tool
//! construction and run. The overlay is restored on every exit path and the
//! public entry point never fails, it reports `false` instead.
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use futures::FutureExt;
use serde_json::Value;
use tracing::{Instrument, error, info, info_span, warn};

use prforge_config::{
    ArgValidator, ForbiddenArgsValidator, Settings, SettingsOverlay, SettingsStore,
    apply_merge_patch, apply_model_override, inject_response_language, update_settings_from_args,
};
use prforge_core::{ModelOverride, PrForgeError};
use prforge_handlers::{BackendHandlers, HandlerKind};

use crate::classifier::ModelNameClassifier;
use crate::registry::{CommandEntry, CommandTable, ToolContext};
use crate::target::{NoTargetSettings, TargetProviderFactory, TargetSettingsSource};
use crate::tokenize::{Request, tokenize};

/// Called right before a tool is constructed (not for `auto_review`).
pub type Notify<'a> = &'a (dyn Fn() + Send + Sync);

pub struct Dispatcher {
    store: SettingsStore,
    overlay: SettingsOverlay,
    handlers: BackendHandlers,
    classifier: ModelNameClassifier,
    validator: Arc<dyn ArgValidator>,
    commands: CommandTable,
    target_settings: Arc<dyn TargetSettingsSource>,
    providers: Arc<dyn TargetProviderFactory>,
}

impl Dispatcher {
    pub fn new(
        store: SettingsStore,
        handlers: BackendHandlers,
        commands: CommandTable,
        providers: Arc<dyn TargetProviderFactory>,
    ) -> Self {
        Self {
            overlay: SettingsOverlay::new(store.clone()),
            store,
            classifier: ModelNameClassifier::new(handlers.clone()),
            handlers,
            validator: Arc::new(ForbiddenArgsValidator::default()),
            commands,
            target_settings: Arc::new(NoTargetSettings),
            providers,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ArgValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_target_settings(mut self, source: Arc<dyn TargetSettingsSource>) -> Self {
        self.target_settings = source;
        self
    }

    pub fn with_model_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.classifier = ModelNameClassifier::new(self.handlers.clone()).with_lookup_timeout(timeout);
        self
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Handle one request against `target`. Never fails; errors are logged
    /// and reported as `false`.
    pub async fn handle(&self, target: &str, request: impl Into<Request>) -> bool {
        self.handle_with_notify(target, request, None).await
    }

    pub async fn handle_with_notify(
        &self,
        target: &str,
        request: impl Into<Request>,
        notify: Option<Notify<'_>>,
    ) -> bool {
        let request = request.into();
        match AssertUnwindSafe(self.process(target, request, notify))
            .catch_unwind()
            .await
        {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => {
                error!(error = %format!("{e:#}"), target = %target, "Failed to process the command");
                false
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(panic = %reason, target = %target, "Failed to process the command");
                false
            }
        }
    }

    async fn process(&self, target: &str, request: Request, notify: Option<Notify<'_>>) -> Result<bool> {
        let patch = match self.target_settings.settings_patch(target).await {
            Ok(patch) => patch,
            Err(e) => {
                warn!(error = %e, target = %target, "Failed to load target settings; using global settings");
                None
            }
        };
        let base = layer(self.store.snapshot(), patch.as_ref())?;

        let command = tokenize(request)?;

        let (model_override, args) = self
            .classifier
            .extract_override(&command.args, &base.ai_handler_key())
            .await;
        if let Some(model) = &model_override {
            info!(model = %model.id, verified = model.verified, "Using inline model override");
        }

        if let Err(param) = self.validator.validate(&args) {
            let err = PrForgeError::ForbiddenArgument(param);
            error!(error = %err, "Rejected request argument; set it in a configuration file instead");
            return Ok(false);
        }

        self.store.update(inject_response_language);
        let _overlay = model_override.as_ref().map(|model| self.overlay.apply(model));

        let name = command.normalized_name();
        let Some(entry) = self.commands.get(&name) else {
            warn!(error = %PrForgeError::UnknownCommand(name.clone()), "Ignoring request");
            return Ok(false);
        };

        let (settings, args) =
            request_settings(self.store.snapshot(), patch.as_ref(), &args, model_override.as_ref())?;

        if !entry.flags.is_auto {
            if let Some(notify) = notify {
                notify();
            }
        }

        let span = info_span!("request", command = %name, target = %target);
        self.run_tool(target, entry, args, settings)
            .instrument(span)
            .await?;
        Ok(true)
    }

    async fn run_tool(
        &self,
        target: &str,
        entry: &CommandEntry,
        args: Vec<String>,
        settings: Settings,
    ) -> Result<()> {
        info!("Request handler started");

        let kind = self.handlers.kind_for(&settings);
        let handler = self
            .handlers
            .handler_for_kind(kind)
            .ok_or_else(|| anyhow!("no handler available for ai_handler '{}'", kind.as_str()))?;
        let provider = self
            .providers
            .provider_for(target)
            .with_context(|| format!("Failed to open target {target}"))?;

        let ctx = ToolContext {
            target: target.to_string(),
            handler,
            catalog: self.handlers.catalog_for(HandlerKind::CopilotSdk),
            provider,
            args,
            settings: Arc::new(settings),
            flags: entry.flags,
        };
        let mut tool = entry.factory.build(ctx).context("Failed to construct tool")?;
        tool.run().await?;
        Ok(())
    }
}

fn layer(settings: Settings, patch: Option<&Value>) -> Result<Settings> {
    match patch {
        Some(patch) => apply_merge_patch(&settings, patch).context("Invalid target settings"),
        None => Ok(settings),
    }
}

/// The settings a tool sees: target layer, then `--section.key=value`
/// arguments, then the inline model, which wins over both.
fn request_settings(
    global: Settings,
    patch: Option<&Value>,
    args: &[String],
    model_override: Option<&ModelOverride>,
) -> Result<(Settings, Vec<String>)> {
    let mut settings = layer(global, patch)?;
    let args = update_settings_from_args(&mut settings, args);
    if let Some(model) = model_override {
        apply_model_override(&mut settings, model);
    }
    inject_response_language(&mut settings);
    Ok((settings, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use prforge_core::{
        AiHandler, Completion, CompletionRequest, GenerationError, ModelCatalogSource, ModelInfo,
        TargetProvider, Tool, ToolOutput,
    };
    use prforge_handlers::copilot::{
        BackendClient, ClientConnector, ClientOptions, ClientSession, RemoteModel, SessionConfig,
    };
    use prforge_handlers::{BackendRegistry, SessionManager};
    use serde_json::json;
    use tokio::sync::Semaphore;

    use crate::registry::{ToolFactory, ToolFlags};
    use crate::target::TargetProviderFactory;

    const TARGET: &str = "https://example.com/pr/1";

    struct StaticHandler;

    #[async_trait]
    impl AiHandler for StaticHandler {
        fn name(&self) -> &str {
            "static"
        }

        async fn chat_completion(
            &self,
            _request: &CompletionRequest,
        ) -> Result<Completion, GenerationError> {
            Ok(Completion::from_text("ok"))
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl ModelCatalogSource for FailingCatalog {
        async fn models(&self, _force_refresh: bool) -> Result<Vec<ModelInfo>> {
            anyhow::bail!("Not authenticated")
        }
    }

    struct NullProvider;

    #[async_trait]
    impl TargetProvider for NullProvider {
        async fn publish_comment(&self, _body: &str) -> Result<()> {
            Ok(())
        }
        async fn remove_initial_comment(&self) -> Result<()> {
            Ok(())
        }
        async fn title(&self) -> Result<String> {
            Ok("title".into())
        }
        async fn diff(&self) -> Result<String> {
            Ok(String::new())
        }
    }

    struct NullProviders;

    impl TargetProviderFactory for NullProviders {
        fn provider_for(&self, _target: &str) -> Result<Arc<dyn TargetProvider>> {
            Ok(Arc::new(NullProvider))
        }
    }

    struct StaticPatch(Value);

    #[async_trait]
    impl TargetSettingsSource for StaticPatch {
        async fn settings_patch(&self, _target: &str) -> Result<Option<Value>> {
            Ok(Some(self.0.clone()))
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Seen {
        args: Vec<String>,
        flags: ToolFlags,
        global_model_in_init: Option<String>,
        global_model_in_run: Option<String>,
        scoped: Option<Settings>,
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        Ok,
        Fails,
        Panics,
    }

    struct RecordingTool {
        store: SettingsStore,
        seen: Arc<Mutex<Seen>>,
        outcome: Outcome,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        async fn run(&mut self) -> Result<ToolOutput> {
            self.seen.lock().unwrap().global_model_in_run = self.store.model();
            match self.outcome {
                Outcome::Ok => Ok(ToolOutput::Done(true)),
                Outcome::Fails => anyhow::bail!("publish failed"),
                Outcome::Panics => panic!("tool bug"),
            }
        }
    }

    struct Harness {
        store: SettingsStore,
        seen: Arc<Mutex<Seen>>,
        built: Arc<AtomicUsize>,
        dispatcher: Dispatcher,
    }

    fn harness(ai_handler: &str, outcome: Outcome) -> Harness {
        let mut settings = Settings::default();
        settings.config.ai_handler = Some(ai_handler.into());
        settings.config.model = Some("gpt-5.2-2025-12-11".into());
        settings.config.fallback_models = Some(vec!["o4-mini".into()]);
        let store = SettingsStore::new(settings);

        let seen = Arc::new(Mutex::new(Seen::default()));
        let built = Arc::new(AtomicUsize::new(0));
        let factory: Arc<dyn ToolFactory> = {
            let (store, seen, built) = (store.clone(), seen.clone(), built.clone());
            Arc::new(move |ctx: ToolContext| -> Result<Box<dyn Tool>> {
                built.fetch_add(1, Ordering::SeqCst);
                *seen.lock().unwrap() = Seen {
                    args: ctx.args.clone(),
                    flags: ctx.flags,
                    global_model_in_init: store.model(),
                    global_model_in_run: None,
                    scoped: Some((*ctx.settings).clone()),
                };
                Ok(Box::new(RecordingTool {
                    store: store.clone(),
                    seen: seen.clone(),
                    outcome,
                }))
            })
        };

        let mut commands = CommandTable::new();
        for name in ["review", "ask"] {
            commands.register(name, factory.clone());
        }
        commands.register_with_flags(
            "auto_review",
            factory.clone(),
            ToolFlags {
                is_auto: true,
                ..Default::default()
            },
        );

        let dispatcher = Dispatcher::new(store.clone(), static_handlers(), commands, Arc::new(NullProviders));
        Harness {
            store,
            seen,
            built,
            dispatcher,
        }
    }

    fn static_handlers() -> BackendHandlers {
        BackendHandlers::new(BackendRegistry::new())
            .with_handler(HandlerKind::LiteLlm, Arc::new(StaticHandler))
            .with_handler(HandlerKind::CopilotSdk, Arc::new(StaticHandler))
            .with_catalog(HandlerKind::CopilotSdk, Arc::new(FailingCatalog))
    }

    fn assert_restored(store: &SettingsStore) {
        assert_eq!(store.model().as_deref(), Some("gpt-5.2-2025-12-11"));
        assert_eq!(store.fallback_models(), Some(vec!["o4-mini".to_string()]));
    }

    #[tokio::test]
    async fn inline_model_applies_for_one_request() {
        let h = harness("litellm", Outcome::Ok);
        assert!(h.dispatcher.handle(TARGET, "/review gpt-5.2-codex").await);

        let seen = h.seen.lock().unwrap().clone();
        assert!(seen.args.is_empty());
        assert_eq!(seen.global_model_in_init.as_deref(), Some("gpt-5.2-codex"));
        assert_eq!(seen.global_model_in_run.as_deref(), Some("gpt-5.2-codex"));
        let scoped = seen.scoped.unwrap();
        assert_eq!(scoped.config.model.as_deref(), Some("gpt-5.2-codex"));
        assert_eq!(scoped.config.fallback_models, Some(vec![]));
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn quoted_question_is_not_a_model() {
        let h = harness("litellm", Outcome::Ok);
        assert!(h.dispatcher.handle(TARGET, r#"/ask "why is this failing?""#).await);

        let seen = h.seen.lock().unwrap().clone();
        assert_eq!(seen.args, vec!["why is this failing?"]);
        assert_eq!(seen.global_model_in_init.as_deref(), Some("gpt-5.2-2025-12-11"));
        assert_eq!(seen.global_model_in_run.as_deref(), Some("gpt-5.2-2025-12-11"));
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn catalog_failure_still_detects_model() {
        let h = harness("copilot_sdk", Outcome::Ok);
        assert!(h.dispatcher.handle(TARGET, "/review claude-4.5-sonnet").await);

        let seen = h.seen.lock().unwrap().clone();
        assert!(seen.args.is_empty());
        assert_eq!(seen.global_model_in_init.as_deref(), Some("claude-4.5-sonnet"));
        assert_eq!(seen.global_model_in_run.as_deref(), Some("claude-4.5-sonnet"));
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn unknown_command_builds_nothing() {
        let h = harness("litellm", Outcome::Ok);
        let before = h.store.snapshot();
        assert!(!h.dispatcher.handle(TARGET, "frobnicate").await);
        assert!(!h.dispatcher.handle(TARGET, "/frobnicate gpt-4o").await);
        assert_eq!(h.built.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.snapshot(), before);
    }

    #[tokio::test]
    async fn forbidden_argument_rejects_request() {
        let h = harness("litellm", Outcome::Ok);
        let handled = h
            .dispatcher
            .handle(TARGET, "/review gpt-5.2-codex --copilot.github_token=ghp_x")
            .await;
        assert!(!handled);
        assert_eq!(h.built.load(Ordering::SeqCst), 0);
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn tool_error_restores_and_reports_false() {
        let h = harness("litellm", Outcome::Fails);
        assert!(!h.dispatcher.handle(TARGET, "/review gpt-5.2-codex").await);
        assert_eq!(h.built.load(Ordering::SeqCst), 1);
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn tool_panic_restores_and_reports_false() {
        let h = harness("litellm", Outcome::Panics);
        assert!(!h.dispatcher.handle(TARGET, "/review o3").await);
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn notify_fires_except_for_auto_review() {
        let h = harness("litellm", Outcome::Ok);
        let count = AtomicUsize::new(0);
        let notify = || {
            count.fetch_add(1, Ordering::SeqCst);
        };

        assert!(h.dispatcher.handle_with_notify(TARGET, "/review", Some(&notify)).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(h.dispatcher.handle_with_notify(TARGET, "auto_review", Some(&notify)).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(h.seen.lock().unwrap().flags.is_auto);

        assert!(!h.dispatcher.handle_with_notify(TARGET, "nope", Some(&notify)).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn request_arguments_stay_request_scoped() {
        let h = harness("litellm", Outcome::Ok);
        assert!(
            h.dispatcher
                .handle(TARGET, vec!["review".to_string(), "--config.reasoning_effort=high".to_string()])
                .await
        );

        let seen = h.seen.lock().unwrap().clone();
        assert!(seen.args.is_empty());
        assert_eq!(seen.scoped.unwrap().config.reasoning_effort.as_deref(), Some("high"));
        assert!(h.store.snapshot().config.reasoning_effort.is_none());
    }

    #[tokio::test]
    async fn target_layer_reaches_tool_but_not_inline_model() {
        let h = harness("litellm", Outcome::Ok);
        let dispatcher = h.dispatcher.with_target_settings(Arc::new(StaticPatch(json!({
            "config": {"model": "o3"},
            "pr_reviewer": {"extra_instructions": "Check migrations."}
        }))));

        assert!(dispatcher.handle(TARGET, "/review gpt-4.1").await);
        let scoped = h.seen.lock().unwrap().scoped.clone().unwrap();
        assert_eq!(scoped.config.model.as_deref(), Some("gpt-4.1"));
        assert_eq!(
            scoped.pr_reviewer.extra_instructions.as_deref(),
            Some("Check migrations.")
        );
        assert!(h.store.snapshot().pr_reviewer.extra_instructions.is_none());
        assert_restored(&h.store);
    }

    #[tokio::test]
    async fn response_language_is_a_standing_effect() {
        let h = harness("litellm", Outcome::Ok);
        h.store.update(|s| s.config.response_language = Some("ja-JP".into()));

        assert!(h.dispatcher.handle(TARGET, "/ask what changed").await);
        assert!(h.dispatcher.handle(TARGET, "/ask what changed").await);

        let global = h.store.snapshot();
        let instructions = global.pr_questions.extra_instructions.unwrap();
        assert_eq!(instructions.matches("locale code: 'ja-JP'").count(), 1);
    }

    struct GatedTool {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Tool for GatedTool {
        async fn run(&mut self) -> Result<ToolOutput> {
            let _permit = self.gate.acquire().await?;
            Ok(ToolOutput::Done(true))
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Arc<dyn ToolFactory> {
        Arc::new(move |_ctx: ToolContext| -> Result<Box<dyn Tool>> {
            Ok(Box::new(GatedTool { gate: gate.clone() }))
        })
    }

    #[tokio::test]
    async fn overlapping_requests_leave_no_override_behind() {
        let h = harness("litellm", Outcome::Ok);
        let (review_gate, ask_gate) = (Arc::new(Semaphore::new(0)), Arc::new(Semaphore::new(0)));
        let mut commands = CommandTable::new();
        commands.register("review", gated(review_gate.clone()));
        commands.register("ask", gated(ask_gate.clone()));
        let dispatcher =
            Dispatcher::new(h.store.clone(), static_handlers(), commands, Arc::new(NullProviders));

        // The override request starts first and ends first; the plain
        // request runs across its whole lifetime.
        let review_done = AtomicBool::new(false);
        let review = async {
            let handled = dispatcher.handle(TARGET, "/review gpt-5.2-codex").await;
            review_done.store(true, Ordering::SeqCst);
            handled
        };
        let ask = dispatcher.handle(TARGET, "/ask what changed");
        let driver = async {
            while h.store.model().as_deref() != Some("gpt-5.2-codex") {
                tokio::task::yield_now().await;
            }
            tokio::task::yield_now().await;
            review_gate.add_permits(1);
            while !review_done.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            assert_restored(&h.store);
            ask_gate.add_permits(1);
        };

        let (reviewed, asked, ()) = tokio::join!(review, ask, driver);
        assert!(reviewed && asked);
        assert_restored(&h.store);
    }

    #[derive(Default)]
    struct SessionLog {
        configs: Mutex<Vec<SessionConfig>>,
    }

    struct RecordingConnector(Arc<SessionLog>);

    #[async_trait]
    impl ClientConnector for RecordingConnector {
        async fn connect(&self, _options: &ClientOptions) -> Result<Arc<dyn BackendClient>> {
            Ok(Arc::new(RecordingClient(self.0.clone())))
        }
    }

    struct RecordingClient(Arc<SessionLog>);

    #[async_trait]
    impl BackendClient for RecordingClient {
        async fn list_models(&self) -> Result<Vec<RemoteModel>> {
            Ok(Vec::new())
        }

        async fn create_session(&self, config: &SessionConfig) -> Result<Box<dyn ClientSession>> {
            self.0.configs.lock().unwrap().push(config.clone());
            Ok(Box::new(EchoSession))
        }
    }

    struct EchoSession;

    #[async_trait]
    impl ClientSession for EchoSession {
        async fn send_and_wait(&mut self, prompt: &str) -> Result<Option<String>> {
            Ok(Some(format!("echo: {prompt}")))
        }

        async fn destroy(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Runs one completion with the context's settings.
    struct CompletingTool(ToolContext);

    #[async_trait]
    impl Tool for CompletingTool {
        async fn run(&mut self) -> Result<ToolOutput> {
            let ctx = &self.0;
            let request = CompletionRequest {
                model: ctx.settings.config.model.clone().unwrap_or_default(),
                system: "You review code.".into(),
                user: "diff".into(),
                temperature: 0.2,
                image_url: None,
                reasoning_effort: None,
                settings: ctx.settings.clone(),
            };
            let completion = ctx.handler.chat_completion(&request).await?;
            Ok(ToolOutput::Text(completion.text))
        }
    }

    #[tokio::test]
    async fn request_arguments_reach_the_copilot_session() {
        let mut settings = Settings::default();
        settings.config.ai_handler = Some("copilot_sdk".into());
        settings.config.model = Some("gpt-4.1".into());
        let store = SettingsStore::new(settings);

        let log = Arc::new(SessionLog::default());
        let manager = Arc::new(SessionManager::new(
            store.clone(),
            Arc::new(RecordingConnector(log.clone())),
        ));
        let handlers = BackendHandlers::new(BackendRegistry::new())
            .with_handler(HandlerKind::LiteLlm, Arc::new(StaticHandler))
            .with_handler(HandlerKind::CopilotSdk, manager.clone())
            .with_catalog(HandlerKind::CopilotSdk, manager);

        let mut commands = CommandTable::new();
        commands.register(
            "review",
            Arc::new(|ctx: ToolContext| -> Result<Box<dyn Tool>> {
                Ok(Box::new(CompletingTool(ctx)))
            }),
        );
        let dispatcher = Dispatcher::new(store.clone(), handlers, commands, Arc::new(NullProviders));

        let handled = dispatcher
            .handle(
                TARGET,
                "/review --copilot.system_message_mode=replace --copilot.working_directory=/repo",
            )
            .await;
        assert!(handled);

        let configs = log.configs.lock().unwrap().clone();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].working_directory.as_deref(), Some("/repo"));
        assert_eq!(
            configs[0].system_message.as_ref().map(|m| m.mode.as_str()),
            Some("replace")
        );
        assert!(store.snapshot().copilot.working_directory.is_none());
    }
}
