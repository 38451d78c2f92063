mod local_target;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use prforge_commands::Dispatcher;
use prforge_config::defaults::{duration_from_secs, DEFAULT_MODEL_LOOKUP_TIMEOUT_SECS};
use prforge_config::{config_dir, config_file_path, load_and_prepare, Settings, SettingsStore};
use prforge_handlers::{
    BackendHandlers, BackendRegistry, HandlerKind, HttpConnector, LiteLlmHandler, SessionManager,
};
use prforge_logging::{init_logger, LogOptions};

use local_target::{stdout_sink, LocalTargetFactory, RepoSettingsFile};

#[derive(Parser)]
#[command(name = "prforge")]
#[command(about = "Run AI review commands against a pull request")]
#[command(version)]
struct Cli {
    /// Pull-request URL the request is about
    #[arg(long)]
    target: String,

    /// Unified diff of the pull request
    #[arg(long)]
    diff_file: Option<PathBuf>,

    /// Settings file (defaults to ~/.prforge/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repository-level settings layered over the global ones
    #[arg(long)]
    repo_config: Option<PathBuf>,

    /// Pull-request title
    #[arg(long)]
    title: Option<String>,

    /// The command and its arguments, e.g. `/review --config.model=o3`
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    request: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let settings = load_and_prepare(&config_path).await?;
    init_logger(&log_options(&settings));
    info!(path = %config_path.display(), "prforge starting");

    let lookup_timeout = settings
        .copilot
        .model_lookup_timeout
        .unwrap_or(DEFAULT_MODEL_LOOKUP_TIMEOUT_SECS);
    let store = SettingsStore::new(settings);
    let dispatcher = build_dispatcher(&cli, store, lookup_timeout);

    if dispatcher.handle(&cli.target, cli.request.clone()).await {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(url = %cli.target, "Request was not handled");
        Ok(ExitCode::FAILURE)
    }
}

fn log_options(settings: &Settings) -> LogOptions {
    let defaults = LogOptions::default();
    LogOptions {
        level: settings.logging.level.clone().unwrap_or(defaults.level),
        json: settings.logging.json.unwrap_or(defaults.json),
        file_dir: settings.logging.file_dir.as_ref().map(PathBuf::from),
    }
}

fn build_dispatcher(cli: &Cli, store: SettingsStore, lookup_timeout_secs: f64) -> Dispatcher {
    let copilot = Arc::new(SessionManager::new(
        store.clone(),
        Arc::new(HttpConnector::new()),
    ));
    let handlers = BackendHandlers::new(BackendRegistry::new())
        .with_handler(HandlerKind::LiteLlm, Arc::new(LiteLlmHandler::new()))
        .with_handler(HandlerKind::CopilotSdk, copilot.clone())
        .with_catalog(HandlerKind::CopilotSdk, copilot);

    let providers = Arc::new(LocalTargetFactory {
        title: cli.title.clone(),
        diff_file: cli.diff_file.clone(),
        sink: stdout_sink(),
    });

    let mut dispatcher = Dispatcher::new(store, handlers, prforge_tools::default_command_table(), providers)
        .with_model_lookup_timeout(duration_from_secs(lookup_timeout_secs));
    if let Some(path) = &cli.repo_config {
        dispatcher = dispatcher.with_target_settings(Arc::new(RepoSettingsFile { path: path.clone() }));
    }
    dispatcher
}
