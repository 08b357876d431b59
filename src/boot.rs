use std::{process::ExitCode, sync::Arc};

use axum::Router;
use clap::Parser as _;
use config_rs::Config as ConfigRs;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::{
    app::App,
    cli::{Cli, Commands},
    commands::{list, migrate, run_job, serve},
    config::Config,
    environment::Environment,
    jobs::{cleanup::CleanupJob, job_registry::JobRegistry, scheduler::SchedulerError},
    run_recorder::RunRecorder,
    setup_tracing::setup_tracing_for_command,
};

/// Builds the application's job registry once its dependencies exist.
pub type JobRegistryBuilder = fn(&JobContext) -> Result<JobRegistry, SchedulerError>;

/// What a job registry builder can hand to its jobs.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub config: Config,
    pub environment: Environment,
    pub db: DatabaseConnection,
    pub recorder: Arc<dyn RunRecorder>,
}

impl JobContext {
    /// The built-in run history cleanup, using the configured retention.
    pub fn cleanup_job(&self) -> CleanupJob {
        CleanupJob::new(
            Arc::clone(&self.recorder),
            self.config.scheduler.run_retention_days,
        )
    }
}

#[derive(Debug, Error)]
pub enum BootError {
    #[error("configuration error: {0}")]
    Config(#[from] config_rs::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("job registry error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for bootstrapping the application.
pub struct BootConfig {
    /// Extra routes, nested under `/api` next to the job endpoints.
    pub app_router: fn(App) -> Router,
    pub job_registry: JobRegistryBuilder,
}

impl BootConfig {
    #[must_use]
    pub const fn new(app_router: fn(App) -> Router, job_registry: JobRegistryBuilder) -> Self {
        Self {
            app_router,
            job_registry,
        }
    }
}

pub async fn boot(config: BootConfig) -> ExitCode {
    let cli = Cli::parse();
    let environment = Environment::current();

    let app_config = match read_config(environment) {
        Ok(app_config) => app_config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration for {environment}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Set up tracing with appropriate level based on command
    setup_tracing_for_command(&cli.command, &app_config.tracing.log_level);

    debug!("Environment set to: {:?}", environment);
    trace!("Configuration loaded: {:?}", app_config);

    match handle_command(environment, app_config, cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {}", e);
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

/// Reads `config/{environment}.toml` overlaid with `APP_*` variables, e.g.
/// `APP_SCHEDULER__ENABLED=true`.
pub fn read_config(environment: Environment) -> Result<Config, config_rs::ConfigError> {
    let config_file_name = format!("config/{environment}");

    trace!("Reading configuration from: {}", config_file_name);

    ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name))
        .add_source(
            config_rs::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

pub async fn handle_command(
    environment: Environment,
    config: Config,
    cli: Cli,
    boot_config: BootConfig,
) -> Result<ExitCode, BootError> {
    match cli.command {
        Some(Commands::Migrate { action }) => migrate::handle_migrate_command(&config, action).await,
        Some(Commands::RunJob { name }) => {
            run_job::handle_run_job_command(environment, config, boot_config.job_registry, &name)
                .await
        }
        Some(Commands::List { runs, limit, .. }) => {
            list::handle_list_command(environment, config, boot_config.job_registry, runs, limit)
                .await
        }
        Some(Commands::Serve) | None => {
            serve::handle_serve_command(environment, config, boot_config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
