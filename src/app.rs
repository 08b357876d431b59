use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    boot::{JobContext, JobRegistryBuilder},
    config::Config,
    environment::Environment,
    jobs::{control::JobsControl, scheduler::Scheduler, scheduler::SchedulerError},
    run_recorder::{DatabaseRunRecorder, RunRecorder},
};

#[derive(Clone, Debug)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub db: DatabaseConnection,
    pub jobs: JobsControl,
}

impl App {
    /// Wires the job registry, run history and scheduler together. Nothing is
    /// armed until `jobs.initialize()` is called.
    pub fn new(
        config: Config,
        environment: Environment,
        db: DatabaseConnection,
        job_registry: JobRegistryBuilder,
    ) -> Result<Self, SchedulerError> {
        let recorder: Arc<dyn RunRecorder> = Arc::new(DatabaseRunRecorder::new(db.clone()));
        Self::with_recorder(config, environment, db, recorder, job_registry)
    }

    pub fn with_recorder(
        config: Config,
        environment: Environment,
        db: DatabaseConnection,
        recorder: Arc<dyn RunRecorder>,
        job_registry: JobRegistryBuilder,
    ) -> Result<Self, SchedulerError> {
        let context = JobContext {
            config: config.clone(),
            environment,
            db: db.clone(),
            recorder: Arc::clone(&recorder),
        };
        let registry = job_registry(&context)?;

        let scheduler = Scheduler::new(registry, Arc::clone(&recorder), config.scheduler.timezone);
        let jobs = JobsControl::new(scheduler, recorder, config.scheduler.is_enabled(environment));

        Ok(Self {
            config,
            environment,
            db,
            jobs,
        })
    }
}

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("Database connection error")]
    DatabaseError(#[from] sea_orm::DbErr),
}

impl IntoResponse for ReadinessError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}
