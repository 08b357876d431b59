pub mod cleanup;
pub mod control;
mod executor;
pub mod job_definition;
pub mod job_registry;
pub mod job_result;
pub mod schedule;
pub mod scheduler;

use std::{future::Future, time::Duration};

use thiserror::Error;

use self::job_result::JobResult;

/// Error raised from inside a job handler. The execution wrapper records it on
/// the run and never lets it escape to the scheduler.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Failed(String),
    #[error("job timed out after {0:?}")]
    TimedOut(Duration),
    #[error("job panicked: {0}")]
    Panicked(String),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("run history error: {0}")]
    Recorder(#[from] crate::run_recorder::RecorderError),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A recurring job implemented as a type.
///
/// Closures work too, see [`job_definition::JobDefinition::new`]; this trait
/// is for jobs that carry their own dependencies.
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn schedule(&self) -> &str;

    fn execute(&self) -> impl Future<Output = Result<JobResult, JobError>> + Send;
}
