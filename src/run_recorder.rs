//! Persistence of job run history.
//!
//! The scheduler only talks to storage through [`RunRecorder`]. Production
//! uses [`DatabaseRunRecorder`]; tests and tools that must not touch a
//! database use [`MemoryRunRecorder`].

mod database;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use crate::database::models::run_status::RunStatus;
pub use database::DatabaseRunRecorder;
pub use memory::MemoryRunRecorder;

pub const DEFAULT_RUN_LIMIT: u64 = 50;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("job run {0} does not exist")]
    RunNotFound(Uuid),
    #[error("job run {0} has already finished")]
    AlreadyFinished(Uuid),
    #[error("run storage is unavailable")]
    Unavailable,
}

/// Handle to a run created by [`RunRecorder::create_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHandle {
    pub id: Uuid,
}

/// One recorded execution attempt of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRun {
    pub id: Uuid,
    pub job_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub error: Option<String>,
}

/// Filter for [`RunRecorder::list_runs`]. Results are always ordered by
/// `started_at`, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    pub job_name: Option<String>,
    pub limit: u64,
}

impl Default for RunQuery {
    fn default() -> Self {
        Self {
            job_name: None,
            limit: DEFAULT_RUN_LIMIT,
        }
    }
}

impl RunQuery {
    #[must_use]
    pub fn recent(limit: u64) -> Self {
        Self {
            job_name: None,
            limit,
        }
    }

    #[must_use]
    pub fn for_job(job_name: impl Into<String>, limit: u64) -> Self {
        Self {
            job_name: Some(job_name.into()),
            limit,
        }
    }
}

#[async_trait]
pub trait RunRecorder: Send + Sync + Debug {
    /// Records the start of a run with status `running`.
    async fn create_run(
        &self,
        job_name: &str,
        started_at: DateTime<Utc>,
    ) -> Result<RunHandle, RecorderError>;

    /// Moves a running run to `completed`.
    async fn complete_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), RecorderError>;

    /// Moves a running run to `failed` with the error message.
    async fn fail_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
        error: &str,
    ) -> Result<(), RecorderError>;

    async fn list_runs(&self, query: RunQuery) -> Result<Vec<JobRun>, RecorderError>;

    /// Deletes runs started before `cutoff`, returning how many went away.
    async fn delete_runs_started_before(&self, cutoff: DateTime<Utc>)
        -> Result<u64, RecorderError>;
}
