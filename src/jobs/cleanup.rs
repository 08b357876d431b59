use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use super::{job_result::JobResult, Job, JobError};
use crate::run_recorder::RunRecorder;

pub const DEFAULT_CLEANUP_SCHEDULE: &str = "0 0 * * *";

/// Deletes run history older than the retention period.
#[derive(Debug, Clone)]
pub struct CleanupJob {
    recorder: Arc<dyn RunRecorder>,
    retention_days: u32,
    schedule: String,
}

impl CleanupJob {
    pub const NAME: &'static str = "cleanup";

    pub fn new(recorder: Arc<dyn RunRecorder>, retention_days: u32) -> Self {
        Self {
            recorder,
            retention_days,
            schedule: DEFAULT_CLEANUP_SCHEDULE.to_string(),
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.schedule = schedule.into();
        self
    }
}

impl Job for CleanupJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn execute(&self) -> Result<JobResult, JobError> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.retention_days));
        let deleted = self.recorder.delete_runs_started_before(cutoff).await?;

        info!(
            "🧹 Deleted {} job runs older than {} days",
            deleted, self.retention_days
        );

        Ok(JobResult::with_data(json!({ "deleted_runs": deleted }))
            .message(format!("Deleted {deleted} old job runs")))
    }
}
