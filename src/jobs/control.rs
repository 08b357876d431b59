//! Operations the outer application (CLI, admin API) uses to drive jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use super::{
    job_result::JobResult,
    schedule,
    scheduler::{ScheduledJob, Scheduler},
};
use crate::run_recorder::{JobRun, RunQuery, RunRecorder, DEFAULT_RUN_LIMIT};

pub const MAX_RUN_LIMIT: u64 = 500;

/// A job as shown to operators: registry metadata joined with live status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub name: String,
    pub schedule: String,
    pub enabled: bool,
    /// Whether a live trigger is armed for this job.
    pub active: bool,
    pub running: bool,
    pub valid_schedule: bool,
    pub next_run: Option<DateTime<Utc>>,
}

/// Result of a manual run. Unknown jobs and failing handlers both come back
/// with `success: false` and an error message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJobResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

impl RunJobResponse {
    pub(crate) fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            run_id: None,
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobsControl {
    scheduler: Scheduler,
    recorder: Arc<dyn RunRecorder>,
    enabled: bool,
}

impl JobsControl {
    pub fn new(scheduler: Scheduler, recorder: Arc<dyn RunRecorder>, enabled: bool) -> Self {
        Self {
            scheduler,
            recorder,
            enabled,
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Arms every enabled registry job, unless scheduling is turned off for
    /// this environment. Manual runs work either way.
    pub fn initialize(&self) {
        if !self.enabled {
            info!("⏸️ Scheduled jobs are disabled, set scheduler.enabled to turn them on");
            return;
        }

        self.scheduler
            .initialize(self.scheduler.registry().definitions());
    }

    /// Whether `name` is registered or armed, i.e. whether `run_job` can run it.
    pub fn has_job(&self, name: &str) -> bool {
        self.scheduler.registry().get(name).is_some() || self.scheduler.is_armed(name)
    }

    pub fn list_jobs(&self) -> Vec<JobInfo> {
        let now = Utc::now();
        let timezone = self.scheduler.timezone();
        let mut live = self.scheduler.get_jobs();

        let mut jobs: Vec<JobInfo> = self
            .scheduler
            .registry()
            .definitions()
            .iter()
            .map(|definition| {
                let next_run = schedule::next_run(&definition.schedule, now, timezone);
                let status = live
                    .iter()
                    .position(|job| job.name == definition.name)
                    .map(|index| live.swap_remove(index));

                JobInfo {
                    name: definition.name.clone(),
                    schedule: definition.schedule.clone(),
                    enabled: definition.enabled,
                    active: status.as_ref().is_some_and(|job| job.active),
                    running: status.as_ref().is_some_and(|job| job.running),
                    valid_schedule: schedule::validate(&definition.schedule),
                    next_run: next_run.ok(),
                }
            })
            .collect();

        // Jobs registered at runtime are not in the registry.
        live.sort_by(|a, b| a.name.cmp(&b.name));
        jobs.extend(live.into_iter().map(JobInfo::from));
        jobs
    }

    pub async fn run_job(&self, name: &str) -> RunJobResponse {
        let outcome = match self.scheduler.run_now(name).await {
            Ok(outcome) => outcome,
            Err(e) => return RunJobResponse::failure(e.to_string()),
        };

        let run_id = outcome.run_id;
        let duration_ms = Some(outcome.duration_ms());
        match outcome.result {
            Ok(result) => RunJobResponse {
                success: true,
                result: Some(result),
                error: None,
                run_id,
                duration_ms,
            },
            Err(e) => RunJobResponse {
                run_id,
                duration_ms,
                ..RunJobResponse::failure(e.to_string())
            },
        }
    }

    pub fn stop_job(&self, name: &str) -> bool {
        self.scheduler.stop(name)
    }

    /// Most recently started runs first. `None` means 50; anything above 500
    /// is capped. Storage failures yield an empty list.
    pub async fn list_recent_runs(&self, limit: Option<u64>) -> Vec<JobRun> {
        self.read_runs(RunQuery::recent(capped(limit))).await
    }

    pub async fn list_recent_runs_for_job(&self, name: &str, limit: Option<u64>) -> Vec<JobRun> {
        self.read_runs(RunQuery::for_job(name, capped(limit))).await
    }

    async fn read_runs(&self, query: RunQuery) -> Vec<JobRun> {
        self.recorder.list_runs(query).await.unwrap_or_else(|e| {
            error!("📝 Could not read job runs: {}", e);
            Vec::new()
        })
    }
}

fn capped(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_RUN_LIMIT).min(MAX_RUN_LIMIT)
}

impl From<ScheduledJob> for JobInfo {
    fn from(job: ScheduledJob) -> Self {
        Self {
            name: job.name,
            schedule: job.schedule,
            enabled: true,
            active: job.active,
            running: job.running,
            valid_schedule: true,
            next_run: job.next_run,
        }
    }
}
