use std::{any::Any, panic::AssertUnwindSafe};

use chrono::Utc;
use futures_util::FutureExt as _;
use tokio::time::{timeout, Instant};
use tracing::{error, info, warn};

use super::{job_definition::JobDefinition, job_result::RunOutcome, JobError};
use crate::run_recorder::{RunHandle, RunRecorder};

/// Runs one attempt of a job and records it.
///
/// Handler errors, panics and timeouts all end up in the returned outcome and
/// on the run record. Recorder failures are logged: a failed `create_run`
/// still runs the handler, failed updates leave the outcome untouched.
pub(crate) async fn execute(definition: &JobDefinition, recorder: &dyn RunRecorder) -> RunOutcome {
    let name = definition.name.as_str();
    let started_at = Utc::now();

    let handle = match recorder.create_run(name, started_at).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("📝 Could not record start of job '{}': {}", name, e);
            None
        }
    };

    info!("▶️ Running job '{}'", name);
    let start_time = Instant::now();

    let handler = AssertUnwindSafe(async { definition.invoke().await }).catch_unwind();
    let result = match definition.timeout {
        Some(limit) => timeout(limit, handler)
            .await
            .unwrap_or(Ok(Err(JobError::TimedOut(limit)))),
        None => handler.await,
    };
    let result = result.unwrap_or_else(|payload| Err(JobError::Panicked(panic_message(&*payload))));

    let outcome = RunOutcome {
        run_id: handle.map(|handle| handle.id),
        duration: start_time.elapsed(),
        result,
    };

    match &outcome.result {
        Ok(_) => info!("✅ Job '{}' completed in {:?}", name, outcome.duration),
        Err(e) => warn!("❌ Job '{}' failed after {:?}: {}", name, outcome.duration, e),
    }

    if let Some(handle) = handle {
        record_finish(recorder, name, handle, &outcome).await;
    }

    outcome
}

async fn record_finish(
    recorder: &dyn RunRecorder,
    name: &str,
    handle: RunHandle,
    outcome: &RunOutcome,
) {
    let finished_at = Utc::now();
    let recorded = match &outcome.result {
        Ok(_) => {
            recorder
                .complete_run(handle, finished_at, outcome.duration_ms())
                .await
        }
        Err(e) => {
            recorder
                .fail_run(handle, finished_at, outcome.duration_ms(), &e.to_string())
                .await
        }
    };

    if let Err(e) = recorded {
        error!("📝 Could not record end of job '{}' (run {}): {}", name, handle.id, e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        jobs::job_result::JobResult,
        run_recorder::{MemoryRunRecorder, RunStatus},
    };

    #[tokio::test]
    async fn test_successful_run_is_completed() {
        let recorder = MemoryRunRecorder::new();
        let job = JobDefinition::new("report", "* * * * *", || async {
            Ok(JobResult::with_data(serde_json::json!({ "n": 5 })))
        });

        let outcome = execute(&job, &recorder).await;

        assert!(outcome.is_completed());
        let runs = recorder.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(Some(runs[0].id), outcome.run_id);
        assert_eq!(runs[0].status, RunStatus::Completed);
        assert!(runs[0].finished_at.is_some());
        assert!(runs[0].duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_handler_error_is_recorded_as_failure() {
        let recorder = MemoryRunRecorder::new();
        let job = JobDefinition::new("sync", "* * * * *", || async {
            Err(JobError::failed("upstream unavailable"))
        });

        let outcome = execute(&job, &recorder).await;

        assert_eq!(outcome.error_message().as_deref(), Some("upstream unavailable"));
        let run = &recorder.runs()[0];
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("upstream unavailable"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let recorder = MemoryRunRecorder::new();
        async fn explode() -> Result<JobResult, JobError> {
            panic!("kaboom")
        }
        let job = JobDefinition::new("explode", "* * * * *", explode);

        let outcome = execute(&job, &recorder).await;

        assert!(matches!(&outcome.result, Err(JobError::Panicked(msg)) if msg == "kaboom"));
        assert_eq!(recorder.runs()[0].status, RunStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_the_run() {
        let recorder = MemoryRunRecorder::new();
        let job = JobDefinition::new("slow", "* * * * *", || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(JobResult::ok())
        })
        .timeout(Duration::from_secs(5));

        let outcome = execute(&job, &recorder).await;

        assert!(matches!(outcome.result, Err(JobError::TimedOut(limit)) if limit == Duration::from_secs(5)));
        assert!(outcome.duration >= Duration::from_secs(5));
        assert_eq!(recorder.runs()[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_handler_runs_when_recorder_is_down() {
        let recorder = MemoryRunRecorder::new();
        recorder.set_unavailable(true);
        let job = JobDefinition::new("ping", "* * * * *", || async { Ok(JobResult::ok()) });

        let outcome = execute(&job, &recorder).await;

        assert!(outcome.is_completed());
        assert!(outcome.run_id.is_none());
        recorder.set_unavailable(false);
        assert!(recorder.runs().is_empty());
    }

    #[tokio::test]
    async fn test_completion_is_kept_when_recorder_fails_at_finish() {
        let recorder = MemoryRunRecorder::new();
        let job = JobDefinition::new("report", "* * * * *", {
            let recorder = recorder.clone();
            move || {
                recorder.set_unavailable(true);
                async { Ok(JobResult::ok()) }
            }
        });

        let outcome = execute(&job, &recorder).await;

        assert!(outcome.is_completed());
        assert!(outcome.run_id.is_some());
        recorder.set_unavailable(false);
        let runs = recorder.runs();
        assert_eq!(Some(runs[0].id), outcome.run_id);
        assert_eq!(runs[0].status, RunStatus::Running);
        assert!(runs[0].finished_at.is_none());
    }

    #[tokio::test]
    async fn test_handler_error_is_kept_when_recorder_fails_at_finish() {
        let recorder = MemoryRunRecorder::new();
        let job = JobDefinition::new("sync", "* * * * *", {
            let recorder = recorder.clone();
            move || {
                recorder.set_unavailable(true);
                async { Err(JobError::failed("upstream unavailable")) }
            }
        });

        let outcome = execute(&job, &recorder).await;

        assert_eq!(outcome.error_message().as_deref(), Some("upstream unavailable"));
        assert!(outcome.run_id.is_some());
        recorder.set_unavailable(false);
        assert_eq!(recorder.runs()[0].status, RunStatus::Running);
    }
}
