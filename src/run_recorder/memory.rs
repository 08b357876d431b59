use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{JobRun, RecorderError, RunHandle, RunQuery, RunRecorder, RunStatus};

/// Run history kept in process memory.
///
/// Clones share the same runs, so a test can hand one clone to the scheduler
/// and inspect the other. [`MemoryRunRecorder::set_unavailable`] makes every
/// call fail, the way an unreachable database would.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunRecorder {
    runs: Arc<Mutex<Vec<JobRun>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryRunRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every run in insertion order.
    pub fn runs(&self) -> Vec<JobRun> {
        self.lock().clone()
    }

    pub fn runs_for(&self, job_name: &str) -> Vec<JobRun> {
        self.lock()
            .iter()
            .filter(|run| run.job_name == job_name)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JobRun>> {
        // A panic while holding the lock cannot leave a half-written run.
        self.runs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), RecorderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(RecorderError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn finish(
        &self,
        handle: RunHandle,
        status: RunStatus,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
        error: Option<&str>,
    ) -> Result<(), RecorderError> {
        self.check_available()?;

        let mut runs = self.lock();
        let run = runs
            .iter_mut()
            .find(|run| run.id == handle.id)
            .ok_or(RecorderError::RunNotFound(handle.id))?;

        if run.status.is_terminal() {
            return Err(RecorderError::AlreadyFinished(handle.id));
        }

        run.status = status;
        run.finished_at = Some(finished_at);
        run.duration_ms = Some(duration_ms);
        run.error = error.map(str::to_string);
        Ok(())
    }
}

#[async_trait]
impl RunRecorder for MemoryRunRecorder {
    async fn create_run(
        &self,
        job_name: &str,
        started_at: DateTime<Utc>,
    ) -> Result<RunHandle, RecorderError> {
        self.check_available()?;

        let id = Uuid::new_v4();
        self.lock().push(JobRun {
            id,
            job_name: job_name.to_string(),
            status: RunStatus::Running,
            started_at,
            finished_at: None,
            duration_ms: None,
            error: None,
        });

        Ok(RunHandle { id })
    }

    async fn complete_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), RecorderError> {
        self.finish(handle, RunStatus::Completed, finished_at, duration_ms, None)
    }

    async fn fail_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
        error: &str,
    ) -> Result<(), RecorderError> {
        self.finish(handle, RunStatus::Failed, finished_at, duration_ms, Some(error))
    }

    async fn list_runs(&self, query: RunQuery) -> Result<Vec<JobRun>, RecorderError> {
        self.check_available()?;

        let mut runs: Vec<JobRun> = self
            .lock()
            .iter()
            .filter(|run| query.job_name.as_deref().is_none_or(|name| run.job_name == name))
            .cloned()
            .collect();

        // Stable sort keeps later inserts first among equal start times.
        runs.reverse();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));
        Ok(runs)
    }

    async fn delete_runs_started_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RecorderError> {
        self.check_available()?;

        let mut runs = self.lock();
        let before = runs.len();
        runs.retain(|run| run.started_at >= cutoff);
        Ok((before - runs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn test_finish_only_applies_to_running_runs() {
        let recorder = MemoryRunRecorder::new();
        let handle = recorder.create_run("ping", Utc::now()).await.unwrap();

        recorder.complete_run(handle, Utc::now(), 3).await.unwrap();
        let err = recorder.fail_run(handle, Utc::now(), 4, "late").await.unwrap_err();
        assert!(matches!(err, RecorderError::AlreadyFinished(_)));

        let run = &recorder.runs()[0];
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.duration_ms, Some(3));
        assert!(run.error.is_none());
    }

    #[tokio::test]
    async fn test_list_runs_orders_newest_first() {
        let recorder = MemoryRunRecorder::new();
        let base = Utc::now();
        recorder.create_run("a", base).await.unwrap();
        recorder.create_run("b", base + Duration::seconds(2)).await.unwrap();
        recorder.create_run("a", base + Duration::seconds(1)).await.unwrap();

        let runs = recorder.list_runs(RunQuery::recent(2)).await.unwrap();
        let names: Vec<_> = runs.iter().map(|run| run.job_name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(runs[1].started_at, base + Duration::seconds(1));

        let runs = recorder.list_runs(RunQuery::for_job("a", 50)).await.unwrap();
        assert_eq!(runs.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_recorder_fails_every_call() {
        let recorder = MemoryRunRecorder::new();
        recorder.set_unavailable(true);

        assert!(matches!(
            recorder.create_run("ping", Utc::now()).await,
            Err(RecorderError::Unavailable)
        ));
        assert!(recorder.list_runs(RunQuery::default()).await.is_err());

        recorder.set_unavailable(false);
        assert!(recorder.create_run("ping", Utc::now()).await.is_ok());
    }
}
