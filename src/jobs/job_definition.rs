use std::{
    fmt::{self, Debug, Formatter},
    future::Future,
    pin::Pin,
    sync::Arc,
    time::Duration,
};

use super::{job_result::JobResult, Job, JobError};

/// Type alias for the boxed future a handler returns
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type alias for a job handler to reduce type complexity
pub type JobHandler =
    Arc<dyn Fn() -> BoxFuture<'static, Result<JobResult, JobError>> + Send + Sync>;

/// What a scheduled fire does when the previous run of the same job has not
/// finished yet. Manual runs ignore this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Start another run alongside the one in flight.
    #[default]
    Allow,
    /// Skip this fire and wait for the next one.
    Skip,
}

/// A named job, its schedule and its handler.
#[derive(Clone)]
pub struct JobDefinition {
    pub name: String,
    pub schedule: String,
    pub handler: JobHandler,
    pub enabled: bool,
    pub timeout: Option<Duration>,
    pub overlap: OverlapPolicy,
}

impl JobDefinition {
    pub fn new<F, Fut>(name: impl Into<String>, schedule: impl Into<String>, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobResult, JobError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            schedule: schedule.into(),
            handler: Arc::new(move || -> BoxFuture<'static, Result<JobResult, JobError>> {
                Box::pin(handler())
            }),
            enabled: true,
            timeout: None,
            overlap: OverlapPolicy::Allow,
        }
    }

    pub fn from_job<J: Job>(job: J) -> Self {
        let name = job.name().to_string();
        let schedule = job.schedule().to_string();
        let job = Arc::new(job);

        Self::new(name, schedule, move || {
            let job = Arc::clone(&job);
            async move { job.execute().await }
        })
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub(crate) fn invoke(&self) -> BoxFuture<'static, Result<JobResult, JobError>> {
        (self.handler)()
    }
}

impl Debug for JobDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDefinition")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .field("overlap", &self.overlap)
            .finish_non_exhaustive()
    }
}
