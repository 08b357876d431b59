use std::{
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;
use thiserror::Error;
use tokio::{
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, error, info, warn};

use super::{
    executor,
    job_definition::{JobDefinition, OverlapPolicy},
    job_registry::JobRegistry,
    job_result::RunOutcome,
    schedule::{Schedule, ScheduleError},
};
use crate::run_recorder::RunRecorder;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job '{name}' has an invalid schedule: {source}")]
    InvalidSchedule {
        name: String,
        #[source]
        source: ScheduleError,
    },
    #[error("job '{0}' is already registered")]
    DuplicateJob(String),
    #[error("job '{0}' not found")]
    JobNotFound(String),
}

/// Live view of one armed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub name: String,
    pub schedule: String,
    /// Whether the trigger task is still alive.
    pub active: bool,
    /// Whether at least one execution is in flight.
    pub running: bool,
    pub next_run: Option<DateTime<Utc>>,
}

/// Keeps one armed job per name and fires each one from its own tokio task.
///
/// Cloning is cheap and every clone drives the same set of jobs. Jobs are
/// armed with [`Scheduler::initialize`] or [`Scheduler::register`] and must be
/// armed from inside a tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: DashMap<String, RegisteredJob>,
    registry: JobRegistry,
    recorder: Arc<dyn RunRecorder>,
    timezone: Tz,
    initialized: AtomicBool,
}

struct RegisteredJob {
    armed: Arc<ArmedJob>,
    trigger: JoinHandle<()>,
}

/// State shared between a registered job and its trigger task.
struct ArmedJob {
    definition: JobDefinition,
    schedule: Schedule,
    in_flight: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(registry: JobRegistry, recorder: Arc<dyn RunRecorder>, timezone: Tz) -> Self {
        Self {
            inner: Arc::new(Inner {
                jobs: DashMap::new(),
                registry,
                recorder,
                timezone,
                initialized: AtomicBool::new(false),
            }),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.inner.timezone
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Arms every enabled job. Jobs with an invalid schedule are logged and
    /// skipped. A second call only warns.
    pub fn initialize(&self, jobs: &[JobDefinition]) {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            warn!("📅 Scheduler is already initialized, ignoring");
            return;
        }

        let mut armed = 0;
        for job in jobs {
            if !job.enabled {
                info!("📅 Job '{}' is disabled, not scheduling it", job.name);
                continue;
            }

            match self.try_register(job.clone()) {
                Ok(()) => armed += 1,
                Err(e) => error!("❌ Skipping job '{}': {}", job.name, e),
            }
        }

        info!(
            "📅 Scheduler started with {} of {} jobs in {}",
            armed,
            jobs.len(),
            self.inner.timezone
        );
    }

    /// Arms one job, refusing names that are already armed.
    pub fn try_register(&self, definition: JobDefinition) -> Result<(), SchedulerError> {
        let schedule = Schedule::parse(&definition.schedule).map_err(|source| {
            SchedulerError::InvalidSchedule {
                name: definition.name.clone(),
                source,
            }
        })?;

        match self.inner.jobs.entry(definition.name.clone()) {
            Entry::Occupied(_) => Err(SchedulerError::DuplicateJob(definition.name)),
            Entry::Vacant(slot) => {
                debug!(
                    "📅 Arming job '{}' with schedule '{}'",
                    definition.name,
                    schedule.expression()
                );

                let armed = Arc::new(ArmedJob {
                    definition,
                    schedule,
                    in_flight: Arc::new(AtomicUsize::new(0)),
                });
                let trigger = tokio::spawn(run_trigger(
                    Arc::clone(&armed),
                    Arc::clone(&self.inner.recorder),
                    self.inner.timezone,
                ));

                slot.insert(RegisteredJob { armed, trigger });
                Ok(())
            }
        }
    }

    /// Arms one job at runtime. Returns false, leaving the armed job as it
    /// was, when the name is taken or the schedule is invalid.
    pub fn register(&self, definition: JobDefinition) -> bool {
        let name = definition.name.clone();
        match self.try_register(definition) {
            Ok(()) => true,
            Err(e) => {
                warn!("📅 Not registering job '{}': {}", name, e);
                false
            }
        }
    }

    /// Disarms a job. Executions already in flight run to completion.
    pub fn stop(&self, name: &str) -> bool {
        let Some((_, job)) = self.inner.jobs.remove(name) else {
            return false;
        };

        job.trigger.abort();
        info!("🛑 Stopped job '{}'", name);
        true
    }

    /// Disarms every job.
    pub fn shutdown(&self) {
        let names: Vec<String> = self
            .inner
            .jobs
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        for name in names {
            self.stop(&name);
        }
        debug!("📅 Scheduler shut down");
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.inner.jobs.contains_key(name)
    }

    /// Snapshot of the armed jobs, sorted by name.
    pub fn get_jobs(&self) -> Vec<ScheduledJob> {
        let now = Utc::now();
        let mut jobs: Vec<ScheduledJob> = self
            .inner
            .jobs
            .iter()
            .map(|entry| {
                let job = entry.value();
                ScheduledJob {
                    name: entry.key().clone(),
                    schedule: job.armed.definition.schedule.clone(),
                    active: !job.trigger.is_finished(),
                    running: job.armed.in_flight.load(Ordering::SeqCst) > 0,
                    next_run: job.armed.schedule.next_after(now, self.inner.timezone),
                }
            })
            .collect();

        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs
    }

    /// Runs a job once, right now, and waits for it.
    ///
    /// Armed jobs run from the live map; known but unarmed jobs (disabled, or
    /// scheduling turned off) run straight from the registry. The overlap
    /// policy does not apply here.
    pub async fn run_now(&self, name: &str) -> Result<RunOutcome, SchedulerError> {
        let armed = self
            .inner
            .jobs
            .get(name)
            .map(|entry| Arc::clone(&entry.armed));

        if let Some(armed) = armed {
            let _guard = InFlight::enter(&armed.in_flight);
            return Ok(executor::execute(&armed.definition, self.inner.recorder.as_ref()).await);
        }

        let definition = self
            .inner
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;

        debug!("📅 Job '{}' is not armed, running it from the registry", name);
        Ok(executor::execute(&definition, self.inner.recorder.as_ref()).await)
    }
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("armed_jobs", &self.inner.jobs.len())
            .field("timezone", &self.inner.timezone)
            .finish_non_exhaustive()
    }
}

/// Counts an execution as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Trigger loop of one armed job. Never awaits the handler itself, so a slow
/// or failing run cannot delay the next fire.
async fn run_trigger(armed: Arc<ArmedJob>, recorder: Arc<dyn RunRecorder>, timezone: Tz) {
    let name = armed.definition.name.as_str();
    let mut last_fire: Option<DateTime<Utc>> = None;

    loop {
        let now = Utc::now();
        let from = last_fire.map_or(now, |fired| fired.max(now));

        let Some(next_execution) = armed.schedule.next_after(from, timezone) else {
            warn!("📅 Job '{}' has no upcoming run, disarming its trigger", name);
            return;
        };

        debug!(
            "🔄 Job '{}' next execution at: {}",
            name,
            next_execution.format("%Y-%m-%d %H:%M:%S UTC")
        );

        wait_until_execution_time(next_execution, from).await;
        last_fire = Some(next_execution);

        if armed.definition.overlap == OverlapPolicy::Skip
            && armed.in_flight.load(Ordering::SeqCst) > 0
        {
            info!("⏭️ Job '{}' is still running, skipping this run", name);
            continue;
        }

        let guard = InFlight::enter(&armed.in_flight);
        let armed = Arc::clone(&armed);
        let recorder = Arc::clone(&recorder);
        tokio::spawn(async move {
            let _guard = guard;
            executor::execute(&armed.definition, recorder.as_ref()).await;
        });
    }
}

/// Wait until the specified execution time
async fn wait_until_execution_time(next_execution: DateTime<Utc>, now: DateTime<Utc>) {
    let sleep_duration = (next_execution - now).to_std().unwrap_or_default();
    if sleep_duration > Duration::ZERO {
        sleep_until(Instant::now() + sleep_duration).await;
    }
}
