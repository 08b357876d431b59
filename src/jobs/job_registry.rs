use super::{job_definition::JobDefinition, scheduler::SchedulerError, Job};

/// The static list of jobs an application knows about.
///
/// Built once at startup and handed to the scheduler. Names are unique;
/// adding a second job under an existing name is an error rather than an
/// overwrite.
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<JobDefinition>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, definition: JobDefinition) -> Result<&mut Self, SchedulerError> {
        if self.get(&definition.name).is_some() {
            return Err(SchedulerError::DuplicateJob(definition.name));
        }

        self.jobs.push(definition);
        Ok(self)
    }

    pub fn register_job<J: Job>(&mut self, job: J) -> Result<&mut Self, SchedulerError> {
        self.add(JobDefinition::from_job(job))
    }

    pub fn get(&self, name: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[JobDefinition] {
        &self.jobs
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.jobs.iter().map(|job| job.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
