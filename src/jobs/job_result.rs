use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::jobs::JobError;

/// Value a job handler hands back when it returns normally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Self::default()
        }
    }

    /// A handled failure: the handler returned normally but reports that its
    /// work did not succeed.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// What happened to one execution attempt, as seen by the caller of the
/// execution wrapper.
#[derive(Debug)]
pub struct RunOutcome {
    /// Id of the persisted run record, absent when recording failed.
    pub run_id: Option<Uuid>,
    pub duration: Duration,
    pub result: Result<JobResult, JobError>,
}

impl RunOutcome {
    pub const fn is_completed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_message(&self) -> Option<String> {
        self.result.as_ref().err().map(ToString::to_string)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn duration_ms(&self) -> i64 {
        self.duration.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_result_serialization_skips_empty_fields() {
        let value = serde_json::to_value(JobResult::with_data(serde_json::json!({ "n": 5 })))
            .expect("serializable");
        assert_eq!(value, serde_json::json!({ "success": true, "data": { "n": 5 } }));
    }

    #[test]
    fn test_outcome_status() {
        let completed = RunOutcome {
            run_id: None,
            duration: Duration::from_millis(12),
            result: Ok(JobResult::failure("handled")),
        };
        assert!(completed.is_completed());
        assert_eq!(completed.duration_ms(), 12);
        assert!(completed.error_message().is_none());

        let failed = RunOutcome {
            run_id: None,
            duration: Duration::ZERO,
            result: Err(JobError::Failed("boom".to_string())),
        };
        assert!(!failed.is_completed());
        assert_eq!(failed.error_message().as_deref(), Some("boom"));
    }
}
