//! Admin endpoints for listing jobs, triggering them and reading run history.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::json_error::ApiError;
use crate::{
    app::App,
    jobs::control::{JobInfo, RunJobResponse},
    run_recorder::JobRun,
};

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<u64>,
    pub job: Option<String>,
}

pub async fn list_jobs(State(app): State<App>) -> Json<Vec<JobInfo>> {
    Json(app.jobs.list_jobs())
}

/// Runs a job now. A handler failure is still a 200 with `success: false`;
/// only unknown names are 404.
pub async fn run_job(
    State(app): State<App>,
    Path(name): Path<String>,
) -> Result<Json<RunJobResponse>, ApiError> {
    if !app.jobs.has_job(&name) {
        return Err(ApiError::JobNotFound(name));
    }

    Ok(Json(app.jobs.run_job(&name).await))
}

pub async fn list_job_runs(
    State(app): State<App>,
    Query(query): Query<RunsQuery>,
) -> Json<Vec<JobRun>> {
    let runs = match query.job {
        Some(job) => app.jobs.list_recent_runs_for_job(&job, query.limit).await,
        None => app.jobs.list_recent_runs(query.limit).await,
    };

    Json(runs)
}
