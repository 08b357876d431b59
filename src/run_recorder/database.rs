use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder as _, QuerySelect as _, Set,
};
use uuid::Uuid;

use super::{JobRun, RecorderError, RunHandle, RunQuery, RunRecorder, RunStatus};
use crate::database::models::job_run::{self, Entity as JobRunEntity};

/// Run history stored in the `job_run` table.
#[derive(Debug, Clone)]
pub struct DatabaseRunRecorder {
    db: DatabaseConnection,
}

impl DatabaseRunRecorder {
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Writes the terminal state, but only onto a run that is still running.
    async fn finish(
        &self,
        handle: RunHandle,
        status: RunStatus,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
        error: Option<&str>,
    ) -> Result<(), RecorderError> {
        let result = JobRunEntity::update_many()
            .col_expr(job_run::Column::Status, Expr::value(status))
            .col_expr(job_run::Column::FinishedAt, Expr::value(finished_at))
            .col_expr(job_run::Column::DurationMs, Expr::value(duration_ms))
            .col_expr(job_run::Column::Error, Expr::value(error.map(str::to_string)))
            .filter(job_run::Column::Id.eq(handle.id))
            .filter(job_run::Column::Status.eq(RunStatus::Running))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            return Ok(());
        }

        match JobRunEntity::find_by_id(handle.id).one(&self.db).await? {
            Some(_) => Err(RecorderError::AlreadyFinished(handle.id)),
            None => Err(RecorderError::RunNotFound(handle.id)),
        }
    }
}

impl From<job_run::Model> for JobRun {
    fn from(model: job_run::Model) -> Self {
        Self {
            id: model.id,
            job_name: model.job_name,
            status: model.status,
            started_at: model.started_at,
            finished_at: model.finished_at,
            duration_ms: model.duration_ms,
            error: model.error,
        }
    }
}

#[async_trait]
impl RunRecorder for DatabaseRunRecorder {
    async fn create_run(
        &self,
        job_name: &str,
        started_at: DateTime<Utc>,
    ) -> Result<RunHandle, RecorderError> {
        let run = job_run::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_name: Set(job_name.to_string()),
            status: Set(RunStatus::Running),
            started_at: Set(started_at),
            finished_at: Set(None),
            duration_ms: Set(None),
            error: Set(None),
            created_at: Set(Utc::now()),
        };

        let run = run.insert(&self.db).await?;
        Ok(RunHandle { id: run.id })
    }

    async fn complete_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
    ) -> Result<(), RecorderError> {
        self.finish(handle, RunStatus::Completed, finished_at, duration_ms, None)
            .await
    }

    async fn fail_run(
        &self,
        handle: RunHandle,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
        error: &str,
    ) -> Result<(), RecorderError> {
        self.finish(handle, RunStatus::Failed, finished_at, duration_ms, Some(error))
            .await
    }

    async fn list_runs(&self, query: RunQuery) -> Result<Vec<JobRun>, RecorderError> {
        let mut select = JobRunEntity::find();
        if let Some(job_name) = query.job_name {
            select = select.filter(job_run::Column::JobName.eq(job_name));
        }

        let runs = select
            .order_by_desc(job_run::Column::StartedAt)
            .limit(query.limit)
            .all(&self.db)
            .await?;

        Ok(runs.into_iter().map(JobRun::from).collect())
    }

    async fn delete_runs_started_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RecorderError> {
        let result = JobRunEntity::delete_many()
            .filter(job_run::Column::StartedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
