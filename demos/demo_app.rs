use std::{process::ExitCode, time::Duration};

use axum::{routing::get, Json, Router};
use cronwork::{
    app::App,
    boot::{boot, BootConfig, JobContext},
    jobs::{
        job_definition::{JobDefinition, OverlapPolicy},
        job_registry::JobRegistry,
        job_result::JobResult,
        scheduler::SchedulerError,
        Job, JobError,
    },
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde_json::json;
use tracing::info;

/// Pretend report that checks the database is reachable.
struct DatabaseReportJob {
    db: DatabaseConnection,
}

impl Job for DatabaseReportJob {
    fn name(&self) -> &str {
        "database-report"
    }

    fn schedule(&self) -> &str {
        "every 15 minutes"
    }

    async fn execute(&self) -> Result<JobResult, JobError> {
        self.db.ping().await?;
        let backend = format!("{:?}", self.db.get_database_backend());

        Ok(JobResult::with_data(json!({ "backend": backend })).message("Database is reachable"))
    }
}

async fn send_email_digest() -> Result<JobResult, JobError> {
    info!("📧 Sending weekly digest");
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(JobResult::with_data(json!({ "emails_sent": 3 })))
}

async fn sync_external_data() -> Result<JobResult, JobError> {
    Err(JobError::failed("external API credentials are not configured"))
}

fn job_registry(context: &JobContext) -> Result<JobRegistry, SchedulerError> {
    let mut registry = JobRegistry::new();
    registry
        .register_job(context.cleanup_job())?
        .register_job(DatabaseReportJob {
            db: context.db.clone(),
        })?
        .add(JobDefinition::new("email-digest", "every monday at 9am", send_email_digest))?
        .add(
            JobDefinition::new("data-sync", "0 */4 * * *", sync_external_data)
                .timeout(Duration::from_secs(300))
                .overlap(OverlapPolicy::Skip),
        )?
        .add(JobDefinition::new("heartbeat", "@hourly", || async { Ok(JobResult::ok()) }).enabled(false))?;

    Ok(registry)
}

async fn hello() -> Json<serde_json::Value> {
    Json(json!({ "hello": "world" }))
}

fn app_router(_app: App) -> Router {
    Router::new().route("/hello", get(hello))
}

#[tokio::main]
async fn main() -> ExitCode {
    boot(BootConfig::new(app_router, job_registry)).await
}
