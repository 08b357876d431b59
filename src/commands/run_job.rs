use std::process::ExitCode;

use crate::{
    boot::{BootError, JobRegistryBuilder},
    config::Config,
    environment::Environment,
    jobs::control::{JobsControl, RunJobResponse},
};

pub async fn handle_run_job_command(
    environment: Environment,
    config: Config,
    job_registry: JobRegistryBuilder,
    name: &str,
) -> Result<ExitCode, BootError> {
    let app = super::setup_app(environment, config, job_registry).await?;

    if run_job(&app.jobs, name).await {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Runs the job and prints its outcome. Returns false when the job is unknown
/// or its handler reports an error.
pub async fn run_job(jobs: &JobsControl, name: &str) -> bool {
    println!("▶️ Running job '{name}'...");
    let response = jobs.run_job(name).await;
    print_response(name, &response);
    response.success
}

fn print_response(name: &str, response: &RunJobResponse) {
    let duration = response
        .duration_ms
        .map(|ms| format!(" in {ms}ms"))
        .unwrap_or_default();

    if response.success {
        println!("✅ Job '{name}' completed{duration}");
    } else {
        eprintln!(
            "❌ Job '{name}' failed{duration}: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    if let Some(result) = &response.result {
        if let Some(message) = &result.message {
            println!("   {message}");
        }
        if let Some(data) = &result.data {
            println!("   {data}");
        }
        if !result.success {
            println!(
                "   ⚠️ Job reported: {}",
                result.error.as_deref().unwrap_or("unsuccessful")
            );
        }
    }

    if let Some(run_id) = response.run_id {
        println!("   Run id: {run_id}");
    }
}
