use std::{fmt::Write as _, process::ExitCode};

use chrono_tz::Tz;

use crate::{
    boot::{BootError, JobRegistryBuilder},
    config::Config,
    environment::Environment,
    jobs::control::JobInfo,
    run_recorder::JobRun,
};

pub async fn handle_list_command(
    environment: Environment,
    config: Config,
    job_registry: JobRegistryBuilder,
    runs: bool,
    limit: Option<u64>,
) -> Result<ExitCode, BootError> {
    let app = super::setup_app(environment, config, job_registry).await?;

    if runs {
        let runs = app.jobs.list_recent_runs(limit).await;
        print!("{}", render_runs(&runs));
    } else {
        let timezone = app.jobs.scheduler().timezone();
        println!(
            "📅 Jobs (timezone: {}, scheduling {} in {})",
            timezone,
            if app.jobs.is_enabled() { "enabled" } else { "disabled" },
            environment
        );
        print!("{}", render_jobs(&app.jobs.list_jobs(), timezone));
    }

    Ok(ExitCode::SUCCESS)
}

pub fn render_jobs(jobs: &[JobInfo], timezone: Tz) -> String {
    if jobs.is_empty() {
        return "No jobs registered\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<24} {:<20} {:<10} NEXT RUN", "NAME", "SCHEDULE", "STATUS");
    for job in jobs {
        let status = if !job.enabled {
            "disabled"
        } else if job.running {
            "running"
        } else if job.active {
            "active"
        } else {
            "idle"
        };
        let next_run = match job.next_run {
            Some(next) if job.valid_schedule => next
                .with_timezone(&timezone)
                .format("%Y-%m-%d %H:%M %Z")
                .to_string(),
            _ if !job.valid_schedule => "invalid schedule".to_string(),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:<10} {}",
            job.name, job.schedule, status, next_run
        );
    }
    out
}

pub fn render_runs(runs: &[JobRun]) -> String {
    if runs.is_empty() {
        return "No job runs recorded\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<24} {:<10} {:>10}  ERROR",
        "STARTED", "JOB", "STATUS", "DURATION"
    );
    for run in runs {
        let duration = run
            .duration_ms
            .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
        let _ = writeln!(
            out,
            "{:<20} {:<24} {:<10} {:>10}  {}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.job_name,
            run.status,
            duration,
            run.error.as_deref().unwrap_or("")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::run_recorder::RunStatus;

    fn job(name: &str, schedule: &str) -> JobInfo {
        JobInfo {
            name: name.to_string(),
            schedule: schedule.to_string(),
            enabled: true,
            active: true,
            running: false,
            valid_schedule: true,
            next_run: Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).single(),
        }
    }

    #[test]
    fn test_render_jobs_shows_next_run_in_timezone() {
        let broken = JobInfo {
            valid_schedule: false,
            next_run: None,
            active: false,
            ..job("broken", "61 * * * *")
        };
        let out = render_jobs(&[job("cleanup", "0 0 * * *"), broken], Tz::Europe__Warsaw);

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("cleanup"));
        assert!(lines[1].contains("active"));
        assert!(lines[1].contains("2026-10-17 02:00 CEST"));
        assert!(lines[2].contains("invalid schedule"));
        assert_eq!(render_jobs(&[], Tz::UTC), "No jobs registered\n");
    }

    #[test]
    fn test_render_runs() {
        let run = JobRun {
            id: Uuid::new_v4(),
            job_name: "sync".to_string(),
            status: RunStatus::Failed,
            started_at: Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap(),
            finished_at: None,
            duration_ms: Some(1200),
            error: Some("timeout".to_string()),
        };

        let out = render_runs(&[run]);
        let row = out.lines().nth(1).unwrap();
        assert!(row.starts_with("2026-10-16 08:30:00"));
        assert!(row.contains("failed"));
        assert!(row.contains("1200ms"));
        assert!(row.ends_with("timeout"));
    }
}
