pub mod job_run;
pub mod run_status;
