pub mod health_checks;
pub mod jobs;
pub mod json_error;
