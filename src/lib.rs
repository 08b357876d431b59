//! Cronwork - recurring job scheduling
//!
//! Applications register their jobs in a [`jobs::job_registry::JobRegistry`]
//! and hand it to [`boot::boot`], which arms each job on its cron schedule,
//! records every run in the database and exposes an operator CLI plus a small
//! admin API.

#![allow(missing_docs)]

pub mod api;
pub mod app;
pub mod boot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod database;
pub mod environment;
pub mod jobs;
pub mod router;
pub mod run_recorder;
pub mod setup_tracing;
