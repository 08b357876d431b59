pub mod list;
pub mod migrate;
pub mod run_job;
pub mod serve;

use crate::{
    app::App,
    boot::{BootError, JobRegistryBuilder},
    config::Config,
    database::setup_database,
    environment::Environment,
};

/// Connects to the database and builds the app for a one-shot operator
/// command. Jobs are never armed here.
async fn setup_app(
    environment: Environment,
    config: Config,
    job_registry: JobRegistryBuilder,
) -> Result<App, BootError> {
    let db = setup_database(&config.database).await?;
    Ok(App::new(config, environment, db, job_registry)?)
}
