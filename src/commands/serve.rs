use std::net::SocketAddr;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    api::health_checks::ok,
    app::App,
    boot::{BootConfig, BootError},
    config::Config,
    database::setup_database,
    environment::Environment,
    router::router,
};

pub async fn handle_serve_command(
    environment: Environment,
    config: Config,
    boot_config: BootConfig,
) -> Result<(), BootError> {
    let port = config.server.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    // A temporary liveness server keeps orchestrators happy while migrations run
    let listener = TcpListener::bind(addr).await?;
    let liveness_server_task = tokio::spawn(start_liveness_server(listener));

    let db = match setup_database(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("❌ Database setup failed: {}", e);
            liveness_server_task.abort();
            return Err(e.into());
        }
    };

    let app = App::new(config, environment, db, boot_config.job_registry)?;
    app.jobs.initialize();
    let scheduler = app.jobs.scheduler().clone();

    // Stop the temporary liveness server
    liveness_server_task.abort();
    let _ = liveness_server_task.await;

    let router = router(app, boot_config.app_router);
    let result = start_server(router, addr).await;

    scheduler.shutdown();
    info!("👋 Scheduler stopped");
    result
}

// Minimal server that only serves liveness endpoint during migrations
async fn start_liveness_server(listener: TcpListener) {
    let migration_router = Router::new().route("/liveness", get(ok));
    if let Err(e) = axum::serve(listener, migration_router).await {
        error!("❌ Liveness server failed: {}", e);
    }
}

// Full server with all endpoints
async fn start_server(router: Router, addr: SocketAddr) -> Result<(), BootError> {
    let listener = TcpListener::bind(addr).await?;

    info!("🌐 Server starting on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown signal received");
}
