use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{api, app::App};

pub fn router(app: App, app_router: fn(App) -> Router) -> Router {
    let api_router = Router::new()
        .route("/jobs", get(api::jobs::list_jobs))
        .route("/jobs/{name}/run", post(api::jobs::run_job))
        .route("/job-runs", get(api::jobs::list_job_runs))
        .with_state(app.clone())
        .merge(app_router(app.clone()));

    Router::new()
        .route("/liveness", get(api::health_checks::ok))
        .route("/readiness", get(api::health_checks::readiness))
        .with_state(app)
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
}
