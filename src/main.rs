//! Campaign Review Agent: binary entrypoint
//! Boots the Axum HTTP server through Shuttle; all wiring lives in the library.

use campaign_review_agent::{app, telemetry};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let router = app().await?;
    Ok(router.into())
}
