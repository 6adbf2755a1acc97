//! Deal Aggregator - Binary Entrypoint
//! Boots the Axum HTTP server with the configured marketplaces.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    deal_aggregator::telemetry::init();

    let router = deal_aggregator::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}
