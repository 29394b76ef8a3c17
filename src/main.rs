use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use api_rest::{ApiDoc, AppState};
use opal_core::{run_sweep, CoreConfig, Registry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Main entry point for the opaladmin service.
///
/// Opens the record registry, runs the expiry sweep on startup and on a
/// daily interval, and serves the REST API with Swagger UI.
///
/// # Environment Variables
/// - `OPALADMIN_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `OPALADMIN_DATA_DIR`: Registry data directory (default: "/opal_data")
/// - `OPALADMIN_API_KEY`: API key for administrative endpoints; unset
///   disables the check (development only)
/// - `OPALADMIN_SWEEP_INTERVAL_SECS`: Expiry sweep interval (default: 86400)
/// - `RUST_LOG`: tracing filter
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opaladmin=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("OPALADMIN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;
    let data_dir: PathBuf = std::env::var("OPALADMIN_DATA_DIR")
        .unwrap_or_else(|_| "/opal_data".into())
        .into();
    let api_key = std::env::var("OPALADMIN_API_KEY").ok();
    let sweep_interval_secs: u64 = std::env::var("OPALADMIN_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(86_400);

    if api_key.is_none() {
        tracing::warn!("OPALADMIN_API_KEY is not set; administrative endpoints are unprotected");
    }

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let registry = Registry::open(cfg)?;

    // Sweep once at startup, then on the configured interval.
    let sweep_registry = registry.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(sweep_interval_secs));
        loop {
            interval.tick().await;
            let registry = sweep_registry.clone();
            let outcome =
                tokio::task::spawn_blocking(move || run_sweep(&registry, chrono::Utc::now()))
                    .await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!("expiry sweep failed: {e}"),
                Err(e) => tracing::error!("expiry sweep task failed: {e}"),
            }
        }
    });

    let app = api_rest::build_router(AppState::new(registry, api_key))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    tracing::info!("++ Starting opaladmin REST on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
