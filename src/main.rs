use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toy_exchange::api;
use toy_exchange::config::AppConfig;
use toy_exchange::db::Database;
use toy_exchange::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toy_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let app_config = AppConfig::load()?;

    tracing::info!("Starting toy-exchange v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", app_config.environment);

    let db = Database::connect(&app_config.database_url, app_config.db_max_connections).await?;
    let state = AppState::new(db);

    let app = api::routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
