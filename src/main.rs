use bot_dashboard::{
    api,
    bot::SerenityRuntime,
    config::{self, database},
    core::ControlPlane,
    errors::Result,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the dashboard configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading configuration: {}", e))?;
    info!("Loaded dashboard configuration");

    // 4. Initialize database
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Wire the control plane and seed first-boot state
    let plane = ControlPlane::new(db, Arc::new(SerenityRuntime::new()), &app_config);
    plane.bootstrap(config::bootstrap_token()).await?;

    // 6. Serve the dashboard API until Ctrl-C
    let listener = TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind_address, e))?;
    api::serve(listener, plane.clone(), shutdown_signal()).await?;

    // 7. Close the Discord session on the way out
    if let Err(e) = plane.connection.disconnect().await {
        warn!("Disconnect during shutdown failed: {}", e);
    }
    info!("Bot dashboard stopped");
    Ok(())
}
