use dotenvy::dotenv;
use facility_booking::{
    api::{AppState, build_router},
    config::{database, settings},
    core::{invoice::InvoiceGenerator, service::seed_services},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

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

    // 3. Load config.toml with environment overrides
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database.url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Seed the service catalog
    let seeds: Vec<_> = app_config
        .services
        .iter()
        .map(settings::ServiceSeed::to_input)
        .collect();
    seed_services(&db, &seeds)
        .await
        .inspect_err(|e| error!("Failed to seed services: {e}"))?;

    // 6. Serve HTTP
    let state = AppState::new(db, InvoiceGenerator::new(app_config.invoice.prefix.clone()));
    let listener = tokio::net::TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {e}", app_config.server.bind_address))?;
    info!(address = %app_config.server.bind_address, "Listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
