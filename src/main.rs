use debt_tracker::{
    config::{self, database},
    core::dispatch::ReminderDispatcher,
    errors::Result,
    mail, scheduler,
};
use dotenvy::dotenv;
use std::sync::Arc;
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
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Connect and make sure every table exists
    let database_url = database::resolve_database_url(&app_config.database_url);
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Pick the mailer and start the sweeps
    let mailer = mail::mailer_from_config(&app_config.mail)?;
    let dispatcher = Arc::new(ReminderDispatcher::new(
        db,
        mailer,
        app_config.mail.from.clone(),
    ));
    let sweeps = scheduler::spawn_sweeps(Arc::clone(&dispatcher), &app_config.schedule);

    // 6. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping reminder sweeps.");
    sweeps.abort();

    Ok(())
}
