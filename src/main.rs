use std::time::Duration;

use crate::{
    backend::AvailabilityBackend,
    configuration::{Configuration, StorageKind},
    configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface,
    http::create_app,
    local_availability::LocalAvailability,
};
use anyhow::{bail, Context};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod backend;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_availability;
mod schema;
#[cfg(test)]
mod testutils;
mod types;

#[derive(Clone)]
struct AppState<T: AvailabilityBackend> {
    backend: T,
}

async fn connect_database<C: Configuration>(configuration: &C) -> anyhow::Result<DatabaseInterface> {
    let database = configuration.database();
    let attempts = configuration.connect_attempts();

    for attempt in 1..=attempts {
        let config = database.clone();
        let result = tokio::task::spawn_blocking(move || DatabaseInterface::new(&config))
            .await
            .context("Database connection task failed")?;
        match result {
            Ok(backend) => {
                info!(database = %database.redacted_target(), "Successfully connected to database");
                return Ok(backend);
            }
            Err(err) => {
                error!(?err, attempt, attempts, database = %database.redacted_target(), "Failed to establish database connection. Retry in 1 sec. You may want to restart it with --storage memory (impersistent availability).");
                if attempt < attempts {
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
    bail!("Database unreachable after {attempts} attempts")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(%address, "Availability manager accessible");

    let app = match configuration.storage() {
        StorageKind::Postgres => {
            let backend = connect_database(&configuration).await?;
            if configuration.run_migrations() {
                let migrator = backend.clone();
                tokio::task::spawn_blocking(move || migrator.run_migrations())
                    .await
                    .context("Migration task failed")?
                    .context("Failed to run database migrations")?;
            }
            create_app(backend, &configuration)
        }
        StorageKind::Memory => {
            warn!("Running with in-memory storage, availability is lost on restart");
            create_app(LocalAvailability::default(), &configuration)
        }
    };

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
