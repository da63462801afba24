use crate::configuration::{Configuration, DatabaseConfig, StorageKind, TransportSecurity};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Availability calendar backend for properties and sellers")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 5002)]
    port: u16,

    /// Where availability slots are kept
    #[arg(long, env = "STORAGE", value_enum, default_value_t = StorageKind::Postgres)]
    storage: StorageKind,

    /// Full connection URL, overrides the DB_* parts
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    db_host: String,

    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    db_port: u16,

    #[arg(long, env = "DB_USER", default_value = "postgres")]
    db_user: String,

    #[arg(long, env = "DB_PASSWORD", default_value = "postgres", hide_env_values = true, hide_default_value = true)]
    db_password: String,

    #[arg(long, env = "DB_NAME", default_value = "maison_property_calendar")]
    db_name: String,

    /// TLS requirement for the database connection
    #[arg(long, env = "DB_SSLMODE", value_enum, default_value_t = TransportSecurity::Required)]
    db_transport_security: TransportSecurity,

    #[arg(long, env = "DB_POOL_SIZE", default_value_t = 10)]
    db_pool_size: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long, env = "DB_CONNECT_TIMEOUT", default_value_t = 5)]
    db_connect_timeout: u64,

    /// Milliseconds before the database cancels a statement, 0 disables
    #[arg(long, env = "DB_STATEMENT_TIMEOUT", default_value_t = 10_000)]
    db_statement_timeout: u64,

    /// How often startup tries to reach the database before giving up
    #[arg(long, env = "DB_CONNECT_ATTEMPTS", default_value_t = 10)]
    db_connect_attempts: u32,

    #[arg(long, env = "SKIP_MIGRATIONS")]
    skip_migrations: bool,

    /// Comma separated list of origins allowed by CORS, any origin when empty
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(?err, "Failed to load .env file");
            }
        }
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> u16 {
        self.port
    }

    fn storage(&self) -> StorageKind {
        self.storage
    }

    fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            database: self.db_name.clone(),
            transport_security: self.db_transport_security,
            url: self.database_url.clone(),
            pool_size: self.db_pool_size,
            connect_timeout: Duration::from_secs(self.db_connect_timeout),
            statement_timeout: Duration::from_millis(self.db_statement_timeout),
        }
    }

    fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    fn run_migrations(&self) -> bool {
        !self.skip_migrations
    }

    fn connect_attempts(&self) -> u32 {
        self.db_connect_attempts.max(1)
    }
}
