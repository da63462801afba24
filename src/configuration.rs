use clap::ValueEnum;
use std::{fmt, time::Duration};
use url::Url;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> u16;
    fn storage(&self) -> StorageKind;
    fn database(&self) -> DatabaseConfig;
    fn allowed_origins(&self) -> Vec<String>;
    fn run_migrations(&self) -> bool;
    fn connect_attempts(&self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// PostgreSQL, durable
    Postgres,
    /// In-process, lost on restart
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportSecurity {
    #[value(alias = "disable")]
    Disabled,
    #[value(alias = "require")]
    Required,
}

impl TransportSecurity {
    fn sslmode(self) -> &'static str {
        match self {
            TransportSecurity::Disabled => "disable",
            TransportSecurity::Required => "require",
        }
    }
}

/// Everything the database store needs to open its pool.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub transport_security: TransportSecurity,
    /// Takes precedence over the discrete connection parts when set.
    pub url: Option<String>,
    pub pool_size: u32,
    pub connect_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "postgres".into(),
            database: "postgres".into(),
            transport_security: TransportSecurity::Disabled,
            url: None,
            pool_size: 10,
            connect_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(10),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> Result<String, url::ParseError> {
        let mut url = match &self.url {
            Some(url) => Url::parse(url)?,
            None => {
                let mut url = Url::parse("postgres://localhost")?;
                url.set_host(Some(&self.host))?;
                url.set_port(Some(self.port))
                    .map_err(|_| url::ParseError::InvalidPort)?;
                url.set_username(&self.user)
                    .map_err(|_| url::ParseError::EmptyHost)?;
                url.set_password(Some(&self.password))
                    .map_err(|_| url::ParseError::EmptyHost)?;
                url.set_path(&format!("/{}", self.database));
                url
            }
        };

        let has_sslmode = url.query_pairs().any(|(key, _)| key == "sslmode");
        let has_options = url.query_pairs().any(|(key, _)| key == "options");

        // libpq only decodes %XX escapes, so spaces can't go through form encoding.
        let mut extra = Vec::new();
        if !has_sslmode {
            extra.push(format!("sslmode={}", self.transport_security.sslmode()));
        }
        if !has_options && !self.statement_timeout.is_zero() {
            extra.push(format!(
                "options=-c%20statement_timeout%3D{}",
                self.statement_timeout.as_millis()
            ));
        }
        if !extra.is_empty() {
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => {
                    format!("{existing}&{}", extra.join("&"))
                }
                _ => extra.join("&"),
            };
            url.set_query(Some(&query));
        }
        Ok(url.into())
    }

    /// Connection target without credentials, safe for logs.
    pub fn redacted_target(&self) -> String {
        match self.url.as_deref().map(Url::parse) {
            Some(Ok(url)) => format!(
                "{}:{}{}",
                url.host_str().unwrap_or_default(),
                url.port().unwrap_or(5432),
                url.path()
            ),
            Some(Err(_)) => "<unparsable DATABASE_URL>".into(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("target", &self.redacted_target())
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("transport_security", &self.transport_security)
            .field("pool_size", &self.pool_size)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}
