use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database unavailable: {0}")]
    ConnectionFailure(String),

    #[error("Availability slot already exists")]
    DuplicateSlot,

    #[error("Invalid reference data: {0}")]
    ConstraintViolation(String),

    #[error("Availability slot {0} not found")]
    NotFound(Uuid),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::ConnectionFailure(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation(message.into())
    }
}

fn is_statement_timeout(message: &str) -> bool {
    message.contains("statement timeout") || message.contains("canceling statement")
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(kind, info) => {
                debug!(?kind, message = info.message(), "database operation failed");
                match kind {
                    DatabaseErrorKind::UniqueViolation => Self::DuplicateSlot,
                    DatabaseErrorKind::ForeignKeyViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::CheckViolation => Self::constraint(info.message()),
                    DatabaseErrorKind::ClosedConnection
                    | DatabaseErrorKind::UnableToSendCommand => Self::connection(info.message()),
                    _ if is_statement_timeout(info.message()) => Self::connection(info.message()),
                    _ => Self::constraint(info.message()),
                }
            }
            DieselError::BrokenTransactionManager => {
                Self::connection("transaction manager is broken")
            }
            other => Self::connection(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for StoreError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Self::connection(err.to_string())
    }
}
