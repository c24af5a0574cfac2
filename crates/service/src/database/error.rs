/// Failures of the server-side registries.
///
/// Every variant except `Database` is an expected outcome of a well-formed
///  request and maps directly onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RegistryError {
    /// Maps constraint violations raised by `error` onto the registry
    ///  taxonomy, leaving everything else a database failure.
    pub(crate) fn from_constraint(error: sqlx::Error, conflict: &str) -> Self {
        match error.as_database_error() {
            Some(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
                RegistryError::Conflict(conflict.to_string())
            }
            _ => RegistryError::Database(error),
        }
    }
}
