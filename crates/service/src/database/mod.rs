mod blobs;
mod error;
mod public_keys;
mod reservations;
mod sqlite;
mod types;

use std::ops::Deref;

use sqlx::{Sqlite, SqlitePool, Transaction};

pub use blobs::{AbandonedUpload, BlobRecord, BlobState, BlobSummary, WrappedKey};
pub use error::RegistryError;
pub use public_keys::PublicKeySummary;
pub use reservations::Reservation;
pub use types::DKid;

/// Most KIDs a user may hold in reserve at once
pub const DEFAULT_RESERVATION_CAP: i64 = 5;

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

#[allow(dead_code)]
pub type DatabaseConnection = sqlx::SqliteConnection;

impl Database {
    pub async fn connect(database_url: &url::Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() == "sqlite" {
            let db = sqlite::connect_sqlite(database_url).await?;
            sqlite::migrate_sqlite(&db).await?;
            return Ok(Database::new(db));
        }

        Err(DatabaseSetupError::UnknownDbType(
            database_url.scheme().to_string(),
        ))
    }

    /// A fresh, migrated, private in-memory database
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let db = sqlite::connect_sqlite_memory().await?;
        sqlite::migrate_sqlite(&db).await?;
        Ok(Database::new(db))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    /// A transaction that takes the write lock up front.
    ///
    /// Deferred transactions that read and then write fail with
    ///  `SQLITE_BUSY` when another writer gets in between; immediate ones
    ///  queue on the busy timeout instead and then see the winner's rows.
    pub(crate) async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.0.begin_with("BEGIN IMMEDIATE").await
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("requested database type was not recognized: {0}")]
    UnknownDbType(String),
}
