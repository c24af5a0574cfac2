use axum::extract::FromRef;
use url::Url;

use super::config::Config;
use super::database::{Database, DatabaseSetupError};

/// Shared state handed to every request handler
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    reservation_cap: i64,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        if config.reservation_cap < 1 {
            return Err(StateSetupError::InvalidReservationCap(config.reservation_cap));
        }

        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // check that the path exists
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {:?}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        Ok(Self::new(database, config.reservation_cap))
    }

    pub fn new(database: Database, reservation_cap: i64) -> Self {
        Self {
            database,
            reservation_cap,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn reservation_cap(&self) -> i64 {
        self.reservation_cap
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        &self.database
    }
}

impl FromRef<State> for Database {
    fn from_ref(state: &State) -> Self {
        state.database.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("reservation cap must be at least 1, got {0}")]
    InvalidReservationCap(i64),
}
