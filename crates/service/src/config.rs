use std::path::PathBuf;

use crate::database::DEFAULT_RESERVATION_CAP;

pub const DEFAULT_API_PORT: u16 = 5001;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server
    pub api_port: u16,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // registry configuration
    /// most KIDs a single user may hold in reserve
    pub reservation_cap: i64,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            sqlite_path: None,
            reservation_cap: DEFAULT_RESERVATION_CAP,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}
