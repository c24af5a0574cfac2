//! Server side of jailbird.
//!
//! - Database (SQLite registries for reserved KIDs, public keys,
//!   wrapped symmetric keys and encrypted blobs)
//! - HTTP API over those registries, plus a typed client for it
//! - Process setup: logging, signals, graceful shutdown

pub mod config;
pub mod database;
pub mod http_server;
pub mod process;
pub mod state;

pub use config::Config as ServiceConfig;
pub use database::{Database, DatabaseSetupError, RegistryError};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use state::{State as ServiceState, StateSetupError};
