// App state (configuration, paths, local keys)
pub mod state;

pub use state::{AppConfig, AppState, StateError};
