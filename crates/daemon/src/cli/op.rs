use std::error::Error;
use std::path::PathBuf;

use url::Url;

use jailbird_daemon::state::{AppState, StateError};
use service::http_server::api::client::{ApiClient, ApiError};

const DEFAULT_REMOTE: &str = "http://localhost:5001";

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > 5001.
pub fn resolve_remote(explicit: Option<Url>, config: Option<&AppState>) -> Result<Url, url::ParseError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    if let Some(state) = config {
        if let Ok(url) = Url::parse(&format!("http://localhost:{}", state.config.api_port)) {
            return Ok(url);
        }
    }
    Url::parse(DEFAULT_REMOTE)
}

/// Resolve the identity sent to the API: explicit `--user` flag, else
///  `user` from the config file.
pub fn resolve_user(explicit: Option<String>, config: Option<&AppState>) -> Option<String> {
    explicit.or_else(|| config.and_then(|state| state.config.user.clone()))
}

#[derive(Clone)]
pub struct OpContext {
    /// API client (always initialized with default or custom URL)
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.jailbird)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL, identity and optional config path
    pub fn new(
        remote: Url,
        user: Option<String>,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: ApiClient::new(&remote, user.as_deref())?,
            config_path,
        })
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(port: u16, user: Option<&str>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let config = jailbird_daemon::AppConfig {
            api_port: port,
            user: user.map(str::to_string),
            ..Default::default()
        };
        let state = AppState::init(Some(dir.path().join("state")), Some(config)).unwrap();
        (dir, state)
    }

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999").unwrap();
        let (_dir, state) = state_with(7000, None);
        let result = resolve_remote(Some(explicit.clone()), Some(&state)).unwrap();
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_uses_config_port() {
        let (_dir, state) = state_with(7000, None);
        let result = resolve_remote(None, Some(&state)).unwrap();
        assert_eq!(result.port(), Some(7000));
    }

    #[test]
    fn test_resolve_remote_no_config() {
        let result = resolve_remote(None, None).unwrap();
        assert_eq!(result.as_str(), "http://localhost:5001/");
    }

    #[test]
    fn test_resolve_user() {
        let (_dir, state) = state_with(7000, Some("alice"));
        assert_eq!(resolve_user(None, Some(&state)).as_deref(), Some("alice"));
        assert_eq!(
            resolve_user(Some("bob".to_string()), Some(&state)).as_deref(),
            Some("bob")
        );
        assert_eq!(resolve_user(None, None), None);
    }
}
