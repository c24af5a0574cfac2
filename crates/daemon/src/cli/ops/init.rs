use clap::Args;

use jailbird_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port the API server listens on
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Identity to send with every API request
    #[arg(long)]
    pub user: Option<String>,

    /// Log level for the daemon (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            api_port: self.api_port.unwrap_or(defaults.api_port),
            user: self.user.clone(),
            log_level: self.log_level.clone().unwrap_or(defaults.log_level),
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let mut lines = vec![
            format!("Initialized jailbird directory at {}", state.jailbird_dir.display()),
            format!("  api_port:  {}", state.config.api_port),
            format!("  log_level: {}", state.config.log_level),
        ];
        match &state.config.user {
            Some(user) => lines.push(format!("  user:      {}", user)),
            None => lines.push("  user:      (unset, pass --user on each call)".to_string()),
        }
        Ok(lines.join("\n"))
    }
}
