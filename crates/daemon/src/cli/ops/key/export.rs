use std::path::PathBuf;

use clap::Args;

use common::client::ClientError;
use common::key_format::FormatError;
use common::kid::Kid;
use jailbird_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Export {
    #[arg(long)]
    pub kid: Kid,

    /// Export only the public half
    #[arg(long)]
    pub public: bool,

    /// Write to this file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no exportable key with kid {0}")]
    NotFound(Kid),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to encode key: {0}")]
    Encode(#[from] FormatError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Export {
    type Error = ExportError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;

        let exported = if self.public {
            match keys.export_public_key(&self.kid) {
                Some(key) => Some(key.to_json()?),
                None => None,
            }
        } else {
            keys.export_key_string(&self.kid)?
        };
        let exported = exported.ok_or(ExportError::NotFound(self.kid))?;

        match &self.out {
            Some(path) => {
                tokio::fs::write(path, exported)
                    .await
                    .map_err(|e| ExportError::Write(path.clone(), e))?;
                Ok(format!("Exported key {} to {}", self.kid, path.display()))
            }
            None => Ok(exported),
        }
    }
}
