use std::path::PathBuf;

use clap::Args;

use common::client::ClientError;
use common::kid::Kid;
use jailbird_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Import {
    /// File holding an exported key or key pair
    #[arg(long)]
    pub file: PathBuf,

    /// Reject the import unless the key carries this KID
    #[arg(long)]
    pub kid: Option<Kid>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Import {
    type Error = ImportError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let raw = tokio::fs::read_to_string(&self.file)
            .await
            .map_err(|e| ImportError::Read(self.file.clone(), e))?;

        let keys = ctx.state()?.key_client().await?;
        let kid = keys.import_key_string(&raw, self.kid).await?;

        Ok(format!("Imported key {}\nfingerprint: {}", kid, keys.fingerprint(&kid)))
    }
}
