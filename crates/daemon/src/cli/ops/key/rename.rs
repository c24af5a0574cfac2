use clap::Args;

use common::client::ClientError;
use common::keystore::RenameStatus;
use common::kid::Kid;
use jailbird_daemon::state::StateError;

/// Rename a local key pair. The halves are renamed independently.
#[derive(Args, Debug, Clone)]
pub struct Rename {
    #[arg(long)]
    pub kid: Kid,

    #[arg(long)]
    pub new_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rename {
    type Error = RenameError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;
        let outcome = keys.rename(&self.kid, &self.new_name).await?;

        if outcome.fully_renamed() {
            return Ok(format!("Renamed key {} to {}", self.kid, outcome.new_name));
        }
        Ok(format!(
            "Renamed key {} to {}\n  public:  {}\n  private: {}",
            self.kid,
            outcome.new_name,
            describe(&outcome.public),
            describe(&outcome.private)
        ))
    }
}

fn describe(status: &RenameStatus) -> String {
    match status {
        RenameStatus::Renamed => "renamed".to_string(),
        RenameStatus::Missing => "not present".to_string(),
        RenameStatus::Failed(reason) => format!("failed: {}", reason),
    }
}
