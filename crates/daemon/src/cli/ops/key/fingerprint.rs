use clap::Args;

use common::kid::Kid;
use jailbird_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Fingerprint {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fingerprint {
    type Error = FingerprintError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;
        Ok(keys.fingerprint(&self.kid))
    }
}
