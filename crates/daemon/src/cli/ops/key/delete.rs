use clap::Args;

use common::kid::Kid;
use jailbird_daemon::state::StateError;

/// Delete a key from the local store, every variant it is held under
#[derive(Args, Debug, Clone)]
pub struct Delete {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("no key with kid {0}")]
    NotFound(Kid),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Delete {
    type Error = DeleteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;
        let report = keys.delete(&self.kid).await;

        if !report.removed_any() && report.failed.is_empty() {
            return Err(DeleteError::NotFound(self.kid));
        }

        let mut lines = vec![format!("Deleted key {}", self.kid)];
        for variant in &report.removed {
            lines.push(format!("  {}: removed", variant));
        }
        for (variant, reason) in &report.failed {
            lines.push(format!("  {}: failed: {}", variant, reason));
        }
        Ok(lines.join("\n"))
    }
}
