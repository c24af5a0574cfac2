use clap::Args;

use common::key_format::KeyVariant;
use jailbird_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct List {
    /// Only list one variant (public, private, imported)
    #[arg(long)]
    pub variant: Option<KeyVariant>,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyListError {
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for List {
    type Error = KeyListError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;

        let variants = match self.variant {
            Some(variant) => vec![variant],
            None => KeyVariant::ALL.to_vec(),
        };

        let lines = variants
            .into_iter()
            .flat_map(|variant| keys.list(variant))
            .map(|key| {
                format!(
                    "{} [{}] {} ({}) {}",
                    key.kid, key.variant, key.name, key.alg, key.fingerprint
                )
            })
            .collect::<Vec<_>>();

        if lines.is_empty() {
            Ok("No keys found".to_string())
        } else {
            Ok(lines.join("\n"))
        }
    }
}
