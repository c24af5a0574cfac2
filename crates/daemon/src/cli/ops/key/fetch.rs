use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;

use common::client::ClientError;
use common::kid::Kid;
use jailbird_daemon::state::StateError;
use service::http_server::api::client::ApiError;
use service::http_server::api::v0::key::DownloadKeyRequest;

/// Download someone's public key from the registry into the local store
#[derive(Args, Debug, Clone)]
pub struct Fetch {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("registry served malformed key: {0}")]
    Malformed(String),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Fetch {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(DownloadKeyRequest { kid: self.kid }).await?;

        let bytes = STANDARD
            .decode(&response.key_b64)
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        let raw = String::from_utf8(bytes).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let keys = ctx.state()?.key_client().await?;
        let kid = keys.import_key_string(&raw, Some(self.kid)).await?;

        Ok(format!("Fetched key {}\nfingerprint: {}", kid, keys.fingerprint(&kid)))
    }
}
