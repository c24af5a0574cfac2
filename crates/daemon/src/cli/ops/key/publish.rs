use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;

use common::key_format::FormatError;
use common::kid::Kid;
use jailbird_daemon::state::StateError;
use service::http_server::api::client::ApiError;
use service::http_server::api::v0::key::UploadKeyRequest;

/// Upload the public half of a local key pair to the registry
#[derive(Args, Debug, Clone)]
pub struct Publish {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("no key pair with kid {0}")]
    NotFound(Kid),
    #[error("failed to encode key: {0}")]
    Encode(#[from] FormatError),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Publish {
    type Error = PublishError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;
        let public = keys
            .export_public_key(&self.kid)
            .ok_or(PublishError::NotFound(self.kid))?;

        let request = UploadKeyRequest {
            kid: self.kid,
            name: public.name.clone(),
            key_b64: STANDARD.encode(public.to_json()?),
        };

        let mut client = ctx.client.clone();
        let response = client.call(request).await?;
        Ok(format!("Published public key {}", response.kid))
    }
}
