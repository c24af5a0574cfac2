use clap::Args;

use common::client::ClientError;
use common::crypto::KeyPairParams;
use common::key_format::HashAlgorithm;
use common::kid::Kid;
use jailbird_daemon::state::StateError;
use service::http_server::api::client::ApiError;
use service::http_server::api::v0::key::ReserveRequest;

#[derive(Args, Debug, Clone)]
pub struct Generate {
    /// Human readable name for the key pair
    #[arg(long)]
    pub name: String,

    /// Mint the KID locally instead of reserving one from the server
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Generate {
    type Error = GenerateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.key_client().await?;

        let (kid, note) = if self.offline {
            (Kid::generate(), "minted locally")
        } else {
            let mut client = ctx.client.clone();
            let reservation = client.call(ReserveRequest::default()).await?;
            let note = if reservation.reused {
                "reused reservation"
            } else {
                "new reservation"
            };
            (reservation.kid, note)
        };

        let kid = keys
            .generate_key_pair(KeyPairParams::rsa_oaep(
                self.name.clone(),
                kid,
                HashAlgorithm::Sha256,
            ))
            .await?;

        Ok(format!(
            "Generated key pair {} ({}, {})\nfingerprint: {}",
            kid,
            self.name,
            note,
            keys.fingerprint(&kid)
        ))
    }
}
