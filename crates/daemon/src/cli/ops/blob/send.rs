use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;
use reqwest::StatusCode;

use common::client::{parse_public_key, ClientError, KeyClient};
use common::crypto::ImportedKey;
use common::kid::Kid;
use jailbird_daemon::state::StateError;
use service::http_server::api::client::{ApiClient, ApiError};
use service::http_server::api::v0::blob::{CreateBlobRequest, UploadBlobRequest};
use service::http_server::api::v0::key::DownloadKeyRequest;

/// Encrypt a file and upload it to the registry
#[derive(Args, Debug, Clone)]
pub struct SendBlob {
    /// File to encrypt and upload
    #[arg(long)]
    pub file: PathBuf,

    /// Published public key to wrap the file key under
    #[arg(long)]
    pub key: Kid,

    /// Name to store the blob under (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("no usable file name in {0}, pass --name")]
    NoName(PathBuf),
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
impl crate::cli::op::Op for SendBlob {
    type Error = SendError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| SendError::NoName(self.file.clone()))?,
        };
        let plaintext = tokio::fs::read(&self.file)
            .await
            .map_err(|e| SendError::Read(self.file.clone(), e))?;

        let mut client = ctx.client.clone();
        let keys = ctx.state()?.key_client().await?;
        let recipient = recipient_key(&keys, &mut client, &self.key).await?;

        let share = KeyClient::seal_for(&recipient, &plaintext)?;
        let created = client
            .call(CreateBlobRequest {
                key_b64: STANDARD.encode(&share.wrapped_key),
                pubkey: self.key,
                file_name: name.clone(),
                iv_b64: STANDARD.encode(share.sealed.iv.as_bytes()),
            })
            .await?;

        upload_content(&mut client, created.kid, share.sealed.ciphertext).await?;

        Ok(format!(
            "Sent {} as blob {} ({} bytes)",
            name,
            created.kid,
            plaintext.len()
        ))
    }
}

/// The local public half of `kid` if we hold it, else the registry's copy
async fn recipient_key(
    keys: &KeyClient,
    client: &mut ApiClient,
    kid: &Kid,
) -> Result<ImportedKey, SendError> {
    if let Some(key) = keys.public_key(kid) {
        return Ok(key);
    }

    let response = client.call(DownloadKeyRequest { kid: *kid }).await?;
    let bytes = STANDARD
        .decode(&response.key_b64)
        .map_err(|e| SendError::Malformed(e.to_string()))?;
    Ok(parse_public_key(&bytes)?)
}

/// Upload the ciphertext, retrying once after a transport failure. A 404
///  on the retry means the first attempt already landed.
async fn upload_content(
    client: &mut ApiClient,
    kid: Kid,
    ciphertext: Vec<u8>,
) -> Result<(), ApiError> {
    let request = UploadBlobRequest { kid, ciphertext };
    match client.call(request.clone()).await {
        Ok(()) => Ok(()),
        Err(ApiError::Reqwest(e)) => {
            tracing::warn!("upload of blob {} failed, retrying: {}", kid, e);
            match client.call(request).await {
                Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(()),
                other => other,
            }
        }
        Err(e) => Err(e),
    }
}
