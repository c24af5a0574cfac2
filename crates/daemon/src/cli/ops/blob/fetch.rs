use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;

use common::client::ClientError;
use common::crypto::Iv;
use common::kid::Kid;
use jailbird_daemon::state::StateError;
use service::http_server::api::client::ApiError;
use service::http_server::api::v0::blob::{DownloadBlobRequest, FetchKeyRequest};

/// Download a blob and decrypt it with a local private key
#[derive(Args, Debug, Clone)]
pub struct FetchBlob {
    #[arg(long)]
    pub kid: Kid,

    /// Where to write the plaintext (defaults to the blob's name)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("registry served malformed {0}: {1}")]
    Malformed(&'static str, String),
    #[error("blob name {0:?} is not a usable file name, pass --out")]
    UnsafeName(String),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("key error: {0}")]
    Key(#[from] ClientError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for FetchBlob {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let wrapped = client.call(FetchKeyRequest { kid: self.kid }).await?;
        let blob = client.call(DownloadBlobRequest { kid: self.kid }).await?;

        let wrapped_key = decode("wrapped key", &wrapped.key_b64)?;
        let iv = decode("iv", &blob.iv_b64)?;
        let iv = Iv::try_from(iv.as_slice())
            .map_err(|e| FetchError::Malformed("iv", e.to_string()))?;
        let ciphertext = decode("blob", &blob.data_b64)?;

        let keys = ctx.state()?.key_client().await?;
        let plaintext = keys.open(&wrapped.pubkey, &wrapped_key, &iv, &ciphertext)?;

        let out = match &self.out {
            Some(out) => out.clone(),
            None => local_file_name(&blob.name)?,
        };
        tokio::fs::write(&out, &plaintext)
            .await
            .map_err(|e| FetchError::Write(out.clone(), e))?;

        Ok(format!(
            "Fetched blob {} to {} ({} bytes)",
            self.kid,
            out.display(),
            plaintext.len()
        ))
    }
}

/// The last component of a server-chosen name. Directories in it are
///  never followed.
fn local_file_name(name: &str) -> Result<PathBuf, FetchError> {
    Path::new(name)
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| FetchError::UnsafeName(name.to_string()))
}

fn decode(what: &'static str, value: &str) -> Result<Vec<u8>, FetchError> {
    STANDARD
        .decode(value)
        .map_err(|e| FetchError::Malformed(what, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_name_drops_directories() {
        assert_eq!(local_file_name("notes.txt").unwrap(), PathBuf::from("notes.txt"));
        assert_eq!(local_file_name("../../.bashrc").unwrap(), PathBuf::from(".bashrc"));
        assert_eq!(local_file_name("/etc/passwd").unwrap(), PathBuf::from("passwd"));
        assert_eq!(local_file_name("a/b/c.pdf").unwrap(), PathBuf::from("c.pdf"));
    }

    #[test]
    fn test_local_file_name_rejects_bare_directories() {
        for name in ["..", "/", "foo/..", ""] {
            assert!(
                matches!(local_file_name(name), Err(FetchError::UnsafeName(_))),
                "{}",
                name
            );
        }
    }
}
