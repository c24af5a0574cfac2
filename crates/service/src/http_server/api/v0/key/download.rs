use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::kid::Kid;

use super::super::{encode_b64, registry_error_response};
use crate::database::RegistryError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DownloadKeyRequest {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadKeyResponse {
    pub kid: Kid,
    pub key_b64: String,
}

/// Any authenticated user may fetch any public key
pub async fn handler(
    State(state): State<ServiceState>,
    _user: AuthenticatedUser,
    Json(req): Json<DownloadKeyRequest>,
) -> Result<impl IntoResponse, DownloadKeyError> {
    let key = state.database().download_public_key(&req.kid).await?;
    Ok(Json(DownloadKeyResponse {
        kid: req.kid,
        key_b64: encode_b64(&key),
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadKeyError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for DownloadKeyError {
    fn into_response(self) -> Response {
        match self {
            DownloadKeyError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for DownloadKeyRequest {
    type Response = DownloadKeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/key/download"))
            .json(&self)
    }
}
