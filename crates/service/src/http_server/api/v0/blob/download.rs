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
pub struct DownloadBlobRequest {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadBlobResponse {
    pub kid: Kid,
    pub name: String,
    pub iv_b64: String,
    pub data_b64: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<DownloadBlobRequest>,
) -> Result<impl IntoResponse, DownloadBlobError> {
    let blob = state.database().fetch_blob(&req.kid, user.id()).await?;
    Ok(Json(DownloadBlobResponse {
        kid: blob.kid,
        name: blob.name,
        iv_b64: encode_b64(&blob.iv),
        data_b64: encode_b64(&blob.ciphertext),
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadBlobError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for DownloadBlobError {
    fn into_response(self) -> Response {
        match self {
            DownloadBlobError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for DownloadBlobRequest {
    type Response = DownloadBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/blob/download"))
            .json(&self)
    }
}
