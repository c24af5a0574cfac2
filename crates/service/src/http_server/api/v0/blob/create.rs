use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::kid::Kid;

use super::super::{decode_b64, registry_error_response};
use crate::database::RegistryError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlobRequest {
    /// Base64 of the symmetric key, wrapped under `pubkey`
    pub key_b64: String,
    /// One of the caller's uploaded public keys
    pub pubkey: Kid,
    pub file_name: String,
    pub iv_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlobResponse {
    pub kid: Kid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<CreateBlobRequest>,
) -> Result<impl IntoResponse, CreateBlobError> {
    let wrapped_key = decode_b64("key_b64", &req.key_b64)?;
    let iv = decode_b64("iv_b64", &req.iv_b64)?;

    let kid = state
        .database()
        .begin_upload(user.id(), &req.pubkey, &req.file_name, &iv, &wrapped_key)
        .await?;

    Ok((http::StatusCode::CREATED, Json(CreateBlobResponse { kid })))
}

#[derive(Debug, thiserror::Error)]
pub enum CreateBlobError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for CreateBlobError {
    fn into_response(self) -> Response {
        match self {
            CreateBlobError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for CreateBlobRequest {
    type Response = CreateBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, "/api/v0/blob")).json(&self)
    }
}
