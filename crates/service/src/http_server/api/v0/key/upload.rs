use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::client::parse_public_key;
use common::kid::Kid;

use super::super::{decode_b64, registry_error_response};
use crate::database::RegistryError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct UploadKeyRequest {
    /// A KID previously reserved by the caller
    #[arg(long)]
    pub kid: Kid,

    #[arg(long)]
    pub name: String,

    /// Base64 of the serialized public key
    #[arg(long)]
    pub key_b64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadKeyResponse {
    pub kid: Kid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<UploadKeyRequest>,
) -> Result<impl IntoResponse, UploadKeyError> {
    let key = decode_b64("key_b64", &req.key_b64)?;

    // Only well formed public keys, stored under their own kid
    let parsed =
        parse_public_key(&key).map_err(|e| UploadKeyError::InvalidKey(e.to_string()))?;
    if parsed.kid != req.kid {
        return Err(UploadKeyError::InvalidKey(format!(
            "key carries kid {}, uploaded as {}",
            parsed.kid, req.kid
        )));
    }

    let kid = state
        .database()
        .upload_public_key(&req.kid, &req.name, user.id(), &key)
        .await?;

    Ok((http::StatusCode::CREATED, Json(UploadKeyResponse { kid })))
}

#[derive(Debug, thiserror::Error)]
pub enum UploadKeyError {
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for UploadKeyError {
    fn into_response(self) -> Response {
        match self {
            UploadKeyError::InvalidKey(msg) => {
                tracing::warn!("rejected public key upload: {}", msg);
                (http::StatusCode::BAD_REQUEST, format!("Invalid key: {}", msg)).into_response()
            }
            UploadKeyError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for UploadKeyRequest {
    type Response = UploadKeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(base_url, "/api/v0/key")).json(&self)
    }
}
