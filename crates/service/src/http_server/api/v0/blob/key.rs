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
pub struct FetchKeyRequest {
    /// The blob whose symmetric key to fetch
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchKeyResponse {
    pub key_b64: String,
    pub pubkey: Kid,
}

/// The wrapped symmetric key, only for the owner of the wrapping key
pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<FetchKeyRequest>,
) -> Result<impl IntoResponse, FetchKeyError> {
    let wrapped = state
        .database()
        .fetch_wrapped_key(&req.kid, user.id())
        .await?;
    Ok(Json(FetchKeyResponse {
        key_b64: encode_b64(&wrapped.wrapped_key),
        pubkey: wrapped.public_key_kid,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchKeyError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for FetchKeyError {
    fn into_response(self) -> Response {
        match self {
            FetchKeyError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for FetchKeyRequest {
    type Response = FetchKeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/blob/key"))
            .json(&self)
    }
}
