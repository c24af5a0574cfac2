use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::kid::Kid;

use super::super::registry_error_response;
use crate::database::RegistryError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct DeleteKeyRequest {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteKeyResponse {
    pub kid: Kid,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<DeleteKeyRequest>,
) -> Result<impl IntoResponse, DeleteKeyError> {
    let kid = state
        .database()
        .delete_public_key(&req.kid, user.id())
        .await?;
    Ok(Json(DeleteKeyResponse { kid }))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteKeyError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for DeleteKeyError {
    fn into_response(self) -> Response {
        match self {
            DeleteKeyError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for DeleteKeyRequest {
    type Response = DeleteKeyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/key/delete"))
            .json(&self)
    }
}
