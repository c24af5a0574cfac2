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
pub struct RenameBlobRequest {
    #[arg(long)]
    pub kid: Kid,

    #[arg(long)]
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameBlobResponse {
    pub new_name: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<RenameBlobRequest>,
) -> Result<impl IntoResponse, RenameBlobError> {
    let new_name = state
        .database()
        .rename_blob(&req.kid, user.id(), &req.new_name)
        .await?;
    Ok(Json(RenameBlobResponse { new_name }))
}

#[derive(Debug, thiserror::Error)]
pub enum RenameBlobError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for RenameBlobError {
    fn into_response(self) -> Response {
        match self {
            RenameBlobError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for RenameBlobRequest {
    type Response = RenameBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/blob/rename"))
            .json(&self)
    }
}
