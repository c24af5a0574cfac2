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
pub struct DeleteBlobRequest {
    #[arg(long)]
    pub kid: Kid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBlobResponse {
    pub deleted: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(req): Json<DeleteBlobRequest>,
) -> Result<impl IntoResponse, DeleteBlobError> {
    state.database().delete_blob(&req.kid, user.id()).await?;
    Ok(Json(DeleteBlobResponse { deleted: true }))
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteBlobError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for DeleteBlobError {
    fn into_response(self) -> Response {
        match self {
            DeleteBlobError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for DeleteBlobRequest {
    type Response = DeleteBlobResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/blob/delete"))
            .json(&self)
    }
}
