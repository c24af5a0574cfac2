use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::super::registry_error_response;
use crate::database::{BlobSummary, RegistryError};
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListBlobsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBlobsResponse {
    pub blobs: Vec<BlobSummary>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(_req): Json<ListBlobsRequest>,
) -> Result<impl IntoResponse, ListBlobsError> {
    let blobs = state.database().list_blobs(user.id()).await?;
    Ok(Json(ListBlobsResponse { blobs }))
}

#[derive(Debug, thiserror::Error)]
pub enum ListBlobsError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ListBlobsError {
    fn into_response(self) -> Response {
        match self {
            ListBlobsError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for ListBlobsRequest {
    type Response = ListBlobsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/blob/list"))
            .json(&self)
    }
}
