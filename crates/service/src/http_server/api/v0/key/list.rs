use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::super::registry_error_response;
use crate::database::{PublicKeySummary, RegistryError};
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListKeysRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListKeysResponse {
    pub keys: Vec<PublicKeySummary>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(_req): Json<ListKeysRequest>,
) -> Result<impl IntoResponse, ListKeysError> {
    let keys = state.database().list_public_keys(user.id()).await?;
    Ok(Json(ListKeysResponse { keys }))
}

#[derive(Debug, thiserror::Error)]
pub enum ListKeysError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ListKeysError {
    fn into_response(self) -> Response {
        match self {
            ListKeysError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for ListKeysRequest {
    type Response = ListKeysResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/key/list"))
            .json(&self)
    }
}
