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

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ReserveRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub kid: Kid,
    pub reused: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Json(_req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, ReserveError> {
    let reservation = state
        .database()
        .reserve_kid(user.id(), state.reservation_cap())
        .await?;

    Ok(Json(ReserveResponse {
        kid: reservation.kid,
        reused: reservation.reused,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ReserveError {
    fn into_response(self) -> Response {
        match self {
            ReserveError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for ReserveRequest {
    type Response = ReserveResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .post(endpoint(base_url, "/api/v0/key/reserve"))
            .json(&self)
    }
}
