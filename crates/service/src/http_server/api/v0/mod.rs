use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::StatusCode;

pub mod blob;
pub mod key;

use crate::database::RegistryError;
use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/key", key::router(state.clone()))
        .nest("/blob", blob::router(state.clone()))
        .with_state(state)
}

/// Maps a registry failure onto its status. Database failures are logged
///  and answered without detail.
pub(crate) fn registry_error_response(error: RegistryError) -> Response {
    match error {
        RegistryError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()).into_response(),
        RegistryError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
        RegistryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        RegistryError::Database(e) => {
            tracing::error!("database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            )
                .into_response()
        }
    }
}

pub(crate) fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>, RegistryError> {
    STANDARD
        .decode(value)
        .map_err(|e| RegistryError::BadRequest(format!("{} is not valid base64: {}", field, e)))
}

pub(crate) fn encode_b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
