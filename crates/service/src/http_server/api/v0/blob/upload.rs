use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Url};

use common::kid::Kid;

use super::super::registry_error_response;
use crate::database::RegistryError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::AuthenticatedUser;
use crate::ServiceState;

const FILE_FIELD: &str = "file";

/// Ciphertext for a blob created earlier, sent as the `file` field of a
///  multipart body
#[derive(Debug, Clone)]
pub struct UploadBlobRequest {
    pub kid: Kid,
    pub ciphertext: Vec<u8>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    user: AuthenticatedUser,
    Path(kid): Path<Kid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, UploadBlobError> {
    let mut ciphertext = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart parsing error: {}", e);
        UploadBlobError::MultipartError(e.to_string())
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != FILE_FIELD {
            tracing::warn!("Ignoring unknown field: {}", field_name);
            continue;
        }
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Error reading file data for blob {}: {}", kid, e);
            UploadBlobError::MultipartError(e.to_string())
        })?;
        ciphertext = Some(data);
    }

    let ciphertext = ciphertext.ok_or(UploadBlobError::MissingFile)?;
    state
        .database()
        .complete_upload(&kid, user.id(), &ciphertext)
        .await?;

    Ok(http::StatusCode::NO_CONTENT)
}

#[derive(Debug, thiserror::Error)]
pub enum UploadBlobError {
    #[error("Multipart error: {0}")]
    MultipartError(String),
    #[error("a '{}' field is required", FILE_FIELD)]
    MissingFile,
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl IntoResponse for UploadBlobError {
    fn into_response(self) -> Response {
        match self {
            UploadBlobError::MultipartError(_) | UploadBlobError::MissingFile => {
                (http::StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            UploadBlobError::Registry(e) => registry_error_response(e),
        }
    }
}

impl ApiRequest for UploadBlobRequest {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let part = Part::bytes(self.ciphertext).file_name(self.kid.to_string());
        let form = Form::new().part(FILE_FIELD, part);
        client
            .post(endpoint(base_url, &format!("/api/v0/blob/{}/content", self.kid)))
            .multipart(form)
    }
}
