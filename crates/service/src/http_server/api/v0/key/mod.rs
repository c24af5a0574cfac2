use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod delete;
pub mod download;
pub mod list;
pub mod rename;
pub mod reserve;
pub mod upload;

pub use delete::{DeleteKeyRequest, DeleteKeyResponse};
pub use download::{DownloadKeyRequest, DownloadKeyResponse};
pub use list::{ListKeysRequest, ListKeysResponse};
pub use rename::{RenameKeyRequest, RenameKeyResponse};
pub use reserve::{ReserveRequest, ReserveResponse};
pub use upload::{UploadKeyRequest, UploadKeyResponse};

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(upload::handler))
        .route("/reserve", post(reserve::handler))
        .route("/download", post(download::handler))
        .route("/delete", post(delete::handler))
        .route("/rename", post(rename::handler))
        .route("/list", post(list::handler))
        .with_state(state)
}
