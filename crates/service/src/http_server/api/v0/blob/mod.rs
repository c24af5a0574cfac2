use axum::routing::post;
use axum::Router;

use crate::ServiceState;

pub mod create;
pub mod delete;
pub mod download;
pub mod key;
pub mod list;
pub mod rename;
pub mod upload;

pub use create::{CreateBlobRequest, CreateBlobResponse};
pub use delete::{DeleteBlobRequest, DeleteBlobResponse};
pub use download::{DownloadBlobRequest, DownloadBlobResponse};
pub use key::{FetchKeyRequest, FetchKeyResponse};
pub use list::{ListBlobsRequest, ListBlobsResponse};
pub use rename::{RenameBlobRequest, RenameBlobResponse};
pub use upload::UploadBlobRequest;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .route("/:kid/content", post(upload::handler))
        .route("/key", post(key::handler))
        .route("/download", post(download::handler))
        .route("/rename", post(rename::handler))
        .route("/delete", post(delete::handler))
        .route("/list", post(list::handler))
        .with_state(state)
}
