use service::http_server::api::client::ApiError;
use service::http_server::api::v0::blob::{
    DeleteBlobRequest, DeleteBlobResponse, ListBlobsRequest, ListBlobsResponse, RenameBlobRequest,
    RenameBlobResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum BlobManageError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for ListBlobsRequest {
    type Error = BlobManageError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: ListBlobsResponse = client.call(self.clone()).await?;

        if response.blobs.is_empty() {
            return Ok("No blobs found".to_string());
        }
        Ok(response
            .blobs
            .iter()
            .map(|blob| format!("{} {} [{}]", blob.kid, blob.name, blob.state))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for RenameBlobRequest {
    type Error = BlobManageError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: RenameBlobResponse = client.call(self.clone()).await?;
        Ok(format!("Blob {} renamed to {}", self.kid, response.new_name))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for DeleteBlobRequest {
    type Error = BlobManageError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: DeleteBlobResponse = client.call(self.clone()).await?;
        if response.deleted {
            Ok(format!("Blob {} deleted", self.kid))
        } else {
            Ok(format!("Blob {} was not deleted", self.kid))
        }
    }
}
