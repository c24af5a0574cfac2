use service::http_server::api::client::ApiError;
use service::http_server::api::v0::key::{
    DeleteKeyRequest, DeleteKeyResponse, ListKeysRequest, ListKeysResponse, RenameKeyRequest,
    RenameKeyResponse, ReserveRequest, ReserveResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum RemoteKeyError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for ListKeysRequest {
    type Error = RemoteKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: ListKeysResponse = client.call(self.clone()).await?;

        if response.keys.is_empty() {
            return Ok("No published keys".to_string());
        }
        Ok(response
            .keys
            .iter()
            .map(|key| format!("{} {}", key.kid, key.name))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for RenameKeyRequest {
    type Error = RemoteKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: RenameKeyResponse = client.call(self.clone()).await?;
        Ok(format!("Published key {} renamed to {}", self.kid, response.new_name))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for DeleteKeyRequest {
    type Error = RemoteKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: DeleteKeyResponse = client.call(self.clone()).await?;
        Ok(format!("Published key {} deleted", response.kid))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for ReserveRequest {
    type Error = RemoteKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: ReserveResponse = client.call(self.clone()).await?;
        let how = if response.reused { "reused" } else { "new" };
        Ok(format!("Reserved {} ({})", response.kid, how))
    }
}
