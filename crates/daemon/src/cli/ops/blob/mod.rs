use clap::{Args, Subcommand};

pub mod fetch;
pub mod manage;
pub mod send;

use crate::cli::op::Op;
use service::http_server::api::v0::blob::{DeleteBlobRequest, ListBlobsRequest, RenameBlobRequest};

crate::command_enum! {
    (Send, send::SendBlob),
    (Fetch, fetch::FetchBlob),
    (List, ListBlobsRequest),
    (Rename, RenameBlobRequest),
    (Delete, DeleteBlobRequest),
}

// Rename the generated Command to BlobCommand for clarity
pub type BlobCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Blob {
    #[command(subcommand)]
    pub command: BlobCommand,
}

#[async_trait::async_trait]
impl Op for Blob {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
