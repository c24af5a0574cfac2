use clap::{Args, Subcommand};

pub mod delete;
pub mod export;
pub mod fetch;
pub mod fingerprint;
pub mod generate;
pub mod import;
pub mod list;
pub mod publish;
pub mod remote;
pub mod rename;

use crate::cli::op::Op;
use service::http_server::api::v0::key::{
    DeleteKeyRequest, ListKeysRequest, RenameKeyRequest, ReserveRequest,
};

crate::command_enum! {
    (Generate, generate::Generate),
    (List, list::List),
    (Import, import::Import),
    (Export, export::Export),
    (Fingerprint, fingerprint::Fingerprint),
    (Rename, rename::Rename),
    (Delete, delete::Delete),
    (Reserve, ReserveRequest),
    (Publish, publish::Publish),
    (Fetch, fetch::Fetch),
    (RemoteList, ListKeysRequest),
    (RemoteRename, RenameKeyRequest),
    (RemoteDelete, DeleteKeyRequest),
}

// Rename the generated Command to KeyCommand for clarity
pub type KeyCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Key {
    #[command(subcommand)]
    pub command: KeyCommand,
}

#[async_trait::async_trait]
impl Op for Key {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
