pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "jailbird")]
#[command(about = "End-to-end encrypted file sharing")]
pub struct Args {
    /// API server to talk to (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Identity to act as (defaults to `user` from config.toml)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Path to the jailbird config directory (defaults to ~/.jailbird)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
