// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Blob, Daemon, Health, Init, Key, Version};

use jailbird_daemon::state::AppState;

command_enum! {
    (Init, Init),
    (Daemon, Daemon),
    (Health, Health),
    (Key, Key),
    (Blob, Blob),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Config is optional here; `init` runs before it exists
    let state = AppState::load(args.config_path.clone()).ok();

    // Resolve remote URL: explicit flag > config api_port > hardcoded 5001
    let remote = match cli::op::resolve_remote(args.remote, state.as_ref()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: Failed to resolve remote: {}", e);
            std::process::exit(1);
        }
    };
    let user = cli::op::resolve_user(args.user, state.as_ref());

    // Build context - always has API client initialized
    let ctx = match cli::op::OpContext::new(remote, user, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
