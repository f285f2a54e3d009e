use clap::Subcommand;
use questlog_core::{Config, SyncClient};

use super::{block_on, CommandResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Create an account on the server and enable sync
    Register {
        username: String,
        /// Server base URL (defaults to the configured one)
        #[arg(long)]
        server: Option<String>,
    },
    /// Show whether sync is configured
    Status,
}

pub fn run(action: SyncAction) -> CommandResult {
    let mut config = Config::load()?;

    match action {
        SyncAction::Register { username, server } => {
            if let Some(server) = server {
                config.sync.server_url = server;
            }
            let client = SyncClient::new(&config.sync.server_url, String::new())?;
            let user = block_on(client.register(&username))??;
            config.sync.user_id = user.id.clone();
            config.sync.enabled = true;
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        SyncAction::Status => {
            let status = serde_json::json!({
                "active": config.sync.is_active(),
                "server_url": config.sync.server_url,
                "user_id": config.sync.user_id,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
