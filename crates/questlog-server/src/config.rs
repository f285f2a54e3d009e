use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use questlog_core::error::Result;
use questlog_core::storage::data_dir;

#[derive(Parser, Debug, Clone)]
#[command(name = "questlog-server", version, about = "Questlog REST backend")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "QUESTLOG_BIND", default_value = "127.0.0.1:7878")]
    pub bind: SocketAddr,

    /// SQLite database file (defaults to server.db in the data directory)
    #[arg(long, env = "QUESTLOG_DB")]
    pub database: Option<PathBuf>,
}

impl ServerArgs {
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("server.db")),
        }
    }
}
