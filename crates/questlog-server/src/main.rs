use std::sync::Arc;

use clap::Parser;
use questlog_core::Database;
use questlog_server::{run, AppState, ServerArgs};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();
    if let Err(e) = serve(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn serve(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open_at(&path)?;
    info!("  Database: {}", path.display());

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    run(listener, Arc::new(AppState::new(db))).await?;
    Ok(())
}
