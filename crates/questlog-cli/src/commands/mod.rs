pub mod config;
pub mod reward;
pub mod stats;
pub mod sync;

use std::future::Future;

use questlog_core::error::Result;
use questlog_core::{
    Config, CoreError, LocalDb, LocalStatsStore, ProgressTracker, ProgressionState, SyncClient,
};
use tracing::{debug, info, warn};

pub type CommandResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// The device's tracker, with the configured message window.
pub(crate) fn open_tracker(config: &Config) -> Result<ProgressTracker<LocalStatsStore>> {
    let tracker = ProgressTracker::load(LocalStatsStore::new(LocalDb::open()?))?;
    Ok(tracker.with_message_ttl(config.display.message_ttl_secs))
}

/// Drive one request on a throwaway current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub(crate) fn sync_client(config: &Config) -> Result<SyncClient> {
    if !config.sync.is_active() {
        return Err(CoreError::Sync(
            "sync is not configured (see `questlog sync register`)".into(),
        ));
    }
    SyncClient::from_config(&config.sync)
}

/// Push after a local change. Failures are logged and otherwise ignored.
pub(crate) fn push_best_effort(config: &Config, state: &ProgressionState) {
    if !config.sync.is_active() {
        debug!("sync disabled, not pushing");
        return;
    }
    let pushed = sync_client(config).and_then(|client| block_on(client.push_stats(state))?);
    match pushed {
        Ok(stored) => info!(level = stored.level, "stats pushed"),
        Err(e) => warn!("could not push stats: {e}"),
    }
}
