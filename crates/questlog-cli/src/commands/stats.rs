use clap::Subcommand;
use questlog_core::Config;

use super::{block_on, open_tracker, push_best_effort, sync_client, CommandResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print the local progression state
    Show,
    /// Start over at level 1
    Reset,
    /// Overwrite the server's copy with the local one
    Push,
    /// Overwrite the local copy with the server's
    Pull,
}

pub fn run(action: StatsAction) -> CommandResult {
    let config = Config::load()?;
    let mut tracker = open_tracker(&config)?;

    match action {
        StatsAction::Show => {
            println!("{}", serde_json::to_string_pretty(tracker.state())?);
        }
        StatsAction::Reset => {
            tracker.reset()?;
            println!("{}", serde_json::to_string_pretty(tracker.state())?);
            push_best_effort(&config, tracker.state());
        }
        StatsAction::Push => {
            let client = sync_client(&config)?;
            let stored = block_on(client.push_stats(tracker.state()))??;
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        StatsAction::Pull => {
            let client = sync_client(&config)?;
            let remote = block_on(client.pull_stats())??;
            tracker.overwrite(remote)?;
            println!("{}", serde_json::to_string_pretty(tracker.state())?);
        }
    }
    Ok(())
}
