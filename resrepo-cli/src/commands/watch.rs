//! Watch command - keep a repository in sync with the file system and report
//! every table change until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use resrepo::{ChangeSource, FsWatcher, ResourceRepository};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{load_config, open_repository, RepoOptions};
use super::finish;
use crate::error::CliError;

/// How often the table generation is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Arguments for the watch command.
pub struct WatchArgs {
    pub root: PathBuf,
    pub repo: RepoOptions,
}

/// Run the watch command.
pub async fn run(args: WatchArgs) -> Result<(), CliError> {
    let config = load_config(&args.repo)?;
    let repo = open_repository(&args.root, config).await?;

    let mut watcher = FsWatcher::start(repo.root())?;
    let listener = match watcher.take_events() {
        Some(rx) => repo.listen(rx),
        None => return Err(CliError::Config("watcher events already taken".to_string())),
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_cancel.cancel(),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    println!("Watching {} (Ctrl-C to stop)", repo.root().display());
    let mut last_generation = repo.generation();
    let mut interval = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = interval.tick() => {
                let generation = repo.generation();
                if generation != last_generation {
                    let stats = repo.stats();
                    println!(
                        "generation {} ({} rescans, {} edits, {} pending)",
                        generation,
                        stats.file_rescans,
                        stats.document_edits,
                        repo.pending_scans()
                    );
                    last_generation = generation;
                }
            }
        }
    }

    info!("Stopping watcher");
    finish(&repo).await;
    let _ = listener.await;
    Ok(())
}
