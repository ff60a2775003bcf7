//! CLI command implementations.

pub mod cache;
pub mod common;
pub mod list;
pub mod resolve;
pub mod scan;
pub mod watch;

use resrepo::ResourceFolderRepository;

/// Let background cache writes land, then stop the update worker.
pub async fn finish(repo: &ResourceFolderRepository) {
    repo.wait_for_pending_updates().await;
    repo.flush_cache_writes().await;
    repo.shutdown();
}
