//! Cache command - write or clear the persistent cache of a resource root.

use std::path::PathBuf;

use super::common::{load_config, open_repository, RepoOptions};
use super::finish;
use crate::error::CliError;

/// Arguments for the cache command.
pub struct CacheArgs {
    pub root: PathBuf,
    pub clear: bool,
    pub repo: RepoOptions,
}

/// Run the cache command.
pub async fn run(args: CacheArgs) -> Result<(), CliError> {
    let config = load_config(&args.repo)?;
    let root = std::fs::canonicalize(&args.root)
        .map_err(|e| CliError::Repository(e.into()))?;
    let Some(cache_file) = config.cache_file_for(&root) else {
        return Err(CliError::Config(
            "Persistent cache is disabled or no cache directory is available".to_string(),
        ));
    };

    if args.clear {
        return match std::fs::remove_file(&cache_file) {
            Ok(()) => {
                println!("Removed {}", cache_file.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                println!("No cache at {}", cache_file.display());
                Ok(())
            }
            Err(source) => Err(CliError::CacheClear {
                path: cache_file,
                source,
            }),
        };
    }

    let repo = open_repository(&root, config).await?;
    let stats = repo.stats();
    // The background write from open() must land before ours.
    repo.flush_cache_writes().await;
    repo.write_cache()?;
    finish(&repo).await;

    println!("Cache: {}", cache_file.display());
    println!(
        "  {} parsable file(s), {} parsed from source",
        stats.files_loaded_initially, stats.files_loaded_from_sources
    );
    Ok(())
}
