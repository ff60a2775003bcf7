//! Scan command - load a resource root and summarize it.

use std::path::PathBuf;

use resrepo::{ResourceRepository, ResourceType};
use serde_json::json;

use super::common::{load_config, open_repository, print_json, RepoOptions};
use super::finish;
use crate::error::CliError;

/// Arguments for the scan command.
pub struct ScanArgs {
    pub root: PathBuf,
    pub json: bool,
    pub repo: RepoOptions,
}

/// Run the scan command.
pub async fn run(args: ScanArgs) -> Result<(), CliError> {
    let config = load_config(&args.repo)?;
    let repo = open_repository(&args.root, config).await?;
    let stats = repo.stats();
    let table = repo.table();

    let types: Vec<(ResourceType, usize)> = repo
        .available_types()
        .into_iter()
        .map(|t| (t, repo.items_of_type(t).len()))
        .collect();
    let languages: Vec<String> = repo.languages().into_iter().collect();
    let errors = repo.errors();

    if args.json {
        let value = json!({
            "root": repo.root().display().to_string(),
            "sources": table.source_count(),
            "items": table.item_count(),
            "types": types
                .iter()
                .map(|(t, n)| (t.name().to_string(), json!(n)))
                .collect::<serde_json::Map<_, _>>(),
            "languages": languages,
            "files_loaded_initially": stats.files_loaded_initially,
            "files_loaded_from_sources": stats.files_loaded_from_sources,
            "fresh_cache": stats.has_fresh_file_cache,
            "needs_full_rescan": repo.needs_full_rescan(),
            "errors": errors
                .iter()
                .map(|e| json!({
                    "path": e.path.display().to_string(),
                    "line": e.line,
                    "message": e.message,
                }))
                .collect::<Vec<_>>(),
        });
        print_json(&value, true)?;
    } else {
        println!("Resource root: {}", repo.root().display());
        println!("  Sources: {}", table.source_count());
        println!("  Items:   {}", table.item_count());
        println!(
            "  Parsed:  {} of {} files ({})",
            stats.files_loaded_from_sources,
            stats.files_loaded_initially,
            if stats.has_fresh_file_cache {
                "cache fresh"
            } else {
                "cache stale or missing"
            }
        );
        if !languages.is_empty() {
            println!("  Languages: {}", languages.join(", "));
        }
        println!();
        for (resource_type, count) in &types {
            println!("  {:<14} {}", resource_type.name(), count);
        }
        if !errors.is_empty() {
            println!();
            println!("{} file(s) had errors:", errors.len());
            for error in &errors {
                println!("  {}:{}: {}", error.path.display(), error.line, error.message);
            }
        }
    }

    finish(&repo).await;
    Ok(())
}
