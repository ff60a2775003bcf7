//! Initial scan of a resource root.
//!
//! ```text
//! collect_files ──► parse_files (rayon, cache lookups) ──► commit_all (one lock)
//! ```
//!
//! Collecting and parsing happen without the table lock. Files are then
//! committed sorted by (configuration, path), so the default configuration's
//! sources come first and insertion order is independent of directory
//! listing order.

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::{CacheLoadStats, ResourceCache};
use crate::configuration::{FolderConfigCache, FolderConfiguration};
use crate::markup::MarkupParser;
use crate::repository::table::{CommitResult, TableState};
use crate::resource::ResourceFolderType;
use crate::source::{
    is_candidate_file, is_parsable_file, parse_source, FileStamp, ParseOutcome, ScanContext,
    ScanError,
};

/// A file found under a valid resource folder.
#[derive(Debug, Clone)]
pub(crate) struct ScannedFile {
    pub(crate) path: PathBuf,
    pub(crate) folder_type: ResourceFolderType,
    pub(crate) configuration: Arc<FolderConfiguration>,
}

/// A scanned file with its parse result.
#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub(crate) file: ScannedFile,
    pub(crate) outcome: ParseOutcome,
}

/// Files of every valid folder directly under `root`.
pub(crate) fn collect_files(
    root: &Path,
    configs: &FolderConfigCache,
    ignore_hidden: bool,
) -> io::Result<Vec<ScannedFile>> {
    let mut files = Vec::new();
    for dir in sorted_entries(root)? {
        if !dir.is_dir() {
            continue;
        }
        let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if ignore_hidden && dir_name.starts_with('.') {
            continue;
        }
        files.extend(collect_folder(&dir, configs)?);
    }
    Ok(files)
}

/// Files of one folder; empty if the folder name is not a valid resource
/// folder.
pub(crate) fn collect_folder(dir: &Path, configs: &FolderConfigCache) -> io::Result<Vec<ScannedFile>> {
    let Some((folder_type, configuration)) = dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| configs.get(name))
    else {
        debug!(dir = %dir.display(), "Skipping invalid resource folder");
        return Ok(Vec::new());
    };

    let files = sorted_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_candidate_file(folder_type, p))
        .map(|path| ScannedFile {
            path,
            folder_type,
            configuration: Arc::clone(&configuration),
        })
        .collect();
    Ok(files)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

/// Parse `files`, taking parsable files from `cache` when their stamps
/// still match.
pub(crate) fn parse_files(
    files: Vec<ScannedFile>,
    parser: &dyn MarkupParser,
    cache: Option<&ResourceCache>,
    parallel: bool,
) -> (Vec<ParsedFile>, CacheLoadStats) {
    let parse_one = |file: ScannedFile| parse_file(file, parser, cache);
    let results: Vec<(ParsedFile, Option<bool>)> = if parallel {
        files.into_par_iter().filter_map(parse_one).collect()
    } else {
        files.into_iter().filter_map(parse_one).collect()
    };

    let mut stats = CacheLoadStats::default();
    let mut parsed = Vec::with_capacity(results.len());
    for (file, hit) in results {
        match hit {
            Some(true) => {
                stats.parsable_files += 1;
                stats.hits += 1;
            }
            Some(false) => {
                stats.parsable_files += 1;
                stats.misses += 1;
            }
            None => {}
        }
        parsed.push(file);
    }
    (parsed, stats)
}

/// Parse one file. The flag is `Some(hit)` for parsable files, `None`
/// otherwise. Files that vanished since listing are dropped.
fn parse_file(
    file: ScannedFile,
    parser: &dyn MarkupParser,
    cache: Option<&ResourceCache>,
) -> Option<(ParsedFile, Option<bool>)> {
    let parsable = is_parsable_file(file.folder_type, &file.path);

    if parsable {
        if let (Some(cache), Ok(stamp)) = (cache, FileStamp::read(&file.path)) {
            if let Some(entry) = cache.lookup(&file.path, &stamp) {
                trace!(path = %file.path.display(), "Cache hit");
                let outcome = ParseOutcome {
                    kind: Some(entry.kind.clone()),
                    stamp: Some(stamp),
                    errors: Vec::new(),
                    needs_full_rescan: false,
                };
                return Some((ParsedFile { file, outcome }, Some(true)));
            }
        }
    }

    let outcome = match parse_source(&file.path, file.folder_type, &file.configuration, parser) {
        Ok(Some(outcome)) => outcome,
        Ok(None) => return None,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => ParseOutcome {
            kind: None,
            stamp: None,
            errors: vec![ScanError {
                path: file.path.clone(),
                line: 0,
                message: e.to_string(),
            }],
            needs_full_rescan: false,
        },
    };
    let hit = parsable.then_some(false);
    Some((ParsedFile { file, outcome }, hit))
}

/// Commit parsed files in (configuration, path) order. Returns how many
/// sources were added or updated.
pub(crate) fn commit_all(
    state: &mut TableState,
    mut parsed: Vec<ParsedFile>,
    ctx: &mut ScanContext,
) -> usize {
    parsed.sort_by(|a, b| {
        a.file
            .configuration
            .cmp(&b.file.configuration)
            .then_with(|| a.file.path.cmp(&b.file.path))
    });

    let mut committed = 0;
    for ParsedFile { file, outcome } in parsed {
        state.ensure_folder(
            file.path.parent().unwrap_or(Path::new("")),
            file.folder_type,
            Arc::clone(&file.configuration),
        );
        match state.commit_parse(&file.path, file.folder_type, file.configuration, outcome, ctx) {
            CommitResult::Added(_) | CommitResult::Updated(..) => committed += 1,
            CommitResult::Removed(_) | CommitResult::Ignored => {}
        }
    }
    committed
}
