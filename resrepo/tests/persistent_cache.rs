//! Integration tests for the persistent resource cache.
//!
//! These tests verify:
//! - A cache written after a cold open makes the next open fresh
//! - Files changed since the cache was written are parsed again
//! - Header mismatches and corrupt files fall back to a full parse
//! - Files with errors and unsaved edits are never served from the cache
//!
//! Run with: `cargo test --test persistent_cache`

mod common;

use std::fs;

use filetime::FileTime;

use common::{app_name_tree, config, ResTree};
use resrepo::{
    ChangeTarget, DocumentChange, EditDisposition, RepositoryConfig, ResourceFolderRepository,
    ResourceRepository, ResourceType,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Open, wait for the background cache write, shut down.
async fn warm(tree: &ResTree, config: RepositoryConfig) -> ResourceFolderRepository {
    let repo = ResourceFolderRepository::open(tree.root(), config).await.unwrap();
    repo.flush_cache_writes().await;
    repo.shutdown();
    repo
}

fn set_mtime(path: &std::path::Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

fn full_tree() -> ResTree {
    let tree = app_name_tree();
    tree.write("layout/main.xml", r#"<LinearLayout android:id="@+id/root"/>"#);
    tree.write("drawable-hdpi/icon.png", "png");
    tree
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_cold_open_writes_cache() {
    let tree = full_tree();
    let repo = warm(&tree, tree.cached_config()).await;

    assert!(!repo.has_fresh_file_cache());
    assert_eq!(repo.files_loaded_initially(), 3);
    assert_eq!(repo.files_loaded_from_sources(), 3);
    let cache_file = tree.cached_config().cache_file_for(&tree.root()).unwrap();
    assert!(cache_file.exists());
}

#[tokio::test]
async fn test_warm_open_uses_cache() {
    let tree = full_tree();
    let cold = warm(&tree, tree.cached_config()).await;

    let repo = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert!(repo.has_fresh_file_cache());
    assert_eq!(repo.files_loaded_initially(), 3);
    assert_eq!(repo.files_loaded_from_sources(), 0);

    for target in ["", "fr", "fr-rCA-hdpi", "de-xxhdpi"] {
        let target = config(target);
        assert_eq!(cold.configured_resources(&target), repo.configured_resources(&target));
    }
    assert!(repo.has_resource_item(ResourceType::Id, "root"));
    assert!(repo.has_resource_item(ResourceType::Drawable, "icon"));
    repo.shutdown();
}

#[tokio::test]
async fn test_changed_file_is_parsed_again() {
    let tree = full_tree();
    warm(&tree, tree.cached_config()).await;

    let fr = tree.write_strings("values-fr/strings.xml", &[("app_name", "Nouveau")]);
    set_mtime(&fr, 1_700_000_000);

    let repo = warm(&tree, tree.cached_config()).await;
    // One miss out of three parsable files is over the threshold.
    assert!(!repo.has_fresh_file_cache());
    assert_eq!(repo.files_loaded_from_sources(), 1);
    let resolved = repo
        .resolve(ResourceType::String, "app_name", &config("fr"))
        .unwrap();
    assert_eq!(resolved.value.text(), Some("Nouveau"));

    // The rewritten cache covers the change.
    let again = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert!(again.has_fresh_file_cache());
    assert_eq!(again.files_loaded_from_sources(), 0);
    again.shutdown();
}

#[tokio::test]
async fn test_few_misses_keep_cache_fresh() {
    let tree = ResTree::new();
    for i in 0..30 {
        tree.write_strings(&format!("values/s{:02}.xml", i), &[(&format!("s{}", i), "v")]);
    }
    warm(&tree, tree.cached_config()).await;

    let changed = tree.write_strings("values/s07.xml", &[("s7", "changed")]);
    set_mtime(&changed, 1_600_000_000);

    let repo = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert_eq!(repo.files_loaded_initially(), 30);
    assert_eq!(repo.files_loaded_from_sources(), 1);
    assert!(repo.has_fresh_file_cache());
    let resolved = repo.resolve(ResourceType::String, "s7", &config("")).unwrap();
    assert_eq!(resolved.value.text(), Some("changed"));
    repo.shutdown();
}

#[tokio::test]
async fn test_code_version_mismatch_discards_cache() {
    let tree = full_tree();
    warm(&tree, tree.cached_config().with_code_version("1.0.0")).await;

    let repo = ResourceFolderRepository::open(
        tree.root(),
        tree.cached_config().with_code_version("2.0.0"),
    )
    .await
    .unwrap();
    assert!(!repo.has_fresh_file_cache());
    assert_eq!(repo.files_loaded_from_sources(), 3);
    repo.shutdown();
}

#[tokio::test]
async fn test_corrupt_cache_falls_back_to_sources() {
    let tree = full_tree();
    let cache_file = tree.cached_config().cache_file_for(&tree.root()).unwrap();
    fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
    fs::write(&cache_file, b"Resource cache but not really").unwrap();

    let repo = warm(&tree, tree.cached_config()).await;
    assert!(!repo.has_fresh_file_cache());
    assert_eq!(repo.files_loaded_from_sources(), 3);
    assert!(repo.has_resource_item(ResourceType::String, "app_name"));

    let again = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert!(again.has_fresh_file_cache());
    again.shutdown();
}

#[tokio::test]
async fn test_deleted_file_not_resurrected_from_cache() {
    let tree = full_tree();
    warm(&tree, tree.cached_config()).await;
    tree.remove("values-fr/strings.xml");

    let repo = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    let resolved = repo
        .resolve(ResourceType::String, "app_name", &config("fr"))
        .unwrap();
    assert_eq!(resolved.value.text(), Some("MyApp"));
    repo.shutdown();
}

#[tokio::test]
async fn test_disabled_cache_writes_nothing() {
    let tree = full_tree();
    let repo = warm(&tree, tree.uncached_config()).await;
    assert!(!repo.has_fresh_file_cache());
    assert_eq!(fs::read_dir(tree.cache_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_explicit_write_cache() {
    let tree = full_tree();
    let repo = warm(&tree, tree.cached_config()).await;
    let cache_file = tree.cached_config().cache_file_for(&tree.root()).unwrap();
    fs::remove_file(&cache_file).unwrap();

    repo.write_cache().unwrap();
    assert!(cache_file.exists());
}

#[tokio::test]
async fn test_file_with_errors_is_parsed_again_and_reports_again() {
    let tree = full_tree();
    tree.write_strings("values/extra.xml", &[("dup", "first"), ("dup", "second")]);
    let cold = warm(&tree, tree.cached_config()).await;
    assert_eq!(cold.errors().len(), 1);

    let repo = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert_eq!(repo.files_loaded_initially(), 4);
    assert_eq!(repo.files_loaded_from_sources(), 1);
    let errors = repo.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].path.ends_with("values/extra.xml"));
    assert!(errors[0].message.contains("@string/dup"));
    let dup = repo.resolve(ResourceType::String, "dup", &config("")).unwrap();
    assert_eq!(dup.value.text(), Some("first"));
    repo.shutdown();
}

#[tokio::test]
async fn test_unsaved_edit_is_not_written_to_cache() {
    let tree = full_tree();
    let fr = tree.path("values-fr/strings.xml");
    let repo = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    repo.flush_cache_writes().await;

    let edit = DocumentChange::ChildReplaced {
        file: fr.clone(),
        target: ChangeTarget::ValueText {
            resource_type: ResourceType::String,
            name: "app_name".to_string(),
            text: "Brouillon".to_string(),
        },
    };
    assert_eq!(repo.handle_document_change(edit), EditDisposition::Edit);
    repo.wait_for_pending_updates().await;
    repo.write_cache().unwrap();
    repo.shutdown();

    // The file on disk never changed, so its stamp still matches; only the
    // missing cache entry forces the parse.
    let again = ResourceFolderRepository::open(tree.root(), tree.cached_config()).await.unwrap();
    assert_eq!(again.files_loaded_from_sources(), 1);
    let resolved = again
        .resolve(ResourceType::String, "app_name", &config("fr"))
        .unwrap();
    assert_eq!(resolved.value.text(), Some("MonApp"));
    again.shutdown();
}
