//! Integration tests for the incremental repository.
//!
//! These tests verify the complete update flow including:
//! - In-place document edits without rescans
//! - Idempotent scan scheduling and supersession of running scans
//! - File, folder and directory removal
//! - Change streams from a channel and from the file system watcher
//!
//! Run with: `cargo test --test incremental`

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use common::{app_name_tree, config, strings_xml, ResTree};
use resrepo::changes::ChannelSource;
use resrepo::error::MarkupError;
use resrepo::markup::MarkupEvent;
use resrepo::{
    ChangeSource, ChangeTarget, DocumentChange, EditDisposition, FileEvent, FileEventKind,
    FsWatcher, MarkupParser, QuickXmlParser, ResourceFolderRepository, ResourceRepository,
    ResourceType, ResourceValue,
};

// ============================================================================
// Helper Functions
// ============================================================================

async fn open(tree: &ResTree) -> ResourceFolderRepository {
    ResourceFolderRepository::open(tree.root(), tree.uncached_config())
        .await
        .unwrap()
}

fn string(repo: &ResourceFolderRepository, name: &str, target: &str) -> Option<String> {
    repo.resolve(ResourceType::String, name, &config(target))
        .and_then(|r| r.value.text().map(str::to_owned))
}

fn text_edit(file: std::path::PathBuf, name: &str, text: &str) -> DocumentChange {
    DocumentChange::ChildReplaced {
        file,
        target: ChangeTarget::ValueText {
            resource_type: ResourceType::String,
            name: name.to_string(),
            text: text.to_string(),
        },
    }
}

/// Poll until `check` holds, draining the update queue between attempts.
async fn eventually<F>(repo: &ResourceFolderRepository, timeout: Duration, check: F) -> bool
where
    F: Fn(&ResourceFolderRepository) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        repo.wait_for_pending_updates().await;
        if check(repo) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Parser that blocks its first call after being armed until released.
struct GatedParser {
    inner: QuickXmlParser,
    armed: AtomicBool,
    started: Mutex<std_mpsc::Sender<()>>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

impl MarkupParser for GatedParser {
    fn parse(&self, text: &str) -> Result<Vec<MarkupEvent>, MarkupError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
        self.inner.parse(text)
    }
}

// ============================================================================
// Document edits
// ============================================================================

#[tokio::test]
async fn test_text_edit_applies_in_place() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let fr = tree.path("values-fr/strings.xml");

    let disposition = repo.handle_document_change(text_edit(fr, "app_name", "MonApplication"));
    assert_eq!(disposition, EditDisposition::Edit);
    repo.wait_for_pending_updates().await;

    assert_eq!(string(&repo, "app_name", "fr").as_deref(), Some("MonApplication"));
    assert_eq!(string(&repo, "app_name", "").as_deref(), Some("MyApp"));
    let stats = repo.stats();
    assert_eq!(stats.file_rescans, 0);
    assert_eq!(stats.document_edits, 1);
    repo.shutdown();
}

#[tokio::test]
async fn test_unknown_name_edit_falls_back_to_rescan() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let fr = tree.path("values-fr/strings.xml");

    let disposition = repo.handle_document_change(text_edit(fr, "not_declared", "x"));
    assert_eq!(disposition, EditDisposition::Edit);
    repo.wait_for_pending_updates().await;

    let stats = repo.stats();
    assert_eq!(stats.document_edits, 0);
    assert_eq!(stats.file_rescans, 1);
    repo.shutdown();
}

#[tokio::test]
async fn test_rename_bumps_id_generation() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let before = repo.id_generation();

    let change = DocumentChange::ChildReplaced {
        file: tree.path("values-fr/strings.xml"),
        target: ChangeTarget::ValueName {
            resource_type: ResourceType::String,
            old_name: "app_name".to_string(),
            new_name: "app_label".to_string(),
        },
    };
    assert_eq!(repo.handle_document_change(change), EditDisposition::Edit);
    repo.wait_for_pending_updates().await;

    assert!(repo.id_generation() > before);
    assert_eq!(string(&repo, "app_label", "fr").as_deref(), Some("MonApp"));
    // The French variant is gone; the default takes over.
    assert_eq!(string(&repo, "app_name", "fr").as_deref(), Some("MyApp"));
    repo.shutdown();
}

#[tokio::test]
async fn test_add_and_remove_value_elements() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let fr = tree.path("values-fr/strings.xml");

    let added = DocumentChange::ChildAdded {
        file: fr.clone(),
        target: ChangeTarget::ValueElement {
            resource_type: ResourceType::String,
            name: "greeting".to_string(),
            value: Some(ResourceValue::Text("Bonjour".to_string())),
        },
    };
    assert_eq!(repo.handle_document_change(added), EditDisposition::Edit);
    repo.wait_for_pending_updates().await;
    assert!(repo.has_resource_item(ResourceType::String, "greeting"));
    assert_eq!(string(&repo, "greeting", "fr").as_deref(), Some("Bonjour"));

    let removed = DocumentChange::ChildRemoved {
        file: fr,
        target: ChangeTarget::ValueElement {
            resource_type: ResourceType::String,
            name: "greeting".to_string(),
            value: None,
        },
    };
    assert_eq!(repo.handle_document_change(removed), EditDisposition::Edit);
    repo.wait_for_pending_updates().await;
    assert!(!repo.has_resource_item(ResourceType::String, "greeting"));
    assert_eq!(repo.stats().document_edits, 2);
    repo.shutdown();
}

#[tokio::test]
async fn test_change_absorbed_by_pending_scan() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let fr = tree.path("values-fr/strings.xml");

    assert!(repo.schedule_scan(&fr));
    let disposition = repo.handle_document_change(text_edit(fr, "app_name", "Ignored"));
    assert_eq!(disposition, EditDisposition::Absorbed);
    repo.wait_for_pending_updates().await;

    // The pending scan read the file on disk.
    assert_eq!(string(&repo, "app_name", "fr").as_deref(), Some("MonApp"));
    assert_eq!(repo.stats().document_edits, 0);
    repo.shutdown();
}

#[tokio::test]
async fn test_layout_change_rescans_file() {
    let tree = ResTree::new();
    let layout = tree.write("layout/main.xml", r#"<LinearLayout android:id="@+id/root"/>"#);
    let repo = open(&tree).await;
    assert!(repo.has_resource_item(ResourceType::Id, "root"));

    tree.write(
        "layout/main.xml",
        r#"<LinearLayout android:id="@+id/container"><TextView android:id="@+id/label"/></LinearLayout>"#,
    );
    let change = DocumentChange::BulkChange { file: layout };
    assert_eq!(repo.handle_document_change(change), EditDisposition::Rescan);
    repo.wait_for_pending_updates().await;

    assert!(repo.has_resource_item(ResourceType::Id, "container"));
    assert!(repo.has_resource_item(ResourceType::Id, "label"));
    assert!(!repo.has_resource_item(ResourceType::Id, "root"));
    repo.shutdown();
}

// ============================================================================
// Scheduling
// ============================================================================

#[tokio::test]
async fn test_scheduling_is_idempotent_while_pending() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let default = tree.path("values/strings.xml");

    assert!(repo.schedule_scan(&default));
    assert!(!repo.schedule_scan(&default));
    assert_eq!(repo.pending_scans(), 1);
    repo.wait_for_pending_updates().await;

    assert_eq!(repo.file_rescans(), 1);
    assert_eq!(repo.pending_scans(), 0);
    repo.shutdown();
}

#[tokio::test]
async fn test_running_scan_is_superseded() {
    let tree = app_name_tree();
    let (started_tx, started_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let parser = Arc::new(GatedParser {
        inner: QuickXmlParser::new(),
        armed: AtomicBool::new(false),
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    });
    let repo = ResourceFolderRepository::open_with_parser(
        tree.root(),
        tree.uncached_config(),
        Arc::clone(&parser) as Arc<dyn MarkupParser>,
    )
    .await
    .unwrap();
    let fr = tree.path("values-fr/strings.xml");

    tree.write_strings("values-fr/strings.xml", &[("app_name", "Second")]);
    parser.armed.store(true, Ordering::SeqCst);
    assert!(repo.schedule_scan(&fr));

    // Wait until the first scan is blocked inside the parser.
    tokio::task::spawn_blocking(move || started_rx.recv())
        .await
        .unwrap()
        .unwrap();

    tree.write_strings("values-fr/strings.xml", &[("app_name", "Third")]);
    assert!(repo.schedule_scan(&fr));
    release_tx.send(()).unwrap();
    repo.wait_for_pending_updates().await;

    assert_eq!(string(&repo, "app_name", "fr").as_deref(), Some("Third"));
    let stats = repo.stats();
    assert_eq!(stats.scans_cancelled, 1);
    assert_eq!(stats.file_rescans, 1);
    repo.shutdown();
}

#[tokio::test]
async fn test_modified_file_is_rescanned() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let generation = repo.generation();

    let default = tree.write_strings("values/strings.xml", &[("app_name", "MyApp 2"), ("title", "Title")]);
    repo.on_file_changed(&default);
    repo.wait_for_pending_updates().await;

    assert_eq!(string(&repo, "app_name", "de").as_deref(), Some("MyApp 2"));
    assert!(repo.generation() > generation);
    repo.shutdown();
}

#[tokio::test]
async fn test_malformed_file_requests_full_rescan() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    assert!(!repo.needs_full_rescan());

    let extra = tree.write("values/extra.xml", &strings_xml(&[("extra", "Extra")]));
    repo.on_file_created(&extra);
    repo.wait_for_pending_updates().await;
    assert!(repo.has_resource_item(ResourceType::String, "extra"));

    tree.write("values/extra.xml", "<resources><string name=\"extra\">");
    repo.on_file_changed(&extra);
    repo.wait_for_pending_updates().await;

    assert!(repo.needs_full_rescan());
    assert!(!repo.errors().is_empty());
    assert!(!repo.has_resource_item(ResourceType::String, "extra"));
    repo.shutdown();
}

// ============================================================================
// Removal and creation
// ============================================================================

#[tokio::test]
async fn test_deleted_file_prunes_its_items() {
    let tree = app_name_tree();
    let repo = open(&tree).await;

    let fr = tree.remove("values-fr/strings.xml");
    repo.on_file_or_directory_removed(&fr);
    repo.wait_for_pending_updates().await;

    assert_eq!(string(&repo, "app_name", "fr").as_deref(), Some("MyApp"));
    assert_eq!(repo.source_files(ResourceType::String, "app_name", None).len(), 1);

    let values = tree.remove("values");
    repo.on_file_or_directory_removed(&values);
    repo.wait_for_pending_updates().await;
    assert!(!repo.has_resource_item(ResourceType::String, "app_name"));
    assert!(!repo.has_resources_of_type(ResourceType::String));
    repo.shutdown();
}

#[tokio::test]
async fn test_removed_parent_directory_drops_every_folder() {
    let tree = ResTree::new();
    tree.write_strings("values/strings.xml", &[("a", "A")]);
    tree.write("drawable/icon.png", "png");
    let repo = open(&tree).await;

    // Removing the root takes every folder below it.
    repo.on_file_or_directory_removed(&tree.root());
    repo.wait_for_pending_updates().await;
    assert!(repo.available_types().is_empty());
    repo.shutdown();
}

#[tokio::test]
async fn test_created_folder_is_scanned() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    assert_eq!(string(&repo, "app_name", "de").as_deref(), Some("MyApp"));

    tree.write_strings("values-de/strings.xml", &[("app_name", "MeineApp")]);
    repo.on_file_created(&tree.path("values-de"));
    repo.wait_for_pending_updates().await;

    assert_eq!(string(&repo, "app_name", "de").as_deref(), Some("MeineApp"));
    assert!(repo.languages().contains("de"));
    repo.shutdown();
}

#[tokio::test]
async fn test_invoke_after_pending_updates_runs_in_order() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let (tx, rx) = tokio::sync::oneshot::channel();

    assert!(repo.schedule_scan(&tree.path("values/strings.xml")));
    let observer = repo.clone();
    assert!(repo.invoke_after_pending_updates_finish(move || {
        let _ = tx.send(observer.file_rescans());
    }));

    assert_eq!(rx.await.unwrap(), 1);
    repo.shutdown();
}

// ============================================================================
// Change streams
// ============================================================================

#[tokio::test]
async fn test_listen_consumes_channel_events() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let mut source = ChannelSource::new();
    let handle = repo.listen(source.take_events().unwrap());

    let extra = tree.write_strings("values/extra.xml", &[("extra", "Extra")]);
    assert!(source.publish(FileEvent::new(extra, FileEventKind::Created)));
    let change = text_edit(tree.path("values-fr/strings.xml"), "app_name", "Mon App");
    assert!(source.publish(change));

    assert!(
        eventually(&repo, Duration::from_secs(5), |r| {
            r.has_resource_item(ResourceType::String, "extra")
                && string(r, "app_name", "fr").as_deref() == Some("Mon App")
        })
        .await
    );

    repo.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_feeds_repository() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    let mut watcher = FsWatcher::start(tree.root()).unwrap();
    let _listener = repo.listen(watcher.take_events().unwrap());

    tree.write_strings("values/strings.xml", &[("app_name", "Watched"), ("title", "Title")]);
    assert!(
        eventually(&repo, Duration::from_secs(10), |r| {
            string(r, "app_name", "").as_deref() == Some("Watched")
        })
        .await
    );

    tree.remove("values-fr/strings.xml");
    assert!(
        eventually(&repo, Duration::from_secs(10), |r| {
            r.source_files(ResourceType::String, "app_name", None).len() == 1
        })
        .await
    );
    repo.shutdown();
}

#[tokio::test]
async fn test_shutdown_stops_scheduling() {
    let tree = app_name_tree();
    let repo = open(&tree).await;
    repo.shutdown();
    assert!(repo.is_shut_down());
    assert!(!repo.schedule_scan(&tree.path("values/strings.xml")));
    // Returns immediately once the worker is gone.
    repo.wait_for_pending_updates().await;
}
