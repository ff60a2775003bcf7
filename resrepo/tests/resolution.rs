//! Integration tests for best-match resolution over real resource trees.
//!
//! These tests verify:
//! - Locale fallback to the default configuration
//! - Density selection between several buckets
//! - Determinism of resolution under insertion-order permutations
//! - Pseudolocale generation for en-rXA and ar-rXB
//! - Overlaying several resource roots
//!
//! Run with: `cargo test --test resolution`

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::{app_name_tree, config, ResTree};
use resrepo::{
    DirectoryRepository, FolderConfiguration, OverlayRepository, RepositoryConfig,
    ResourceFolderRepository, ResourceRepository, ResourceType, ResourceValue,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn text_of(repo: &impl ResourceRepository, name: &str, target: &str) -> Option<String> {
    repo.resolve(ResourceType::String, name, &config(target))
        .and_then(|r| r.value.text().map(str::to_owned))
}

fn drawable_folder(repo: &impl ResourceRepository, name: &str, target: &str) -> Option<String> {
    repo.matching_file(name, ResourceType::Drawable, &config(target))
        .and_then(|p| {
            p.parent()
                .and_then(|d| d.file_name())
                .map(|n| n.to_string_lossy().into_owned())
        })
}

fn directory(tree: &ResTree) -> Arc<dyn ResourceRepository> {
    Arc::new(DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap())
}

/// Default-locale strings, plurals and arrays plus untranslatable entries.
fn pseudolocale_tree() -> ResTree {
    let tree = ResTree::new();
    tree.write(
        "values/strings.xml",
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="title">Test String</string>
    <string name="brand" translatable="false">Acme</string>
    <plurals name="songs">
        <item quantity="one">One String</item>
        <item quantity="other">%d songs</item>
    </plurals>
    <string-array name="planets">
        <item>Nothing</item>
    </string-array>
    <color name="accent">#fff</color>
</resources>
"#,
    );
    tree.write_strings("values/donottranslate.xml", &[("url", "Test String")]);
    tree.write_strings("values-fr/strings.xml", &[("title", "Chaîne de test")]);
    tree
}

fn bidi_word(word: &str) -> String {
    format!("\u{200f}\u{202e}{}\u{202c}\u{200f}", word)
}

fn density_tree() -> ResTree {
    let tree = ResTree::new();
    tree.write("drawable-hdpi/icon.png", "hdpi");
    tree.write("drawable-xhdpi/icon.png", "xhdpi");
    tree
}

/// Qualifier strings the property test draws candidates from. Every entry
/// is a distinct configuration.
const CANDIDATE_POOL: &[&str] = &[
    "",
    "fr",
    "fr-rCA",
    "de",
    "land",
    "port",
    "hdpi",
    "xhdpi",
    "fr-land",
    "fr-hdpi",
    "sw600dp",
    "night",
    "v21",
    "land-v21",
];

const TARGETS: &[&str] = &[
    "",
    "fr-rCA",
    "fr-rCA-land-xhdpi-v23",
    "de-port-mdpi",
    "sw720dp-night-v19",
    "en-land-hdpi",
];

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_locale_falls_back_to_default() {
    let tree = app_name_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();

    assert_eq!(text_of(&repo, "app_name", "fr").as_deref(), Some("MonApp"));
    assert_eq!(text_of(&repo, "app_name", "fr-rCA").as_deref(), Some("MonApp"));
    assert_eq!(text_of(&repo, "app_name", "de").as_deref(), Some("MyApp"));
    assert_eq!(text_of(&repo, "app_name", "").as_deref(), Some("MyApp"));
    // Only the default declares it.
    assert_eq!(text_of(&repo, "title", "fr").as_deref(), Some("Title"));
    assert_eq!(text_of(&repo, "missing", "fr"), None);
}

#[tokio::test]
async fn test_incremental_repository_resolves_like_directory_repository() {
    let tree = app_name_tree();
    tree.write("drawable-hdpi/icon.png", "png");
    tree.write("layout/main.xml", r#"<LinearLayout android:id="@+id/root"/>"#);

    let directory = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    let incremental = ResourceFolderRepository::open(tree.root(), tree.uncached_config()).await.unwrap();

    for target in ["", "fr", "de-hdpi", "fr-rCA-land"] {
        let target = config(target);
        assert_eq!(
            directory.configured_resources(&target),
            incremental.configured_resources(&target)
        );
    }
    assert!(incremental.has_resource_item(ResourceType::Id, "root"));
    assert!(incremental.has_resource_url("@string/app_name"));
    assert!(!incremental.has_resource_url("@android:string/app_name"));
    incremental.shutdown();
}

#[test]
fn test_density_exact_match() {
    let tree = density_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    assert_eq!(drawable_folder(&repo, "icon", "hdpi").as_deref(), Some("drawable-hdpi"));
    assert_eq!(drawable_folder(&repo, "icon", "xhdpi").as_deref(), Some("drawable-xhdpi"));
}

#[test]
fn test_density_between_buckets_does_not_exceed_target() {
    let tree = density_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    assert_eq!(drawable_folder(&repo, "icon", "280dpi").as_deref(), Some("drawable-hdpi"));
    assert_eq!(drawable_folder(&repo, "icon", "xxhdpi").as_deref(), Some("drawable-xhdpi"));
}

#[test]
fn test_density_all_above_target_picks_highest() {
    let tree = density_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    assert_eq!(drawable_folder(&repo, "icon", "ldpi").as_deref(), Some("drawable-xhdpi"));
}

#[test]
fn test_nodpi_is_last_resort_and_anydpi_wins() {
    let tree = ResTree::new();
    tree.write("drawable-nodpi/logo.png", "nodpi");
    tree.write("drawable-hdpi/logo.png", "hdpi");
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    assert_eq!(drawable_folder(&repo, "logo", "mdpi").as_deref(), Some("drawable-hdpi"));

    tree.write("drawable-anydpi/logo.xml", "<vector/>");
    repo.reload();
    assert_eq!(drawable_folder(&repo, "logo", "mdpi").as_deref(), Some("drawable-anydpi"));
}

#[test]
fn test_file_value_carries_folder_density() {
    let tree = density_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    let resolved = repo.resolve(ResourceType::Drawable, "icon", &config("xhdpi")).unwrap();
    match resolved.value {
        ResourceValue::File { density, .. } => assert_eq!(density, Some(320)),
        other => panic!("expected a file value, got {:?}", other),
    }
}

#[test]
fn test_duplicate_declarations_resolve_to_first_path() {
    let tree = ResTree::new();
    tree.write_strings("values/b.xml", &[("dup", "from b")]);
    tree.write_strings("values/a.xml", &[("dup", "from a")]);
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();

    let resolved = repo.resolve(ResourceType::String, "dup", &config("")).unwrap();
    assert_eq!(resolved.value.text(), Some("from a"));
    assert!(resolved.path.ends_with("values/a.xml"));
    assert_eq!(repo.source_files(ResourceType::String, "dup", None).len(), 2);
}

#[test]
fn test_languages_and_source_files() {
    let tree = app_name_tree();
    tree.write_strings("values-fr-rCA/strings.xml", &[("app_name", "MonApp CA")]);
    tree.write_strings("values-de/strings.xml", &[("app_name", "MeineApp")]);
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();

    let languages: Vec<String> = repo.languages().into_iter().collect();
    assert_eq!(languages, vec!["de", "fr"]);
    let regions: Vec<String> = repo.regions("fr").into_iter().collect();
    assert_eq!(regions, vec!["CA"]);

    let fr_files = repo.source_files(ResourceType::String, "app_name", Some(&config("fr")));
    assert_eq!(fr_files.len(), 1);
    assert!(fr_files[0].ends_with("values-fr/strings.xml"));
    assert_eq!(repo.source_files(ResourceType::String, "app_name", None).len(), 4);
}

#[test]
fn test_invalid_folders_are_ignored() {
    let tree = app_name_tree();
    tree.write_strings("values-nonsense/strings.xml", &[("app_name", "Broken")]);
    tree.write_strings("values-hdpi-fr/strings.xml", &[("app_name", "Out of order")]);
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    assert_eq!(repo.source_files(ResourceType::String, "app_name", None).len(), 2);
}

#[test]
fn test_accent_pseudolocale_rewrites_default_values() {
    let tree = pseudolocale_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();
    let target = config("en-rXA");

    let title = repo.resolve(ResourceType::String, "title", &target).unwrap();
    assert_eq!(title.value.text(), Some("[Ţéšţ Šţŕîñĝ one two]"));
    assert_eq!(title.configuration, config("en-rXA"));
    assert!(title.path.ends_with("values/strings.xml"));

    match repo.resolve(ResourceType::Plurals, "songs", &target).unwrap().value {
        ResourceValue::Plurals { quantities } => {
            assert_eq!(quantities["one"], "[Öñé Šţŕîñĝ one two]");
            assert_eq!(quantities["other"], "[%d šöñĝš one two]");
        }
        other => panic!("expected plurals, got {:?}", other),
    }
    match repo.resolve(ResourceType::Array, "planets", &target).unwrap().value {
        ResourceValue::Array { elements } => assert_eq!(elements, vec!["[Ñöţĥîñĝ one two]"]),
        other => panic!("expected an array, got {:?}", other),
    }

    let accent = repo.resolve(ResourceType::Color, "accent", &target).unwrap();
    assert_eq!(accent.value.text(), Some("#fff"));
    assert_eq!(accent.configuration, config(""));

    // Other locales are untouched.
    assert_eq!(text_of(&repo, "title", "fr").as_deref(), Some("Chaîne de test"));
    assert_eq!(text_of(&repo, "title", "en").as_deref(), Some("Test String"));
}

#[test]
fn test_bidi_pseudolocale_wraps_words() {
    let tree = pseudolocale_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();

    let title = repo
        .resolve(ResourceType::String, "title", &config("ar-rXB-land"))
        .unwrap();
    assert_eq!(
        title.value.text(),
        Some(format!("{} {}", bidi_word("Test"), bidi_word("String")).as_str())
    );
    assert_eq!(title.configuration, config("ar-rXB"));

    match repo.resolve(ResourceType::Array, "planets", &config("ar-rXB")).unwrap().value {
        ResourceValue::Array { elements } => assert_eq!(elements, vec![bidi_word("Nothing")]),
        other => panic!("expected an array, got {:?}", other),
    }
}

#[test]
fn test_untranslatable_values_are_not_pseudolocalized() {
    let tree = pseudolocale_tree();
    let repo = DirectoryRepository::new(tree.root(), &RepositoryConfig::default()).unwrap();

    for target in ["en-rXA", "ar-rXB"] {
        assert_eq!(text_of(&repo, "brand", target).as_deref(), Some("Acme"));
        assert_eq!(text_of(&repo, "url", target).as_deref(), Some("Test String"));
    }
    let configured = repo.configured_resources(&config("en-rXA"));
    assert_eq!(
        configured[&ResourceType::String]["brand"],
        ResourceValue::Text("Acme".into())
    );
    assert_eq!(
        configured[&ResourceType::String]["title"],
        ResourceValue::Text("[Ţéšţ Šţŕîñĝ one two]".into())
    );
}

#[tokio::test]
async fn test_real_pseudolocale_folder_wins() {
    let tree = pseudolocale_tree();
    tree.write_strings("values-en-rXA/strings.xml", &[("title", "Hand written")]);
    let repo = ResourceFolderRepository::open(tree.root(), tree.uncached_config())
        .await
        .unwrap();

    let title = repo
        .resolve(ResourceType::String, "title", &config("en-rXA"))
        .unwrap();
    assert_eq!(title.value.text(), Some("Hand written"));
    assert!(title.path.ends_with("values-en-rXA/strings.xml"));
    // Items the real folder lacks are still generated.
    match repo.resolve(ResourceType::Array, "planets", &config("en-rXA")).unwrap().value {
        ResourceValue::Array { elements } => assert_eq!(elements, vec!["[Ñöţĥîñĝ one two]"]),
        other => panic!("expected an array, got {:?}", other),
    }
    repo.shutdown();
}

#[test]
fn test_overlay_later_root_wins_for_equal_configuration() {
    let main = app_name_tree();
    let flavor = ResTree::new();
    flavor.write_strings("values/strings.xml", &[("app_name", "Flavor")]);
    flavor.write_strings("values-de/strings.xml", &[("greeting", "Hallo")]);
    let overlay = OverlayRepository::from_layers(vec![directory(&main), directory(&flavor)]);

    let app_name = overlay
        .resolve(ResourceType::String, "app_name", &config(""))
        .unwrap();
    assert_eq!(app_name.value.text(), Some("Flavor"));
    assert!(app_name.path.starts_with(flavor.root()));

    // A better configuration in a lower root still wins.
    let french = overlay
        .resolve(ResourceType::String, "app_name", &config("fr-rCA"))
        .unwrap();
    assert_eq!(french.value.text(), Some("MonApp"));
    assert!(french.path.starts_with(main.root()));

    // Names only one root declares come from that root.
    let title = overlay.resolve(ResourceType::String, "title", &config("de")).unwrap();
    assert_eq!(title.value.text(), Some("Title"));
    let greeting = overlay.resolve(ResourceType::String, "greeting", &config("de")).unwrap();
    assert_eq!(greeting.value.text(), Some("Hallo"));
    assert!(overlay.resolve(ResourceType::String, "greeting", &config("fr")).is_none());

    let languages: Vec<String> = overlay.languages().into_iter().collect();
    assert_eq!(languages, vec!["de", "fr"]);
    let names: Vec<String> = overlay
        .items_of_type(ResourceType::String)
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["app_name", "greeting", "title"]);
    assert_eq!(
        overlay.source_files(ResourceType::String, "app_name", None)[0],
        flavor.path("values/strings.xml")
    );

    let configured = overlay.configured_resources(&config("fr"));
    assert_eq!(
        configured[&ResourceType::String]["app_name"],
        ResourceValue::Text("MonApp".into())
    );
    assert_eq!(
        configured[&ResourceType::String]["title"],
        ResourceValue::Text("Title".into())
    );
}

#[tokio::test]
async fn test_overlay_over_incremental_root() {
    let main = pseudolocale_tree();
    let flavor = ResTree::new();
    flavor.write_strings("values/strings.xml", &[("title", "Nothing")]);
    let incremental = ResourceFolderRepository::open(flavor.root(), flavor.uncached_config())
        .await
        .unwrap();

    let mut overlay = OverlayRepository::new();
    overlay.push_overlay(directory(&main));
    overlay.push_overlay(Arc::new(incremental.clone()));
    assert_eq!(overlay.roots(), vec![main.root().as_path(), flavor.root().as_path()]);

    let title = overlay
        .resolve(ResourceType::String, "title", &config("en-rXA"))
        .unwrap();
    assert_eq!(title.value.text(), Some("[Ñöţĥîñĝ one two]"));
    assert!(title.path.starts_with(flavor.root()));
    assert_eq!(
        overlay
            .resolve(ResourceType::String, "brand", &config("en-rXA"))
            .and_then(|r| r.value.text().map(str::to_owned))
            .as_deref(),
        Some("Acme")
    );
    assert!(overlay.generation() >= incremental.generation());
    incremental.shutdown();
}

proptest! {
    #[test]
    fn prop_find_matching_ignores_candidate_order(
        candidates in Just(CANDIDATE_POOL.to_vec()).prop_shuffle(),
        keep in 1usize..=CANDIDATE_POOL.len(),
        target in prop::sample::select(TARGETS.to_vec()),
    ) {
        let shuffled: Vec<FolderConfiguration> =
            candidates[..keep].iter().map(|q| config(q)).collect();
        let mut sorted = shuffled.clone();
        sorted.sort();

        let target = config(target);
        let a = target.find_matching(&shuffled).cloned();
        let b = target.find_matching(&sorted).cloned();
        prop_assert_eq!(a, b);
    }
}
