//! Resource sources: the files that contribute resources.
//!
//! Each file under a resource folder becomes one [`Source`]. What it
//! contributes depends on its [`SourceKind`]:
//!
//! ```text
//! drawable-hdpi/icon.png   SingleFile        drawable/icon
//! values-fr/strings.xml    MultiValueFile    string/app_name, string/greeting, ...
//! layout/main.xml          IdGeneratingFile  layout/main + id/title, id/ok, ...
//! ```
//!
//! Sources move through `Unscanned -> Loaded -> Disposed`. Loading attaches
//! every contribution to the item index, updating diffs the old and new
//! contributions, and disposing detaches them and prunes items left without
//! sources.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crate::configuration::{Configurable, FolderConfiguration};
use crate::markup::{ids, values, MarkupParser};
use crate::repository::table::ItemIndex;
use crate::resource::{
    file_name_to_resource_name, is_valid_resource_name, ResourceFolderType, ResourceType,
    ResourceValue,
};

/// Stable handle of a source inside one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Scan context
// =============================================================================

/// A problem found while scanning one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub path: PathBuf,
    /// 1-based line, 0 when not tied to a line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}: {}", self.path.display(), self.line, self.message)
        } else {
            write!(f, "{}: {}", self.path.display(), self.message)
        }
    }
}

/// Collects errors and the full-rescan request across one scan.
#[derive(Debug, Default)]
pub struct ScanContext {
    errors: Vec<ScanError>,
    needs_full_rescan: bool,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ScanError) {
        tracing::debug!(error = %error, "Scan error");
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Ask for a full re-index because a file's identity could not be
    /// established.
    pub fn request_full_rescan(&mut self) {
        self.needs_full_rescan = true;
    }

    pub fn needs_full_rescan(&self) -> bool {
        self.needs_full_rescan
    }

    /// Absorb the errors and rescan request of a parse.
    pub(crate) fn absorb(&mut self, errors: Vec<ScanError>, needs_full_rescan: bool) {
        for error in errors {
            self.add_error(error);
        }
        if needs_full_rescan {
            self.request_full_rescan();
        }
    }
}

// =============================================================================
// File stamps
// =============================================================================

/// Modification time and length of a file at the time it was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileStamp {
    pub modified_nanos: u128,
    pub length: u64,
}

impl FileStamp {
    pub fn from_metadata(metadata: &fs::Metadata) -> Self {
        let modified_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            modified_nanos,
            length: metadata.len(),
        }
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        fs::metadata(path).map(|m| Self::from_metadata(&m))
    }

    /// Combined hash of time and length, as stored in the persistent cache.
    pub fn hash(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.modified_nanos.to_le_bytes());
        hasher.update(self.length.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

// =============================================================================
// Source kinds
// =============================================================================

/// Resources declared by one values file, by type then name.
pub type ValueMap = BTreeMap<ResourceType, BTreeMap<String, ResourceValue>>;

/// What a source contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// A file that is itself one resource (`drawable/icon.png`).
    SingleFile {
        resource_type: ResourceType,
        name: String,
        density: Option<u32>,
    },
    /// A values file declaring many resources.
    MultiValueFile {
        values: ValueMap,
        /// Declarations marked `translatable="false"`.
        untranslatable: BTreeSet<(ResourceType, String)>,
    },
    /// An XML file that is one resource and may also declare ids.
    IdGeneratingFile {
        resource_type: ResourceType,
        name: String,
        ids: BTreeSet<String>,
    },
}

impl SourceKind {
    /// Every (type, name) pair this kind contributes, sorted.
    pub fn contributions(&self) -> BTreeSet<(ResourceType, String)> {
        match self {
            SourceKind::SingleFile {
                resource_type,
                name,
                ..
            } => BTreeSet::from([(*resource_type, name.clone())]),
            SourceKind::MultiValueFile { values, .. } => values
                .iter()
                .flat_map(|(t, names)| names.keys().map(move |n| (*t, n.clone())))
                .collect(),
            SourceKind::IdGeneratingFile {
                resource_type,
                name,
                ids,
            } => {
                let mut out = BTreeSet::from([(*resource_type, name.clone())]);
                out.extend(ids.iter().map(|id| (ResourceType::Id, id.clone())));
                out
            }
        }
    }

    /// Whether this kind is counted by the cache freshness check.
    pub fn is_parsable(&self) -> bool {
        !matches!(self, SourceKind::SingleFile { .. })
    }

    /// Number of contributed resources.
    pub fn len(&self) -> usize {
        match self {
            SourceKind::SingleFile { .. } => 1,
            SourceKind::MultiValueFile { values, .. } => values.values().map(BTreeMap::len).sum(),
            SourceKind::IdGeneratingFile { ids, .. } => 1 + ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A values file whose declarations are all translatable.
    pub fn values(values: ValueMap) -> Self {
        SourceKind::MultiValueFile {
            values,
            untranslatable: BTreeSet::new(),
        }
    }

    /// Whether (type, name) may be pseudolocalized. Only values files carry
    /// the flag; everything else is translatable.
    pub fn is_translatable(&self, resource_type: ResourceType, name: &str) -> bool {
        match self {
            SourceKind::MultiValueFile { untranslatable, .. } => {
                !untranslatable.contains(&(resource_type, name.to_string()))
            }
            _ => true,
        }
    }
}

/// Result of reading and interpreting one file.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// `None` when the file is present but cannot be a resource (invalid
    /// name); such files are not tracked.
    pub kind: Option<SourceKind>,
    pub stamp: Option<FileStamp>,
    pub errors: Vec<ScanError>,
    pub needs_full_rescan: bool,
}

/// Whether a file in `folder_type` is read as markup.
pub fn is_parsable_file(folder_type: ResourceFolderType, path: &Path) -> bool {
    is_xml(path) && (folder_type == ResourceFolderType::Values || folder_type.is_id_generating())
}

/// Whether a file name is one the repository tracks at all.
pub fn is_candidate_file(folder_type: ResourceFolderType, path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with('.') {
        return false;
    }
    folder_type != ResourceFolderType::Values || is_xml(path)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Read and interpret one file.
///
/// Returns `Ok(None)` for files that are never resources (dot files, non-XML
/// files under `values/`). A missing file is `Err` with
/// [`io::ErrorKind::NotFound`], which callers treat as a deletion. Other read
/// failures are reported as scan errors on an empty result.
pub fn parse_source(
    path: &Path,
    folder_type: ResourceFolderType,
    configuration: &FolderConfiguration,
    parser: &dyn MarkupParser,
) -> io::Result<Option<ParseOutcome>> {
    if !is_candidate_file(folder_type, path) {
        return Ok(None);
    }
    let stamp = FileStamp::read(path)?;
    let mut outcome = ParseOutcome {
        kind: None,
        stamp: Some(stamp),
        errors: Vec::new(),
        needs_full_rescan: false,
    };
    let scan_error = |line: usize, message: String| ScanError {
        path: path.to_path_buf(),
        line,
        message,
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if folder_type == ResourceFolderType::Values {
        let mut values = ValueMap::new();
        let mut untranslatable = BTreeSet::new();
        match read_markup(path, parser)? {
            Ok(events) => match values::parse_values(&events) {
                Ok(parsed) => {
                    for error in parsed.errors {
                        outcome.errors.push(scan_error(error.line, error.message));
                    }
                    for value in parsed.values {
                        // The first declaration wins. Repeated attrs and ids
                        // are not errors.
                        let by_name = values.entry(value.resource_type).or_default();
                        if by_name.contains_key(&value.name) {
                            if matches!(value.resource_type, ResourceType::Attr | ResourceType::Id) {
                                continue;
                            }
                            outcome.errors.push(scan_error(
                                value.line,
                                format!(
                                    "duplicate declaration of @{}/{}",
                                    value.resource_type.name(),
                                    value.name
                                ),
                            ));
                            continue;
                        }
                        if !value.translatable {
                            untranslatable.insert((value.resource_type, value.name.clone()));
                        }
                        by_name.insert(value.name, value.value);
                    }
                }
                Err(e) => {
                    outcome.errors.push(scan_error(e.line, e.message));
                    outcome.needs_full_rescan = true;
                }
            },
            Err(e) => {
                outcome.errors.push(scan_error(e.line, e.message));
                outcome.needs_full_rescan = true;
            }
        }
        outcome.kind = Some(SourceKind::MultiValueFile {
            values,
            untranslatable,
        });
        return Ok(Some(outcome));
    }

    let name = file_name_to_resource_name(file_name);
    if !is_valid_resource_name(name) {
        outcome
            .errors
            .push(scan_error(0, format!("invalid file resource name '{}'", name)));
        return Ok(Some(outcome));
    }
    let Some(resource_type) = folder_type.file_resource_type() else {
        return Ok(None);
    };

    if folder_type.is_id_generating() && is_xml(path) {
        let ids = match read_markup(path, parser)? {
            Ok(events) => ids::collect_ids(&events),
            Err(e) => {
                outcome.errors.push(scan_error(e.line, e.message));
                outcome.needs_full_rescan = true;
                BTreeSet::new()
            }
        };
        outcome.kind = Some(SourceKind::IdGeneratingFile {
            resource_type,
            name: name.to_string(),
            ids,
        });
    } else {
        outcome.kind = Some(SourceKind::SingleFile {
            resource_type,
            name: name.to_string(),
            density: configuration.density().and_then(|d| d.dpi()),
        });
    }
    Ok(Some(outcome))
}

/// Read a file and run the markup parser. The outer `Result` is I/O, the
/// inner one is markup validity.
fn read_markup(
    path: &Path,
    parser: &dyn MarkupParser,
) -> io::Result<Result<Vec<crate::markup::MarkupEvent>, crate::error::MarkupError>> {
    let text = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return Err(e),
    };
    Ok(parser.parse(&text))
}

// =============================================================================
// Source
// =============================================================================

/// Lifecycle of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Unscanned,
    Loaded,
    Disposed,
}

/// One file contributing resources.
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    path: PathBuf,
    folder_type: ResourceFolderType,
    configuration: Arc<FolderConfiguration>,
    kind: SourceKind,
    state: SourceState,
    stamp: Option<FileStamp>,
    updates: u32,
    had_errors: bool,
}

impl Source {
    pub fn new(
        id: SourceId,
        path: PathBuf,
        folder_type: ResourceFolderType,
        configuration: Arc<FolderConfiguration>,
        kind: SourceKind,
        stamp: Option<FileStamp>,
    ) -> Self {
        Self {
            id,
            path,
            folder_type,
            configuration,
            kind,
            state: SourceState::Unscanned,
            stamp,
            updates: 0,
            had_errors: false,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn folder_type(&self) -> ResourceFolderType {
        self.folder_type
    }

    pub fn configuration_arc(&self) -> &Arc<FolderConfiguration> {
        &self.configuration
    }

    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Stamp of the disk content this source reflects. `None` once the
    /// source was edited in place, since it no longer matches the file.
    pub fn stamp(&self) -> Option<FileStamp> {
        self.stamp
    }

    /// Whether the last parse reported errors.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    pub(crate) fn set_had_errors(&mut self, had_errors: bool) {
        self.had_errors = had_errors;
    }

    /// Whether the persistent cache may hold this source.
    pub fn is_cacheable(&self) -> bool {
        self.kind.is_parsable() && self.stamp.is_some() && !self.had_errors
    }

    /// How many times the source was re-parsed or edited in place.
    pub fn updates(&self) -> u32 {
        self.updates
    }

    /// The value this source contributes for (type, name).
    pub fn value(&self, resource_type: ResourceType, name: &str) -> Option<ResourceValue> {
        match &self.kind {
            SourceKind::SingleFile {
                resource_type: t,
                name: n,
                density,
            } if *t == resource_type && n == name => Some(ResourceValue::File {
                path: self.path.clone(),
                density: *density,
            }),
            SourceKind::MultiValueFile { values, .. } => {
                values.get(&resource_type).and_then(|m| m.get(name)).cloned()
            }
            SourceKind::IdGeneratingFile {
                resource_type: t,
                name: n,
                ids,
            } => {
                if *t == resource_type && n == name {
                    Some(ResourceValue::File {
                        path: self.path.clone(),
                        density: None,
                    })
                } else if resource_type == ResourceType::Id && ids.contains(name) {
                    Some(ResourceValue::Id)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Attach every contribution to the index.
    pub(crate) fn load(&mut self, ctx: &mut ScanContext, index: &mut ItemIndex) {
        if self.state == SourceState::Loaded {
            return;
        }
        for (resource_type, name) in self.kind.contributions() {
            index.attach(resource_type, &name, self.id);
        }
        if self.kind.contributions().iter().any(|(t, _)| *t == ResourceType::Id) {
            index.bump_id_generation();
        }
        self.state = SourceState::Loaded;
        tracing::trace!(
            path = %self.path.display(),
            resources = self.kind.len(),
            errors = ctx.errors().len(),
            "Loaded source"
        );
    }

    /// Replace the contributions with a freshly parsed kind.
    ///
    /// Returns whether the contributed name set changed. A changed name set
    /// bumps the index's id generation.
    pub(crate) fn update(
        &mut self,
        kind: SourceKind,
        stamp: Option<FileStamp>,
        _ctx: &mut ScanContext,
        index: &mut ItemIndex,
    ) -> bool {
        let before = self.kind.contributions();
        let after = kind.contributions();

        for (resource_type, name) in before.difference(&after) {
            index.detach(*resource_type, name, self.id);
        }
        for (resource_type, name) in after.difference(&before) {
            index.attach(*resource_type, name, self.id);
        }

        self.kind = kind;
        self.stamp = stamp;
        self.state = SourceState::Loaded;
        self.updates += 1;
        index.touch();

        let changed = before != after;
        if changed {
            index.bump_id_generation();
        }
        changed
    }

    /// Detach every contribution; items left without sources are pruned.
    pub(crate) fn dispose(&mut self, _ctx: &mut ScanContext, index: &mut ItemIndex) {
        if self.state == SourceState::Disposed {
            return;
        }
        let contributions = self.kind.contributions();
        for (resource_type, name) in &contributions {
            index.detach(*resource_type, name, self.id);
        }
        if !contributions.is_empty() {
            index.bump_id_generation();
        }
        self.state = SourceState::Disposed;
    }

    // -------------------------------------------------------------------------
    // In-place value edits (values files only)
    // -------------------------------------------------------------------------

    fn values_mut(&mut self) -> Option<&mut ValueMap> {
        match &mut self.kind {
            SourceKind::MultiValueFile { values, .. } => Some(values),
            _ => None,
        }
    }

    fn untranslatable_mut(&mut self) -> Option<&mut BTreeSet<(ResourceType, String)>> {
        match &mut self.kind {
            SourceKind::MultiValueFile { untranslatable, .. } => Some(untranslatable),
            _ => None,
        }
    }

    /// Record an in-place edit. The content now differs from the disk file,
    /// so the stamp is dropped.
    fn mark_edited(&mut self) {
        self.updates += 1;
        self.stamp = None;
    }

    /// Replace the text of one text value. Returns `false` when the value
    /// does not exist or is not plain text.
    pub(crate) fn set_value_text(
        &mut self,
        resource_type: ResourceType,
        name: &str,
        text: &str,
        index: &mut ItemIndex,
    ) -> bool {
        let Some(values) = self.values_mut() else {
            return false;
        };
        match values.get_mut(&resource_type).and_then(|m| m.get_mut(name)) {
            Some(value) if value.is_text_editable() => {
                *value = ResourceValue::Text(text.to_string());
            }
            _ => return false,
        }
        self.mark_edited();
        index.touch();
        true
    }

    /// Rename one value entry. Fails if the old entry is missing or the new
    /// name is already declared by this file.
    pub(crate) fn rename_value(
        &mut self,
        resource_type: ResourceType,
        old_name: &str,
        new_name: &str,
        index: &mut ItemIndex,
    ) -> bool {
        if !is_valid_resource_name(new_name) {
            return false;
        }
        let id = self.id;
        let Some(values) = self.values_mut() else {
            return false;
        };
        let Some(by_name) = values.get_mut(&resource_type) else {
            return false;
        };
        if by_name.contains_key(new_name) {
            return false;
        }
        let Some(value) = by_name.remove(old_name) else {
            return false;
        };
        by_name.insert(new_name.to_string(), value);
        if let Some(untranslatable) = self.untranslatable_mut() {
            if untranslatable.remove(&(resource_type, old_name.to_string())) {
                untranslatable.insert((resource_type, new_name.to_string()));
            }
        }

        index.detach(resource_type, old_name, id);
        index.attach(resource_type, new_name, id);
        index.bump_id_generation();
        self.mark_edited();
        true
    }

    /// Add one value entry. Fails if the entry already exists.
    pub(crate) fn add_value(
        &mut self,
        resource_type: ResourceType,
        name: &str,
        value: ResourceValue,
        index: &mut ItemIndex,
    ) -> bool {
        if !is_valid_resource_name(name) {
            return false;
        }
        let id = self.id;
        let Some(values) = self.values_mut() else {
            return false;
        };
        let by_name = values.entry(resource_type).or_default();
        if by_name.contains_key(name) {
            return false;
        }
        by_name.insert(name.to_string(), value);

        index.attach(resource_type, name, id);
        index.bump_id_generation();
        self.mark_edited();
        true
    }

    /// Remove one value entry. Fails if it does not exist.
    pub(crate) fn remove_value(
        &mut self,
        resource_type: ResourceType,
        name: &str,
        index: &mut ItemIndex,
    ) -> bool {
        let id = self.id;
        let Some(values) = self.values_mut() else {
            return false;
        };
        let Some(by_name) = values.get_mut(&resource_type) else {
            return false;
        };
        if by_name.remove(name).is_none() {
            return false;
        }
        if by_name.is_empty() {
            values.remove(&resource_type);
        }
        if let Some(untranslatable) = self.untranslatable_mut() {
            untranslatable.remove(&(resource_type, name.to_string()));
        }

        index.detach(resource_type, name, id);
        index.bump_id_generation();
        self.mark_edited();
        true
    }

    /// Replace one existing value entry wholesale.
    pub(crate) fn replace_value(
        &mut self,
        resource_type: ResourceType,
        name: &str,
        value: ResourceValue,
        index: &mut ItemIndex,
    ) -> bool {
        let Some(values) = self.values_mut() else {
            return false;
        };
        match values.get_mut(&resource_type).and_then(|m| m.get_mut(name)) {
            Some(existing) => *existing = value,
            None => return false,
        }
        self.mark_edited();
        index.touch();
        true
    }
}

impl Configurable for Source {
    fn configuration(&self) -> &FolderConfiguration {
        &self.configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::QuickXmlParser;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn parse(path: &Path, folder: &str) -> ParseOutcome {
        let (folder_type, config) = FolderConfiguration::from_folder_name(folder).unwrap();
        parse_source(path, folder_type, &config, &QuickXmlParser::new())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_parse_values_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "values/strings.xml",
            r#"<resources><string name="a">A</string><color name="c">#fff</color></resources>"#,
        );
        let outcome = parse(&path, "values");
        let kind = outcome.kind.unwrap();
        assert_eq!(kind.len(), 2);
        assert!(kind.is_parsable());
        assert!(outcome.stamp.is_some());
    }

    #[test]
    fn test_duplicate_declaration_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "values/strings.xml",
            "<resources>\n<string name=\"a\">First</string>\n<string name=\"a\">Second</string>\n</resources>",
        );
        let outcome = parse(&path, "values");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].line, 3);
        assert!(outcome.errors[0].message.contains("@string/a"));
        assert!(!outcome.needs_full_rescan);

        let source = Source::new(
            SourceId(1),
            path,
            ResourceFolderType::Values,
            Arc::new(FolderConfiguration::default()),
            outcome.kind.unwrap(),
            None,
        );
        assert_eq!(
            source.value(ResourceType::String, "a"),
            Some(ResourceValue::Text("First".into()))
        );
    }

    #[test]
    fn test_repeated_attr_is_not_a_duplicate() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "values/attrs.xml",
            r#"<resources>
                <attr name="shape" format="enum"/>
                <declare-styleable name="MyView"><attr name="shape"/></declare-styleable>
            </resources>"#,
        );
        assert!(parse(&path, "values").errors.is_empty());
    }

    #[test]
    fn test_untranslatable_declarations_are_recorded() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "values/strings.xml",
            r#"<resources>
                <string name="title">Title</string>
                <string name="brand" translatable="false">Acme</string>
            </resources>"#,
        );
        let kind = parse(&path, "values").kind.unwrap();
        assert!(kind.is_translatable(ResourceType::String, "title"));
        assert!(!kind.is_translatable(ResourceType::String, "brand"));
    }

    #[test]
    fn test_in_place_edit_drops_stamp() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "values/strings.xml",
            r#"<resources><string name="a" translatable="false">A</string></resources>"#,
        );
        let outcome = parse(&path, "values");
        let mut source = Source::new(
            SourceId(1),
            path,
            ResourceFolderType::Values,
            Arc::new(FolderConfiguration::default()),
            outcome.kind.unwrap(),
            outcome.stamp,
        );
        let mut index = ItemIndex::default();
        source.load(&mut ScanContext::new(), &mut index);
        assert!(source.is_cacheable());

        assert!(source.rename_value(ResourceType::String, "a", "b", &mut index));
        assert!(source.stamp().is_none());
        assert!(!source.is_cacheable());
        assert!(!source.kind().is_translatable(ResourceType::String, "b"));
        assert!(source.kind().is_translatable(ResourceType::String, "a"));
    }

    #[test]
    fn test_parse_malformed_values_file_requests_rescan() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "values/strings.xml", "<resources><string name=\"a\">");
        let outcome = parse(&path, "values");
        assert!(outcome.needs_full_rescan);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.kind.unwrap().len(), 0);
    }

    #[test]
    fn test_parse_layout_collects_ids() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "layout/main.xml",
            r#"<FrameLayout><View id="@+id/title"/></FrameLayout>"#,
        );
        let kind = parse(&path, "layout").kind.unwrap();
        let contributions = kind.contributions();
        assert!(contributions.contains(&(ResourceType::Layout, "main".to_string())));
        assert!(contributions.contains(&(ResourceType::Id, "title".to_string())));
    }

    #[test]
    fn test_parse_single_file_records_density() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "drawable-hdpi/icon.9.png", "png");
        let kind = parse(&path, "drawable-hdpi").kind.unwrap();
        assert_eq!(
            kind,
            SourceKind::SingleFile {
                resource_type: ResourceType::Drawable,
                name: "icon".into(),
                density: Some(240),
            }
        );
        assert!(!kind.is_parsable());
    }

    #[test]
    fn test_ignored_files() {
        let dir = TempDir::new().unwrap();
        let hidden = write(dir.path(), "drawable/.DS_Store", "");
        let text = write(dir.path(), "values/readme.txt", "");
        let config = FolderConfiguration::default();
        let parser = QuickXmlParser::new();
        assert!(parse_source(&hidden, ResourceFolderType::Drawable, &config, &parser)
            .unwrap()
            .is_none());
        assert!(parse_source(&text, ResourceFolderType::Values, &config, &parser)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_file_name_is_untracked() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "raw/1track.mp3", "");
        let outcome = parse(&path, "raw");
        assert!(outcome.kind.is_none());
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let config = FolderConfiguration::default();
        let err = parse_source(
            Path::new("/nonexistent/raw/a.mp3"),
            ResourceFolderType::Raw,
            &config,
            &QuickXmlParser::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_stamp_hash_changes_with_length() {
        let a = FileStamp {
            modified_nanos: 10,
            length: 1,
        };
        let b = FileStamp {
            modified_nanos: 10,
            length: 2,
        };
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.hash());
    }

    #[test]
    fn test_scan_context_absorb() {
        let mut ctx = ScanContext::new();
        ctx.absorb(
            vec![ScanError {
                path: PathBuf::from("a.xml"),
                line: 3,
                message: "bad".into(),
            }],
            true,
        );
        assert!(ctx.has_errors());
        assert!(ctx.needs_full_rescan());
        assert_eq!(ctx.errors()[0].to_string(), "a.xml:3: bad");
    }
}
